use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::errors::CoreError;

use super::store::KvStore;

/// `KvStore` over the remote snapshot sync surface.
///
/// The backend exposes `GET /api/assets?user=<id>` (the stored JSON array,
/// or `[]`) and `POST /api/assets?user=<id>` with `{"assets": [...]}` to
/// overwrite the snapshot. The `user_<id>` key maps onto the query
/// parameter; delete is a POST of the empty list.
pub struct RemoteStore {
    client: Client,
    base_url: String,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(8));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, key: &str) -> String {
        let user = key.strip_prefix("user_").unwrap_or(key);
        format!("{}/api/assets?user={user}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl KvStore for RemoteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let response = self.client.get(self.endpoint(key)).send().await?;
        if !response.status().is_success() {
            return Err(CoreError::Storage(format!(
                "snapshot fetch returned {}",
                response.status()
            )));
        }
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(body))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CoreError> {
        // The endpoint wraps the snapshot in an `assets` envelope.
        let body = format!("{{\"assets\":{value}}}");
        let response = self
            .client
            .post(self.endpoint(key))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CoreError::Storage(format!(
                "snapshot write returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        self.put(key, "[]").await
    }
}
