pub mod asset;
pub mod history;
pub mod portfolio;
pub mod quote;
pub mod settings;
