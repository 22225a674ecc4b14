pub mod payload;
pub mod routing;
pub mod traits;

// Feed adapter implementations
pub mod exchange_quote;
pub mod fund_estimate;
pub mod fund_holdings;
pub mod fund_search;
pub mod market_history;
