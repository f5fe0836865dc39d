pub mod registry;
pub mod traits;

// API provider implementations
pub mod alphavantage;
pub mod finnhub;
pub mod reddit;
pub mod yahoo_finance;
