pub mod chart_service;
pub mod indicator_service;
pub mod quote_service;
pub mod resolver_service;
pub mod row_service;
pub mod search_service;
pub mod sentiment_service;
