pub mod chart;
pub mod indicators;
pub mod price;
pub mod row;
pub mod sentiment;
pub mod settings;
