pub mod admin;
pub mod classifier;
pub mod time_series;
