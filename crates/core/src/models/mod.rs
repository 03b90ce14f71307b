//! JSON models exchanged with the computation engines and API clients.
//!
//! Field names follow the engine wire format (camelCase).

pub mod admin;
pub mod classifier;
pub mod time_series;
