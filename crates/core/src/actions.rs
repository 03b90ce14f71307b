//! Action names.
//!
//! Every orchestrated call carries an action name. It shows up in logs,
//! in request registry entries, and in the messages of placement and
//! remote-call errors, so callers can tell which operation was refused.

pub const TIME_SERIES_FORECAST: &str = "time-series-forecast";
pub const TIME_SERIES_FORECAST_VS_ACTUAL: &str = "time-series-forecast-vs-actual";
pub const TIME_SERIES_FORECAST_ACCURACY: &str = "time-series-compute-accuracy";
pub const TIME_SERIES_PREDICT: &str = "time-series-predict";

pub const DECISION_TREE_START: &str = "decision-tree-start";
pub const DECISION_TREE_DATA: &str = "decision-tree-data";
pub const DECISION_TREE_PREDICT: &str = "decision-tree-predict";
pub const DECISION_TREE_PREDICT_ACCURACY: &str = "decision-tree-compute-predict-accuracy";
pub const DECISION_TREE_CANCEL: &str = "decision-tree-cancel";

pub const ADMIN_PING: &str = "admin-ping";
