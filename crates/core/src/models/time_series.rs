use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::RequestId;

/// One observation of a time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesRow {
    /// Date formatted with the series' `date_format`.
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub rows: Vec<TimeSeriesRow>,
    pub date_column_name: String,
    pub value_column_name: String,
    pub date_format: String,
}

impl TimeSeries {
    /// Copy of this series without its last `count` rows.
    ///
    /// Fails when `count` exceeds the number of rows.
    pub fn without_last(&self, count: usize) -> Result<TimeSeries, CoreError> {
        let len = self.rows.len();
        if count > len {
            return Err(CoreError::Validation(format!(
                "Cannot remove {count} values from a time series of {len} rows"
            )));
        }

        Ok(TimeSeries {
            rows: self.rows[..len - count].to_vec(),
            date_column_name: self.date_column_name.clone(),
            value_column_name: self.value_column_name.clone(),
            date_format: self.date_format.clone(),
        })
    }
}

/// Body of every time-series call sent to an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesAnalysisRequest {
    pub request_id: RequestId,
    pub time_series: TimeSeries,
    /// Number of values to forecast, predict or compare.
    pub number_of_values: usize,
}

impl TimeSeriesAnalysisRequest {
    pub fn new(request_id: RequestId, time_series: TimeSeries, number_of_values: usize) -> Self {
        Self {
            request_id,
            time_series,
            number_of_values,
        }
    }

    /// Build the request used for a forecast-vs-actual comparison.
    ///
    /// The last `number_of_values` rows are dropped so the engine forecasts
    /// the period for which actual values are known.
    pub fn for_forecast_vs_actual(&self) -> Result<TimeSeriesAnalysisRequest, CoreError> {
        Ok(TimeSeriesAnalysisRequest {
            request_id: self.request_id,
            time_series: self.time_series.without_last(self.number_of_values)?,
            number_of_values: self.number_of_values,
        })
    }
}
