//! Classifier workflow models.
//!
//! A classifier run spans several calls that must reach the same engine:
//! `start` books an engine and returns a request id, `data` streams the
//! columns, then `predict` / `predict-accuracy` / `cancel` end the run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::actions;
use crate::types::RequestId;

/// Classifier algorithm run by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassifierType {
    DecisionTree,
}

impl ClassifierType {
    pub const ALL: [ClassifierType; 1] = [ClassifierType::DecisionTree];

    /// URL path segment under which the service exposes this classifier.
    pub fn path_segment(self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => "decision-tree",
        }
    }

    /// Inverse of [`ClassifierType::path_segment`].
    pub fn from_path_segment(segment: &str) -> Option<ClassifierType> {
        Self::ALL
            .into_iter()
            .find(|classifier_type| classifier_type.path_segment() == segment)
    }

    pub fn start_action(self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => actions::DECISION_TREE_START,
        }
    }

    pub fn data_action(self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => actions::DECISION_TREE_DATA,
        }
    }

    pub fn predict_action(self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => actions::DECISION_TREE_PREDICT,
        }
    }

    pub fn predict_accuracy_action(self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => actions::DECISION_TREE_PREDICT_ACCURACY,
        }
    }

    pub fn cancel_action(self) -> &'static str {
        match self {
            ClassifierType::DecisionTree => actions::DECISION_TREE_CANCEL,
        }
    }
}

impl fmt::Display for ClassifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierStartRequest {
    pub request_id: RequestId,
    /// Column whose values are predicted.
    pub prediction_column_name: String,
    /// Columns used as features.
    pub action_column_names: Vec<String>,
    /// Number of trailing values to predict.
    pub number_of_values: usize,
    pub classifier_type: ClassifierType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierStartResponse {
    pub request_id: RequestId,
}

/// One column of data for a started classifier run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierDataRequest {
    pub request_id: RequestId,
    pub column_name: String,
    pub values: Vec<i32>,
}

/// Body of the `predict` and `predict-accuracy` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierRequest {
    pub request_id: RequestId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierResponse {
    pub request_id: RequestId,
    pub column_name: String,
    pub values: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierCancelRequest {
    pub request_id: RequestId,
    pub classifier_type: ClassifierType,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn classifier_type_round_trips_through_path_segment() {
        for classifier_type in ClassifierType::ALL {
            let segment = classifier_type.path_segment();
            assert_eq!(ClassifierType::from_path_segment(segment), Some(classifier_type));
        }
        assert_eq!(ClassifierType::from_path_segment("random-forest"), None);
    }

    #[test]
    fn decision_tree_action_names() {
        let dt = ClassifierType::DecisionTree;
        assert_eq!(dt.start_action(), "decision-tree-start");
        assert_eq!(dt.data_action(), "decision-tree-data");
        assert_eq!(dt.predict_action(), "decision-tree-predict");
        assert_eq!(dt.predict_accuracy_action(), "decision-tree-compute-predict-accuracy");
        assert_eq!(dt.cancel_action(), "decision-tree-cancel");
    }

    #[test]
    fn start_request_uses_engine_field_names() {
        let request = ClassifierStartRequest {
            request_id: 12,
            prediction_column_name: "label".to_string(),
            action_column_names: vec!["a".to_string(), "b".to_string()],
            number_of_values: 5,
            classifier_type: ClassifierType::DecisionTree,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "requestId": 12,
                "predictionColumnName": "label",
                "actionColumnNames": ["a", "b"],
                "numberOfValues": 5,
                "classifierType": "DECISION_TREE"
            })
        );
    }

    #[test]
    fn response_parses_engine_payload() {
        let response: ClassifierResponse = serde_json::from_value(json!({
            "requestId": 4,
            "columnName": "label",
            "values": [0, 1, 1]
        }))
        .unwrap();

        assert_eq!(response.request_id, 4);
        assert_eq!(response.values, vec![0, 1, 1]);
    }
}
