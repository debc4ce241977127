use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dataset::DatasetItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScoreDataType {
    Boolean,
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub name: String,
    pub value: f64,
    pub data_type: ScoreDataType,
    pub comment: String,
}

impl Score {
    // Boolean scores carry only 0.0 or 1.0.
    pub fn boolean(name: impl Into<String>, passed: bool, comment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: if passed { 1.0 } else { 0.0 },
            data_type: ScoreDataType::Boolean,
            comment: comment.into(),
        }
    }

    pub fn numeric(name: impl Into<String>, value: f64, comment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            data_type: ScoreDataType::Numeric,
            comment: comment.into(),
        }
    }

    pub fn passed(&self) -> bool {
        self.value == 1.0
    }
}

// One evaluated dataset item: its output and the scores every item evaluator
// produced, in declaration order. Never mutated after evaluation finishes.
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub item: DatasetItem,
    pub output: Value,
    pub evaluations: Vec<Score>,
}

impl ItemResult {
    pub fn score(&self, name: &str) -> Option<&Score> {
        self.evaluations.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_score_values() {
        assert_eq!(Score::boolean("x", true, "ok").value, 1.0);
        assert_eq!(Score::boolean("x", false, "no").value, 0.0);
        assert!(Score::boolean("x", true, "ok").passed());
    }

    #[test]
    fn test_data_type_serializes_uppercase() {
        let json = serde_json::to_value(Score::boolean("x", true, "ok")).unwrap();
        assert_eq!(json["data_type"], "BOOLEAN");

        let json = serde_json::to_value(Score::numeric("y", 0.5, "half")).unwrap();
        assert_eq!(json["data_type"], "NUMERIC");
    }

    #[test]
    fn test_item_result_score_lookup() {
        let result = ItemResult {
            item: DatasetItem {
                input: json!({"city": "Tokyo"}),
                expected_output: json!({}),
                metadata: None,
            },
            output: json!({}),
            evaluations: vec![
                Score::boolean("weather_data_retrieval", true, "ok"),
                Score::numeric("location_translation", 0.8, "close"),
            ],
        };

        assert!(result.score("weather_data_retrieval").is_some());
        assert_eq!(result.score("location_translation").unwrap().value, 0.8);
        assert!(result.score("missing").is_none());
    }
}
