use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EvaluatorError;

use super::evaluators::{
    ACTIVITY_GENERATION, LOCATION_TRANSLATION, OVERALL_SUCCESS, WEATHER_DATA_RETRIEVAL,
};
use super::score::{ItemResult, Score};

// Run-level scoring over the full ordered item-result collection.
#[async_trait]
pub trait RunEvaluator: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(&self, results: &[ItemResult]) -> Result<Score, EvaluatorError>;
}

pub fn default_run_evaluators() -> Vec<Arc<dyn RunEvaluator>> {
    vec![
        Arc::new(MeanScore::avg_success_rate()),
        Arc::new(MeanScore::avg_translation_accuracy()),
        Arc::new(MeanScore::weather_retrieval_rate()),
        Arc::new(MeanScore::activity_generation_rate()),
    ]
}

// Arithmetic mean of one named item score across all items, with a defined
// zero-valued fallback when no matching scores exist.
pub struct MeanScore {
    name: &'static str,
    source: &'static str,
    label: &'static str,
    pass_noun: Option<&'static str>,
    fallback: &'static str,
}

impl MeanScore {
    pub fn avg_success_rate() -> Self {
        Self {
            name: "avg_success_rate",
            source: OVERALL_SUCCESS,
            label: "Average success rate",
            pass_noun: Some("passed"),
            fallback: "No success scores found",
        }
    }

    pub fn avg_translation_accuracy() -> Self {
        Self {
            name: "avg_translation_accuracy",
            source: LOCATION_TRANSLATION,
            label: "Average translation accuracy",
            pass_noun: None,
            fallback: "No translation scores found",
        }
    }

    pub fn weather_retrieval_rate() -> Self {
        Self {
            name: "weather_retrieval_rate",
            source: WEATHER_DATA_RETRIEVAL,
            label: "Weather retrieval rate",
            pass_noun: Some("successful"),
            fallback: "No weather retrieval scores found",
        }
    }

    pub fn activity_generation_rate() -> Self {
        Self {
            name: "activity_generation_rate",
            source: ACTIVITY_GENERATION,
            label: "Activity generation rate",
            pass_noun: Some("successful"),
            fallback: "No activity generation scores found",
        }
    }
}

#[async_trait]
impl RunEvaluator for MeanScore {
    fn name(&self) -> &str {
        self.name
    }

    async fn evaluate(&self, results: &[ItemResult]) -> Result<Score, EvaluatorError> {
        let values: Vec<f64> = results
            .iter()
            .flat_map(|r| &r.evaluations)
            .filter(|s| s.name == self.source)
            .map(|s| s.value)
            .collect();

        if values.is_empty() {
            return Ok(Score::numeric(self.name, 0.0, self.fallback));
        }

        let average = values.iter().sum::<f64>() / values.len() as f64;
        let comment = match self.pass_noun {
            Some(noun) => format!(
                "{}: {:.1}% ({}/{} {})",
                self.label,
                average * 100.0,
                values.iter().filter(|v| **v == 1.0).count(),
                values.len(),
                noun
            ),
            None => format!("{}: {:.1}%", self.label, average * 100.0),
        };

        Ok(Score::numeric(self.name, average, comment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::dataset::DatasetItem;
    use serde_json::json;

    fn result_with(scores: Vec<Score>) -> ItemResult {
        ItemResult {
            item: DatasetItem {
                input: json!({"city": "Tokyo"}),
                expected_output: json!({}),
                metadata: None,
            },
            output: json!({}),
            evaluations: scores,
        }
    }

    #[tokio::test]
    async fn test_mean_over_matching_scores() {
        let results = vec![
            result_with(vec![Score::boolean(OVERALL_SUCCESS, true, "ok")]),
            result_with(vec![Score::boolean(OVERALL_SUCCESS, false, "no")]),
            result_with(vec![Score::boolean(OVERALL_SUCCESS, true, "ok")]),
        ];

        let score = MeanScore::avg_success_rate().evaluate(&results).await.unwrap();

        assert!((score.value - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!(score.comment.contains("66.7%"));
        assert!(score.comment.contains("(2/3 passed)"));
    }

    #[tokio::test]
    async fn test_ignores_other_score_names() {
        let results = vec![result_with(vec![
            Score::boolean(WEATHER_DATA_RETRIEVAL, true, "ok"),
            Score::numeric(LOCATION_TRANSLATION, 0.5, "half"),
        ])];

        let score = MeanScore::avg_translation_accuracy()
            .evaluate(&results)
            .await
            .unwrap();

        assert_eq!(score.value, 0.5);
        assert_eq!(score.comment, "Average translation accuracy: 50.0%");
    }

    #[tokio::test]
    async fn test_empty_results_fallback() {
        let evaluators = default_run_evaluators();
        for evaluator in evaluators {
            let score = evaluator.evaluate(&[]).await.unwrap();
            assert_eq!(score.value, 0.0);
            assert!(score.comment.contains("scores found"), "{}", score.comment);
        }
    }

    #[tokio::test]
    async fn test_items_without_matching_scores_fallback() {
        let results = vec![result_with(vec![])];
        let score = MeanScore::weather_retrieval_rate()
            .evaluate(&results)
            .await
            .unwrap();
        assert_eq!(score.value, 0.0);
        assert_eq!(score.comment, "No weather retrieval scores found");
    }

    #[test]
    fn test_default_run_evaluators_order() {
        let names: Vec<String> = default_run_evaluators()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "avg_success_rate",
                "avg_translation_accuracy",
                "weather_retrieval_rate",
                "activity_generation_rate",
            ]
        );
    }
}
