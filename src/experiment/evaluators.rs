use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EvaluatorError;

use super::dataset::ItemMetadata;
use super::score::Score;

pub const WEATHER_DATA_RETRIEVAL: &str = "weather_data_retrieval";
pub const ACTIVITY_GENERATION: &str = "activity_generation";
pub const LOCATION_TRANSLATION: &str = "location_translation";
pub const OVERALL_SUCCESS: &str = "overall_success";

// Item-level scoring: a pure function of one item's input, produced output,
// expected output, and metadata. Evaluators may log but must not touch
// shared state.
#[async_trait]
pub trait ItemEvaluator: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(
        &self,
        input: &Value,
        output: &Value,
        expected: &Value,
        metadata: Option<&ItemMetadata>,
    ) -> Result<Score, EvaluatorError>;
}

pub fn default_item_evaluators() -> Vec<Arc<dyn ItemEvaluator>> {
    vec![
        Arc::new(WeatherDataRetrieval),
        Arc::new(ActivityGeneration),
        Arc::new(LocationTranslation),
        Arc::new(OverallSuccess),
    ]
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

// 1.0 for exact match or containment either direction; otherwise edit
// distance normalized by the longer string. Two empty strings compare equal,
// so the zero-length division case never arises.
pub fn name_similarity(actual: &str, expected: &str) -> f64 {
    let actual = actual.trim().to_lowercase();
    let expected = expected.trim().to_lowercase();

    if actual == expected || actual.contains(&expected) || expected.contains(&actual) {
        return 1.0;
    }

    let max_len = actual.chars().count().max(expected.chars().count());
    let distance = levenshtein(&actual, &expected);
    (1.0 - distance as f64 / max_len as f64).max(0.0)
}

fn flag(value: &Value, field: &str) -> bool {
    value.get(field).and_then(Value::as_bool).unwrap_or(false)
}

fn text<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).unwrap_or_default()
}

pub struct WeatherDataRetrieval;

#[async_trait]
impl ItemEvaluator for WeatherDataRetrieval {
    fn name(&self) -> &str {
        WEATHER_DATA_RETRIEVAL
    }

    async fn evaluate(
        &self,
        _input: &Value,
        output: &Value,
        _expected: &Value,
        _metadata: Option<&ItemMetadata>,
    ) -> Result<Score, EvaluatorError> {
        let success = flag(output, "has_weather_info");
        let comment = if success {
            format!(
                "Successfully retrieved weather for {}",
                text(output, "location")
            )
        } else {
            "Failed to retrieve weather data".to_string()
        };
        Ok(Score::boolean(WEATHER_DATA_RETRIEVAL, success, comment))
    }
}

pub struct ActivityGeneration;

#[async_trait]
impl ItemEvaluator for ActivityGeneration {
    fn name(&self) -> &str {
        ACTIVITY_GENERATION
    }

    async fn evaluate(
        &self,
        _input: &Value,
        output: &Value,
        _expected: &Value,
        _metadata: Option<&ItemMetadata>,
    ) -> Result<Score, EvaluatorError> {
        let success = flag(output, "has_activities");
        let comment = if success {
            format!(
                "Generated {} characters of activity suggestions",
                text(output, "activities").chars().count()
            )
        } else {
            "Failed to generate activities".to_string()
        };
        Ok(Score::boolean(ACTIVITY_GENERATION, success, comment))
    }
}

pub struct LocationTranslation;

#[async_trait]
impl ItemEvaluator for LocationTranslation {
    fn name(&self) -> &str {
        LOCATION_TRANSLATION
    }

    async fn evaluate(
        &self,
        input: &Value,
        output: &Value,
        expected: &Value,
        _metadata: Option<&ItemMetadata>,
    ) -> Result<Score, EvaluatorError> {
        let actual = text(output, "location");
        let wanted = text(expected, "location_in_japanese");
        let score = name_similarity(actual, wanted);

        let comment = format!(
            "入力: \"{}\" → 出力: \"{}\" (期待: \"{}\")",
            text(input, "city"),
            actual,
            wanted
        );
        Ok(Score::numeric(LOCATION_TRANSLATION, score, comment))
    }
}

pub struct OverallSuccess;

#[async_trait]
impl ItemEvaluator for OverallSuccess {
    fn name(&self) -> &str {
        OVERALL_SUCCESS
    }

    async fn evaluate(
        &self,
        _input: &Value,
        output: &Value,
        expected: &Value,
        _metadata: Option<&ItemMetadata>,
    ) -> Result<Score, EvaluatorError> {
        let weather_ok = flag(output, "has_weather_info") == flag(expected, "has_weather_info");
        let activities_ok = flag(output, "has_activities") == flag(expected, "has_activities");
        let success = weather_ok && activities_ok;

        let comment = if success {
            "All checks passed".to_string()
        } else {
            format!("Weather: {}, Activities: {}", weather_ok, activities_ok)
        };
        Ok(Score::boolean(OVERALL_SUCCESS, success, comment))
    }
}
