use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const WEATHER_DATASET_NAME: &str = "weather-workflow-evaluation";
pub const WEATHER_DATASET_DESCRIPTION: &str =
    "多言語の都市名入力に対する日本語天気ワークフロー評価データセット";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ItemMetadata {
    pub fn new(language: &str, difficulty: Difficulty, description: &str) -> Self {
        Self {
            language: Some(language.to_string()),
            difficulty: Some(difficulty),
            description: Some(description.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetItem {
    pub input: Value,
    pub expected_output: Value,
    #[serde(default)]
    pub metadata: Option<ItemMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub items: Vec<DatasetItem>,
}

fn weather_item(
    city: &str,
    location_in_japanese: &str,
    metadata: ItemMetadata,
) -> DatasetItem {
    DatasetItem {
        input: json!({ "city": city }),
        expected_output: json!({
            "has_weather_info": true,
            "has_activities": true,
            "location_in_japanese": location_in_japanese,
        }),
        metadata: Some(metadata),
    }
}

pub fn sample_items() -> Vec<DatasetItem> {
    vec![
        weather_item(
            "Tokyo",
            "東京",
            ItemMetadata::new("en", Difficulty::Easy, "英語表記の主要都市（基本ケース）"),
        ),
        weather_item(
            "Paris",
            "パリ",
            ItemMetadata::new("en", Difficulty::Easy, "英語表記の欧州都市（基本ケース）"),
        ),
        weather_item(
            "東京",
            "東京",
            ItemMetadata::new(
                "ja",
                Difficulty::Medium,
                "日本語表記の都市名。地名を日本語で扱えるか",
            ),
        ),
        weather_item(
            "São Paulo",
            "サンパウロ",
            ItemMetadata::new(
                "pt",
                Difficulty::Medium,
                "アクセント付き表記。発音記号を落とした日本語表記へ",
            ),
        ),
        weather_item(
            "New York",
            "ニューヨーク",
            ItemMetadata::new(
                "en",
                Difficulty::Easy,
                "複合語の都市名（英語入力→日本語出力期待）",
            ),
        ),
    ]
}

pub fn sample_dataset() -> Dataset {
    Dataset {
        name: WEATHER_DATASET_NAME.to_string(),
        description: WEATHER_DATASET_DESCRIPTION.to_string(),
        items: sample_items(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_dataset_shape() {
        let dataset = sample_dataset();
        assert_eq!(dataset.name, WEATHER_DATASET_NAME);
        assert_eq!(dataset.items.len(), 5);

        for item in &dataset.items {
            assert!(item.input["city"].is_string());
            assert_eq!(item.expected_output["has_weather_info"], true);
            assert_eq!(item.expected_output["has_activities"], true);
            assert!(item.expected_output["location_in_japanese"].is_string());
            assert!(item.metadata.is_some());
        }
    }

    #[test]
    fn test_item_serde_roundtrip() {
        let item = weather_item(
            "São Paulo",
            "サンパウロ",
            ItemMetadata::new("pt", Difficulty::Medium, "accented input"),
        );
        let json = serde_json::to_string(&item).expect("should serialize");
        let back: DatasetItem = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(back.input["city"], "São Paulo");
        assert_eq!(
            back.metadata.as_ref().and_then(|m| m.difficulty),
            Some(Difficulty::Medium)
        );
    }

    #[test]
    fn test_metadata_optional_on_deserialize() {
        let json = r#"{
            "input": {"city": "Tokyo"},
            "expected_output": {"has_weather_info": true}
        }"#;
        let item: DatasetItem = serde_json::from_str(json).expect("should deserialize");
        assert!(item.metadata.is_none());
    }
}
