use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::agent::{drain, Message};
use crate::context::RunContext;
use crate::error::StepError;
use crate::workflow::{FieldKind, Schema, Step};

use super::client::WeatherProvider;
use super::conditions;

pub const NORMALIZE_CITY_STEP: &str = "normalize-city";
pub const FETCH_WEATHER_STEP: &str = "fetch-weather";
pub const PLAN_ACTIVITIES_STEP: &str = "plan-activities";

pub const CITY_TRANSLATOR_AGENT: &str = "city-translator";
pub const WEATHER_AGENT: &str = "weather";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub date: String,
    pub max_temp: f64,
    pub min_temp: f64,
    pub precipitation_chance: f64,
    pub condition: String,
    pub location: String,
    pub has_weather_info: bool,
}

pub fn city_schema() -> Schema {
    Schema::new().field("city", FieldKind::String)
}

pub fn forecast_schema() -> Schema {
    Schema::new()
        .field("date", FieldKind::String)
        .field("max_temp", FieldKind::Number)
        .field("min_temp", FieldKind::Number)
        .field("precipitation_chance", FieldKind::Number)
        .field("condition", FieldKind::String)
        .field("location", FieldKind::String)
        .field("has_weather_info", FieldKind::Boolean)
}

pub fn activities_schema() -> Schema {
    Schema::new().field("activities", FieldKind::String)
}

fn input_city(input: &Value) -> Result<&str, StepError> {
    input
        .get("city")
        .and_then(Value::as_str)
        .ok_or_else(|| StepError::Payload("missing 'city' field".to_string()))
}

// Folds combining-accent Latin characters down to their ASCII base letter.
// Characters without a decomposable accent pass through unchanged.
pub fn fold_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
            'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
            'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => 'C',
            'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
            'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => 'E',
            'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' => 'i',
            'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' => 'I',
            'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
            'Ñ' | 'Ń' | 'Ņ' | 'Ň' => 'N',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ō' | 'ŏ' | 'ő' => 'o',
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ō' | 'Ŏ' | 'Ő' => 'O',
            'ŕ' | 'ŗ' | 'ř' => 'r',
            'Ŕ' | 'Ŗ' | 'Ř' => 'R',
            'ś' | 'ŝ' | 'ş' | 'š' => 's',
            'Ś' | 'Ŝ' | 'Ş' | 'Š' => 'S',
            'ţ' | 'ť' => 't',
            'Ţ' | 'Ť' => 'T',
            'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
            'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => 'U',
            'ý' | 'ÿ' | 'ŷ' => 'y',
            'Ý' | 'Ŷ' => 'Y',
            'ź' | 'ż' | 'ž' => 'z',
            'Ź' | 'Ż' | 'Ž' => 'Z',
            other => other,
        })
        .collect()
}

// Normalizes the city name to English ASCII through the translator agent.
// Any agent trouble falls back to the raw input; this step never fails a run.
pub struct NormalizeCity {
    input: Schema,
    output: Schema,
}

impl NormalizeCity {
    pub fn new() -> Self {
        Self {
            input: city_schema(),
            output: city_schema(),
        }
    }

    async fn translate(&self, city: &str, ctx: &RunContext) -> Option<String> {
        let agent = ctx.agent(CITY_TRANSLATOR_AGENT)?;
        let prompt = format!(
            "地名を英語ASCII表記に変換して返してください。出力は地名のみ。\n地名: {}",
            city
        );

        let text = match agent.stream(&[Message::user(prompt)]).await {
            Ok(stream) => match drain(stream).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(step = NORMALIZE_CITY_STEP, error = %e, "Agent stream failed, keeping raw city");
                    return None;
                }
            },
            Err(e) => {
                warn!(step = NORMALIZE_CITY_STEP, error = %e, "Agent call failed, keeping raw city");
                return None;
            }
        };

        let first_line = text.trim().lines().next().unwrap_or_default().trim();
        if first_line.is_empty() {
            return None;
        }
        Some(first_line.to_string())
    }
}

impl Default for NormalizeCity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Step for NormalizeCity {
    fn id(&self) -> &str {
        NORMALIZE_CITY_STEP
    }

    fn input_schema(&self) -> &Schema {
        &self.input
    }

    fn output_schema(&self) -> &Schema {
        &self.output
    }

    async fn execute(&self, input: Value, ctx: &RunContext) -> Result<Value, StepError> {
        let city = input_city(&input)?;

        let normalized = self
            .translate(city, ctx)
            .await
            .unwrap_or_else(|| city.to_string());
        let normalized = fold_diacritics(&normalized);

        debug!(step = NORMALIZE_CITY_STEP, raw = %city, normalized = %normalized, "City normalized");
        Ok(json!({ "city": normalized }))
    }
}

// Geocodes the city and fetches the current forecast. An unknown location
// fails the step; weather availability is an explicit flag on the output.
pub struct FetchWeather {
    provider: Arc<dyn WeatherProvider>,
    input: Schema,
    output: Schema,
}

impl FetchWeather {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            provider,
            input: city_schema(),
            output: forecast_schema(),
        }
    }
}

#[async_trait]
impl Step for FetchWeather {
    fn id(&self) -> &str {
        FETCH_WEATHER_STEP
    }

    fn input_schema(&self) -> &Schema {
        &self.input
    }

    fn output_schema(&self) -> &Schema {
        &self.output
    }

    async fn execute(&self, input: Value, _ctx: &RunContext) -> Result<Value, StepError> {
        let city = input_city(&input)?;

        let location = self
            .provider
            .geocode(city)
            .await?
            .ok_or_else(|| StepError::LocationNotFound(city.to_string()))?;

        let data = self
            .provider
            .forecast(location.latitude, location.longitude)
            .await?;

        let temps = &data.hourly.temperature_2m;
        if temps.is_empty() {
            return Err(StepError::Payload(
                "forecast response has no hourly temperatures".to_string(),
            ));
        }
        let max_temp = temps.iter().cloned().fold(f64::MIN, f64::max);
        let min_temp = temps.iter().cloned().fold(f64::MAX, f64::min);
        let precipitation_chance = data
            .hourly
            .precipitation_probability
            .iter()
            .cloned()
            .fold(0.0, f64::max);

        let forecast = Forecast {
            date: Utc::now().to_rfc3339(),
            max_temp,
            min_temp,
            precipitation_chance,
            condition: conditions::describe(data.current.weathercode).to_string(),
            location: location.name,
            has_weather_info: true,
        };

        Ok(serde_json::to_value(forecast)?)
    }
}

// Streams activity suggestions for the forecast from the weather agent.
pub struct PlanActivities {
    input: Schema,
    output: Schema,
}

impl PlanActivities {
    pub fn new() -> Self {
        Self {
            input: forecast_schema(),
            output: activities_schema(),
        }
    }

    fn prompt(forecast: &Value, location: &str) -> String {
        let forecast_json =
            serde_json::to_string_pretty(forecast).unwrap_or_else(|_| forecast.to_string());
        format!(
            "以下の天気予報をもとに「{location}」でのアクティビティを提案してください:\n\
             {forecast_json}\n\n\
             以下の日本語フォーマットを厳守してください（絵文字・見出しも含めそのまま）:\n\n\
             📅 [曜日付きの日付]\n\
             ═══════════════════════════\n\n\
             🌡️ 天気サマリー\n\
             • 状況: [短い説明]\n\
             • 気温: [最低/最高 ℃]\n\
             • 降水確率: [X%]\n\n\
             🌅 午前のおすすめ\n\
             屋外:\n\
             • [アクティビティ名] - [具体的な場所やルートを含む短い説明]\n\
               ベスト時間帯: [時間帯]\n\
               メモ: [天気上の注意点]\n\n\
             🌞 午後のおすすめ\n\
             屋外:\n\
             • [アクティビティ名] - [具体的な場所やルートを含む短い説明]\n\
               ベスト時間帯: [時間帯]\n\
               メモ: [天気上の注意点]\n\n\
             🏠 屋内オプション\n\
             • [アクティビティ名] - [具体的な施設名]\n\
               こんなときに: [雨/暑さ/強風 などトリガー]\n\n\
             ⚠️ 注意事項\n\
             • [警報や紫外線、風などの注意]\n\n\
             ガイドライン:\n\
             - 時間指定の屋外案内を各日2〜3件\n\
             - 屋内の保険プランを1〜2件\n\
             - 降水確率50%以上なら屋内を優先提示\n\
             - 場所固有のスポット名を入れる\n\
             - 気温に応じて運動強度を調整\n\
             - 簡潔で読みやすく"
        )
    }
}

impl Default for PlanActivities {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Step for PlanActivities {
    fn id(&self) -> &str {
        PLAN_ACTIVITIES_STEP
    }

    fn input_schema(&self) -> &Schema {
        &self.input
    }

    fn output_schema(&self) -> &Schema {
        &self.output
    }

    async fn execute(&self, input: Value, ctx: &RunContext) -> Result<Value, StepError> {
        let location = input
            .get("location")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let agent = ctx
            .agent(WEATHER_AGENT)
            .ok_or_else(|| StepError::AgentNotFound(WEATHER_AGENT.to_string()))?;

        let prompt = Self::prompt(&input, &location);
        let stream = agent.stream(&[Message::user(prompt)]).await?;
        let activities = drain(stream).await?;

        debug!(
            step = PLAN_ACTIVITIES_STEP,
            location = %location,
            chars = %activities.chars().count(),
            "Activities generated"
        );
        Ok(json!({ "activities": activities }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, TextStream};
    use crate::error::AgentError;
    use crate::weather::client::{CurrentWeather, ForecastData, GeoLocation, HourlySeries};

    struct ScriptedAgent {
        name: &'static str,
        reply: Option<String>,
    }

    impl ScriptedAgent {
        fn replying(name: &'static str, reply: &str) -> Self {
            Self {
                name,
                reply: Some(reply.to_string()),
            }
        }

        fn failing(name: &'static str) -> Self {
            Self { name, reply: None }
        }
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn name(&self) -> &str {
            self.name
        }

        async fn stream(&self, _messages: &[Message]) -> Result<TextStream, AgentError> {
            match &self.reply {
                Some(reply) => {
                    let fragments: Vec<Result<String, AgentError>> =
                        reply.chars().map(|c| Ok(c.to_string())).collect();
                    Ok(Box::pin(futures::stream::iter(fragments)))
                }
                None => Err(AgentError::Api {
                    status: 500,
                    body: "scripted failure".to_string(),
                }),
            }
        }
    }

    struct ScriptedProvider {
        location: Option<GeoLocation>,
        temps: Vec<f64>,
        probabilities: Vec<f64>,
        weathercode: u16,
    }

    impl ScriptedProvider {
        fn sunny(name: &str) -> Self {
            Self {
                location: Some(GeoLocation {
                    latitude: 35.0,
                    longitude: 139.0,
                    name: name.to_string(),
                }),
                temps: vec![18.0, 24.5, 21.0],
                probabilities: vec![10.0, 35.0, 20.0],
                weathercode: 1,
            }
        }

        fn nowhere() -> Self {
            Self {
                location: None,
                temps: Vec::new(),
                probabilities: Vec::new(),
                weathercode: 0,
            }
        }
    }

    #[async_trait]
    impl WeatherProvider for ScriptedProvider {
        async fn geocode(&self, _city: &str) -> Result<Option<GeoLocation>, StepError> {
            Ok(self.location.clone())
        }

        async fn forecast(&self, _lat: f64, _lon: f64) -> Result<ForecastData, StepError> {
            Ok(ForecastData {
                current: CurrentWeather {
                    weathercode: self.weathercode,
                    precipitation: 0.0,
                },
                hourly: HourlySeries {
                    precipitation_probability: self.probabilities.clone(),
                    temperature_2m: self.temps.clone(),
                },
            })
        }
    }

    #[test]
    fn test_fold_diacritics() {
        assert_eq!(fold_diacritics("Sao Paulo"), "Sao Paulo");
        assert_eq!(fold_diacritics("São Paulo"), "Sao Paulo");
        assert_eq!(fold_diacritics("Zürich"), "Zurich");
        assert_eq!(fold_diacritics("Besançon"), "Besancon");
        assert_eq!(fold_diacritics("東京"), "東京");
    }

    #[test]
    fn test_adjacent_schemas_line_up() {
        assert!(city_schema().accepts(&city_schema()).is_ok());
        assert!(city_schema().accepts(&forecast_schema()).is_err());
        assert!(forecast_schema().accepts(&forecast_schema()).is_ok());
    }

    #[tokio::test]
    async fn test_normalize_city_uses_translator() {
        let ctx = RunContext::builder()
            .with_agent(Arc::new(ScriptedAgent::replying(
                CITY_TRANSLATOR_AGENT,
                "São Paulo\nextra line",
            )))
            .build();

        let output = NormalizeCity::new()
            .execute(json!({"city": "サンパウロ"}), &ctx)
            .await
            .unwrap();

        assert_eq!(output, json!({"city": "Sao Paulo"}));
    }

    #[tokio::test]
    async fn test_normalize_city_without_agent_keeps_input() {
        let ctx = RunContext::builder().build();

        let output = NormalizeCity::new()
            .execute(json!({"city": "Tokyo"}), &ctx)
            .await
            .unwrap();

        assert_eq!(output, json!({"city": "Tokyo"}));
    }

    #[tokio::test]
    async fn test_normalize_city_agent_failure_keeps_input() {
        let ctx = RunContext::builder()
            .with_agent(Arc::new(ScriptedAgent::failing(CITY_TRANSLATOR_AGENT)))
            .build();

        let output = NormalizeCity::new()
            .execute(json!({"city": "Paris"}), &ctx)
            .await
            .unwrap();

        assert_eq!(output, json!({"city": "Paris"}));
    }

    #[tokio::test]
    async fn test_normalize_city_blank_reply_keeps_input() {
        let ctx = RunContext::builder()
            .with_agent(Arc::new(ScriptedAgent::replying(CITY_TRANSLATOR_AGENT, "  \n ")))
            .build();

        let output = NormalizeCity::new()
            .execute(json!({"city": "Paris"}), &ctx)
            .await
            .unwrap();

        assert_eq!(output, json!({"city": "Paris"}));
    }

    #[tokio::test]
    async fn test_fetch_weather_builds_forecast() {
        let ctx = RunContext::builder().build();
        let step = FetchWeather::new(Arc::new(ScriptedProvider::sunny("Tokyo")));

        let output = step.execute(json!({"city": "Tokyo"}), &ctx).await.unwrap();

        assert_eq!(output["location"], "Tokyo");
        assert_eq!(output["max_temp"], 24.5);
        assert_eq!(output["min_temp"], 18.0);
        assert_eq!(output["precipitation_chance"], 35.0);
        assert_eq!(output["condition"], "Mainly clear");
        assert_eq!(output["has_weather_info"], true);
        assert!(step.output_schema().validate(&output).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_weather_unknown_location_fails() {
        let ctx = RunContext::builder().build();
        let step = FetchWeather::new(Arc::new(ScriptedProvider::nowhere()));

        let err = step
            .execute(json!({"city": "Atlantis"}), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, StepError::LocationNotFound(city) if city == "Atlantis"));
    }

    #[tokio::test]
    async fn test_fetch_weather_empty_temperatures_fails() {
        let ctx = RunContext::builder().build();
        let mut provider = ScriptedProvider::sunny("Tokyo");
        provider.temps.clear();
        let step = FetchWeather::new(Arc::new(provider));

        let err = step
            .execute(json!({"city": "Tokyo"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Payload(_)));
    }

    #[tokio::test]
    async fn test_plan_activities_drains_stream() {
        let ctx = RunContext::builder()
            .with_agent(Arc::new(ScriptedAgent::replying(
                WEATHER_AGENT,
                "📅 土曜日: ハイキング日和",
            )))
            .build();

        let forecast = json!({
            "date": "2026-08-06T00:00:00Z",
            "max_temp": 24.5,
            "min_temp": 18.0,
            "precipitation_chance": 35.0,
            "condition": "Mainly clear",
            "location": "Tokyo",
            "has_weather_info": true
        });

        let output = PlanActivities::new().execute(forecast, &ctx).await.unwrap();
        assert_eq!(output["activities"], "📅 土曜日: ハイキング日和");
    }

    #[tokio::test]
    async fn test_plan_activities_requires_agent() {
        let ctx = RunContext::builder().build();
        let forecast = json!({
            "date": "d", "max_temp": 1.0, "min_temp": 0.0,
            "precipitation_chance": 0.0, "condition": "Clear sky",
            "location": "Tokyo", "has_weather_info": true
        });

        let err = PlanActivities::new()
            .execute(forecast, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::AgentNotFound(_)));
    }
}
