use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::context::RunContext;
use crate::error::TaskError;
use crate::experiment::dataset::DatasetItem;
use crate::experiment::runner::ExperimentTask;
use crate::workflow::{RunStatus, Workflow};

use super::steps::{FETCH_WEATHER_STEP, PLAN_ACTIVITIES_STEP};

// The fixed output shape every evaluator consumes, regardless of how the
// workflow produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherTaskOutput {
    pub activities: String,
    pub location: String,
    pub has_weather_info: bool,
    pub has_activities: bool,
}

impl WeatherTaskOutput {
    pub fn failure(location: impl Into<String>) -> Self {
        Self {
            activities: String::new(),
            location: location.into(),
            has_weather_info: false,
            has_activities: false,
        }
    }
}

// Adapts a workflow invocation to the harness contract: one dataset item in,
// one fixed-shape record out. Workflow failures degrade to a failure-shaped
// output instead of propagating, so a bad item never aborts a batch.
pub struct WeatherTask {
    workflow: Arc<Workflow>,
    ctx: Arc<RunContext>,
}

impl WeatherTask {
    pub fn new(workflow: Arc<Workflow>, ctx: Arc<RunContext>) -> Self {
        Self { workflow, ctx }
    }
}

#[async_trait]
impl ExperimentTask for WeatherTask {
    async fn run(&self, item: &DatasetItem) -> Result<Value, TaskError> {
        let city = item
            .input
            .get("city")
            .and_then(Value::as_str)
            .ok_or_else(|| TaskError::MalformedInput("missing 'city' field".to_string()))?;

        info!(city = %city, "Running weather workflow");
        let run = self.workflow.run(serde_json::json!({ "city": city }), &self.ctx).await;

        if run.status() != RunStatus::Success {
            warn!(city = %city, run_id = %run.id(), "Workflow failed, recording failure output");
            return Ok(serde_json::to_value(WeatherTaskOutput::failure(city))?);
        }

        let activities = run
            .final_output()
            .and_then(|v| v.get("activities"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        // Signals the evaluators need live in intermediate step outputs, not
        // only the terminal one; the run exposes them keyed by step id.
        let fetch_output = run.step_output(FETCH_WEATHER_STEP);
        let location = fetch_output
            .and_then(|v| v.get("location"))
            .and_then(Value::as_str)
            .unwrap_or(city)
            .to_string();
        let has_weather_info = fetch_output
            .and_then(|v| v.get("has_weather_info"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let has_activities =
            run.step_succeeded(PLAN_ACTIVITIES_STEP) && !activities.trim().is_empty();

        info!(
            city = %city,
            location = %location,
            has_weather_info = %has_weather_info,
            has_activities = %has_activities,
            "Workflow completed"
        );

        Ok(serde_json::to_value(WeatherTaskOutput {
            activities,
            location,
            has_weather_info,
            has_activities,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, Message, TextStream};
    use crate::error::{AgentError, StepError};
    use crate::weather::client::{
        CurrentWeather, ForecastData, GeoLocation, HourlySeries, WeatherProvider,
    };
    use crate::weather::steps::{FetchWeather, NormalizeCity, PlanActivities};
    use serde_json::json;

    struct ScriptedAgent {
        name: &'static str,
        reply: String,
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn name(&self) -> &str {
            self.name
        }

        async fn stream(&self, _messages: &[Message]) -> Result<TextStream, AgentError> {
            let reply = self.reply.clone();
            Ok(Box::pin(futures::stream::once(async move { Ok(reply) })))
        }
    }

    struct ScriptedProvider {
        found: bool,
    }

    #[async_trait]
    impl WeatherProvider for ScriptedProvider {
        async fn geocode(&self, city: &str) -> Result<Option<GeoLocation>, StepError> {
            if !self.found {
                return Ok(None);
            }
            Ok(Some(GeoLocation {
                latitude: -23.55,
                longitude: -46.63,
                name: city.to_string(),
            }))
        }

        async fn forecast(&self, _lat: f64, _lon: f64) -> Result<ForecastData, StepError> {
            Ok(ForecastData {
                current: CurrentWeather {
                    weathercode: 2,
                    precipitation: 0.0,
                },
                hourly: HourlySeries {
                    precipitation_probability: vec![20.0, 55.0],
                    temperature_2m: vec![17.0, 26.0],
                },
            })
        }
    }

    fn scripted_context(activities: &str) -> Arc<RunContext> {
        Arc::new(
            RunContext::builder()
                .with_agent(Arc::new(ScriptedAgent {
                    name: crate::weather::steps::CITY_TRANSLATOR_AGENT,
                    reply: "Sao Paulo".to_string(),
                }))
                .with_agent(Arc::new(ScriptedAgent {
                    name: crate::weather::steps::WEATHER_AGENT,
                    reply: activities.to_string(),
                }))
                .build(),
        )
    }

    fn workflow(found: bool) -> Arc<Workflow> {
        Arc::new(
            Workflow::builder("weather-workflow")
                .then(NormalizeCity::new())
                .then(FetchWeather::new(Arc::new(ScriptedProvider { found })))
                .then(PlanActivities::new())
                .commit()
                .expect("workflow should commit"),
        )
    }

    fn item(city: &str) -> DatasetItem {
        DatasetItem {
            input: json!({ "city": city }),
            expected_output: json!({
                "has_weather_info": true,
                "has_activities": true,
                "location_in_japanese": "サンパウロ"
            }),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_successful_run_extracts_cross_step_flags() {
        let task = WeatherTask::new(workflow(true), scripted_context("サンパウロでの一日: 公園散歩"));

        let output = task.run(&item("São Paulo")).await.unwrap();

        assert_eq!(output["location"], "Sao Paulo");
        assert_eq!(output["has_weather_info"], true);
        assert_eq!(output["has_activities"], true);
        assert_eq!(output["activities"], "サンパウロでの一日: 公園散歩");
    }

    #[tokio::test]
    async fn test_failed_workflow_degrades_to_failure_output() {
        let task = WeatherTask::new(workflow(false), scripted_context("unused"));

        let output = task.run(&item("Atlantis")).await.unwrap();

        let parsed: WeatherTaskOutput = serde_json::from_value(output).unwrap();
        assert_eq!(parsed, WeatherTaskOutput::failure("Atlantis"));
    }

    #[tokio::test]
    async fn test_blank_activities_clear_the_flag() {
        let task = WeatherTask::new(workflow(true), scripted_context("   "));

        let output = task.run(&item("São Paulo")).await.unwrap();

        assert_eq!(output["has_weather_info"], true);
        assert_eq!(output["has_activities"], false);
    }

    #[tokio::test]
    async fn test_sao_paulo_end_to_end_through_runner() {
        use crate::experiment::dataset::Dataset;
        use crate::experiment::evaluators::default_item_evaluators;
        use crate::experiment::runner::ExperimentRunner;

        let dataset = Dataset {
            name: "weather-workflow-evaluation".to_string(),
            description: String::new(),
            items: vec![item("São Paulo")],
        };
        let evaluators = default_item_evaluators();

        // Healthy collaborators: both checks pass.
        let task = Arc::new(WeatherTask::new(
            workflow(true),
            scripted_context("サンパウロでの一日: 公園散歩"),
        ));
        let report = ExperimentRunner::new("e2e")
            .run(&dataset, task, &evaluators, &[])
            .await
            .unwrap();

        let overall = report.item_results[0].score("overall_success").unwrap();
        assert_eq!(overall.value, 1.0);
        assert_eq!(overall.comment, "All checks passed");

        // Geocoding misses: the run degrades and the comment names the
        // failed checks.
        let task = Arc::new(WeatherTask::new(workflow(false), scripted_context("unused")));
        let report = ExperimentRunner::new("e2e-degraded")
            .run(&dataset, task, &evaluators, &[])
            .await
            .unwrap();

        let overall = report.item_results[0].score("overall_success").unwrap();
        assert_eq!(overall.value, 0.0);
        assert_eq!(overall.comment, "Weather: false, Activities: false");
    }

    #[tokio::test]
    async fn test_malformed_item_input_is_a_task_error() {
        let task = WeatherTask::new(workflow(true), scripted_context("unused"));
        let bad = DatasetItem {
            input: json!({ "town": "Tokyo" }),
            expected_output: json!({}),
            metadata: None,
        };

        assert!(task.run(&bad).await.is_err());
    }
}
