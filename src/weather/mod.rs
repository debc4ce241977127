pub mod agents;
pub mod client;
pub mod conditions;
pub mod steps;
pub mod task;

use std::sync::Arc;

use crate::error::AssemblyError;
use crate::workflow::Workflow;

pub use client::{OpenMeteoClient, WeatherProvider};
pub use steps::{FetchWeather, NormalizeCity, PlanActivities};
pub use task::{WeatherTask, WeatherTaskOutput};

pub const WEATHER_WORKFLOW_ID: &str = "weather-workflow";

pub fn build_workflow(provider: Arc<dyn WeatherProvider>) -> Result<Workflow, AssemblyError> {
    Workflow::builder(WEATHER_WORKFLOW_ID)
        .then(NormalizeCity::new())
        .then(FetchWeather::new(provider))
        .then(PlanActivities::new())
        .commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_workflow_commits() {
        let provider = Arc::new(OpenMeteoClient::new().unwrap());
        let workflow = build_workflow(provider).expect("workflow should commit");
        assert_eq!(workflow.id(), WEATHER_WORKFLOW_ID);
        assert_eq!(
            workflow.step_ids(),
            vec!["normalize-city", "fetch-weather", "plan-activities"]
        );
    }
}
