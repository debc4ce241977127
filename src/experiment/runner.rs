use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};

use crate::error::{ExperimentError, TaskError};
use crate::trace::RunMetrics;

use super::dataset::Dataset;
use super::evaluators::{ItemEvaluator, OVERALL_SUCCESS};
use super::run_evaluators::RunEvaluator;
use super::score::{ItemResult, Score};

const DEFAULT_MAX_CONCURRENCY: usize = 3;
const DEGRADED_SCORE: &str = "item_degraded";

// Uniform `(item) -> output` seam between the harness and whatever pipeline
// backs it. Implementations degrade internal failures to failure-shaped
// outputs; an Err here means the item itself was unusable.
#[async_trait]
pub trait ExperimentTask: Send + Sync {
    async fn run(&self, item: &super::dataset::DatasetItem) -> Result<Value, TaskError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentMetadata {
    pub name: String,
    pub description: String,
    pub model: Option<String>,
    pub version: Option<String>,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub metadata: ExperimentMetadata,
    pub item_results: Vec<ItemResult>,
    pub run_scores: Vec<Score>,
}

impl RunReport {
    pub fn format(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Experiment: {}\n", self.metadata.name));
        if !self.metadata.description.is_empty() {
            out.push_str(&format!("  {}\n", self.metadata.description));
        }
        if let Some(ref model) = self.metadata.model {
            out.push_str(&format!("  model: {}\n", model));
        }
        out.push_str(&format!(
            "  executed at: {}\n",
            self.metadata.executed_at.to_rfc3339()
        ));
        out.push_str(&format!("  items: {}\n\n", self.item_results.len()));

        for (index, result) in self.item_results.iter().enumerate() {
            out.push_str(&format!("[{}] {}\n", index + 1, result.item.input));
            for score in &result.evaluations {
                out.push_str(&format!(
                    "    {} = {:.2}  ({})\n",
                    score.name, score.value, score.comment
                ));
            }
        }

        out.push_str("\nRun scores:\n");
        for score in &self.run_scores {
            out.push_str(&format!(
                "    {} = {:.3}  ({})\n",
                score.name, score.value, score.comment
            ));
        }

        out
    }
}

pub struct ExperimentRunner {
    max_concurrency: usize,
    name: String,
    description: String,
    model: Option<String>,
    version: Option<String>,
    metrics: Arc<RunMetrics>,
}

impl ExperimentRunner {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            name: name.into(),
            description: String::new(),
            model: None,
            version: None,
            metrics: RunMetrics::new(),
        }
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn metrics(&self) -> Arc<RunMetrics> {
        self.metrics.clone()
    }

    // Drives the dataset through the task under bounded concurrency, scores
    // each item, then aggregates. Report order always equals dataset order.
    pub async fn run(
        &self,
        dataset: &Dataset,
        task: Arc<dyn ExperimentTask>,
        item_evaluators: &[Arc<dyn ItemEvaluator>],
        run_evaluators: &[Arc<dyn RunEvaluator>],
    ) -> Result<RunReport, ExperimentError> {
        let total = dataset.items.len();
        info!(
            experiment = %self.name,
            dataset = %dataset.name,
            items = %total,
            item_evaluators = %item_evaluators.len(),
            run_evaluators = %run_evaluators.len(),
            max_concurrency = %self.max_concurrency,
            "Starting experiment"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let slots: Arc<Mutex<Vec<Option<ItemResult>>>> =
            Arc::new(Mutex::new((0..total).map(|_| None).collect()));

        let mut handles = Vec::with_capacity(total);
        for (index, item) in dataset.items.iter().cloned().enumerate() {
            let task = task.clone();
            let evaluators: Vec<Arc<dyn ItemEvaluator>> = item_evaluators.to_vec();
            let semaphore = semaphore.clone();
            let slots = slots.clone();
            let metrics = self.metrics.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.unwrap();
                let start = Instant::now();

                let output = match task.run(&item).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(item = %index, error = %e, "Task failed, degrading item");
                        Value::Null
                    }
                };

                // The evaluator pass is sequential and part of this item's
                // unit of work: the result slot is only filled once every
                // evaluator has run.
                let mut evaluations = Vec::with_capacity(evaluators.len());
                for evaluator in &evaluators {
                    let score = evaluator
                        .evaluate(
                            &item.input,
                            &output,
                            &item.expected_output,
                            item.metadata.as_ref(),
                        )
                        .await;
                    match score {
                        Ok(score) => evaluations.push(score),
                        Err(e) => {
                            warn!(item = %index, evaluator = %evaluator.name(), error = %e, "Evaluator failed, recording zero score");
                            evaluations.push(Score::numeric(
                                evaluator.name(),
                                0.0,
                                format!("Evaluator failed: {}", e),
                            ));
                        }
                    }
                }

                let passed = evaluations
                    .iter()
                    .any(|s| s.name == OVERALL_SUCCESS && s.passed());
                metrics.record_item(passed, start.elapsed().as_millis() as u64);

                slots.lock().await[index] = Some(ItemResult {
                    item,
                    output,
                    evaluations,
                });
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Item worker panicked: {}", e);
            }
        }

        let mut guard = slots.lock().await;
        let item_results: Vec<ItemResult> = guard
            .drain(..)
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| ItemResult {
                    item: dataset.items[index].clone(),
                    output: Value::Null,
                    evaluations: vec![Score::numeric(
                        DEGRADED_SCORE,
                        0.0,
                        "item execution did not complete",
                    )],
                })
            })
            .collect();
        drop(guard);

        let mut run_scores = Vec::with_capacity(run_evaluators.len());
        for evaluator in run_evaluators {
            let score = evaluator.evaluate(&item_results).await.map_err(|source| {
                ExperimentError::RunEvaluator {
                    name: evaluator.name().to_string(),
                    source,
                }
            })?;
            run_scores.push(score);
        }

        info!(
            experiment = %self.name,
            items = %item_results.len(),
            run_scores = %run_scores.len(),
            "Experiment finished"
        );

        Ok(RunReport {
            metadata: ExperimentMetadata {
                name: self.name.clone(),
                description: self.description.clone(),
                model: self.model.clone(),
                version: self.version.clone(),
                executed_at: Utc::now(),
            },
            item_results,
            run_scores,
        })
    }
}
