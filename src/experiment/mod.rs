pub mod dataset;
pub mod evaluators;
pub mod run_evaluators;
pub mod runner;
pub mod score;
pub mod store;

pub use dataset::{Dataset, DatasetItem, ItemMetadata};
pub use evaluators::{default_item_evaluators, ItemEvaluator};
pub use run_evaluators::{default_run_evaluators, RunEvaluator};
pub use runner::{ExperimentRunner, ExperimentTask, RunReport};
pub use score::{ItemResult, Score, ScoreDataType};
pub use store::{DatasetStore, HttpStore, MemoryStore};
