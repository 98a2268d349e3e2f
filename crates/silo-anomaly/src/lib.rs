pub mod error;
pub mod forest;
pub mod scorer;
pub mod trainer;

pub use error::{AnomalyError, Result};
pub use forest::{ForestParams, IsolationForest};
pub use scorer::{AnomalyDetector, AnomalyOutcome, AnomalyScore, AnomalyScorer, MODEL_NAME};
pub use trainer::{ModelTrainer, TrainOutcome};
