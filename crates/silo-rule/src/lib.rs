pub mod engine;
pub mod model;

pub use engine::RuleEngine;
pub use model::{default_rules, ThresholdRule};
