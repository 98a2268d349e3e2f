pub mod intake;
pub mod sink;

pub use intake::{IngestReport, ReadingIntake, ANOMALY_MESSAGE};
pub use sink::{AlertSink, DispatchMode};
