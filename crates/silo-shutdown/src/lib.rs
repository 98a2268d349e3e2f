pub mod signal;

pub use signal::{ShutdownReceiver, ShutdownSignal, SignalHandler};
