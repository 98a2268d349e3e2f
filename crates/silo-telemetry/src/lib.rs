pub mod channels;
pub mod client;
pub mod error;
pub mod feed;
pub mod import;
pub mod poller;
pub mod scheduler;
pub mod sweep;

#[cfg(test)]
pub(crate) mod testing;

pub use channels::{ChannelBinding, ChannelMap};
pub use client::{TelemetrySource, ThingSpeakClient, THINGSPEAK_API_BASE};
pub use error::{Result, TelemetryError};
pub use feed::{Feed, FeedResponse};
pub use import::{import_history, ImportReport};
pub use poller::TelemetryPoller;
pub use scheduler::ScheduledSweep;
pub use sweep::{ChannelSweep, SiloResolution, SweepReport};
