pub mod dispatcher;
pub mod error;
pub mod message;
pub mod telegram;
pub mod transport;
pub mod webpush;

pub use dispatcher::{ChatOutcome, DispatchReport, NotificationDispatcher};
pub use error::{ChatError, PushError};
pub use message::{alert_text, push_payload, PUSH_TITLE};
pub use telegram::TelegramNotifier;
pub use transport::{ChatTransport, PushTransport};
pub use webpush::{VapidConfig, WebPushNotifier};
