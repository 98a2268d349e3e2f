pub mod alert;
pub mod model;
pub mod principal;
pub mod reading;
pub mod silo;
pub mod subscription;

pub use alert::{Alert, AlertLevel, CandidateAlert};
pub use model::AnomalyModelRecord;
pub use principal::{Principal, ReadingOrigin, Role};
pub use reading::{Reading, ReadingField, ReadingPayload};
pub use silo::{coerce_f64, Responsible, Silo, SiloSettings};
pub use subscription::{PushKeys, PushSubscription};

/// 生成文档 ID
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
