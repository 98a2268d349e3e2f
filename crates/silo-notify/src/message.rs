use serde_json::json;
use silo_types::Alert;

/// 推送通知标题
pub const PUSH_TITLE: &str = "Silo Monitor";

/// 告警文本：`[LEVEL] SiloName: message (valor=value)`
///
/// 筒仓不存在时名称回退为 `Silo`。
pub fn alert_text(alert: &Alert, silo_name: Option<&str>) -> String {
    format!(
        "[{}] {}: {} (valor={})",
        alert.level.as_str().to_uppercase(),
        silo_name.unwrap_or("Silo"),
        alert.message,
        alert.value
    )
}

/// 推送载荷（JSON）
pub fn push_payload(text: &str) -> Vec<u8> {
    json!({ "title": PUSH_TITLE, "body": text }).to_string().into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use silo_types::{AlertLevel, CandidateAlert};

    #[test]
    fn test_alert_text() {
        let alert = Alert::from_candidate(
            "silo-1",
            CandidateAlert::new(AlertLevel::Warning, "Temperatura acima do limite", 40.0),
        );

        assert_eq!(
            alert_text(&alert, Some("Silo Norte")),
            "[WARNING] Silo Norte: Temperatura acima do limite (valor=40)"
        );
        assert_eq!(
            alert_text(&alert, None),
            "[WARNING] Silo: Temperatura acima do limite (valor=40)"
        );
    }

    #[test]
    fn test_push_payload() {
        let payload = push_payload("[CRITICAL] A: CO2 acima do limite (valor=1200.5)");
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();

        assert_eq!(value["title"], "Silo Monitor");
        assert_eq!(value["body"], "[CRITICAL] A: CO2 acima do limite (valor=1200.5)");
    }
}
