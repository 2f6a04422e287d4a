use crate::model::{RawReadingPayload, StatusEvent, StatusMessage, CONGESTION_UNKNOWN};
use chrono::{DateTime, Utc};

/// Projects a raw reading into its derived status event.
///
/// Returns both the persisted form (normalized timestamp) and the wire
/// form republished downstream (original timestamp string). Total over
/// valid input: a missing congestion level becomes the "unknown"
/// sentinel on the derived event only.
pub fn derive(
    payload: &RawReadingPayload,
    street_id: &str,
    timestamp: DateTime<Utc>,
) -> (StatusEvent, StatusMessage) {
    let congestion_level = payload
        .congestion_level
        .clone()
        .unwrap_or_else(|| CONGESTION_UNKNOWN.to_string());

    let event = StatusEvent {
        device_id: payload.device_id.clone(),
        timestamp,
        street_id: street_id.to_string(),
        congestion_level: congestion_level.clone(),
    };

    let message = StatusMessage {
        device_id: payload.device_id.clone(),
        timestamp: payload.timestamp.clone(),
        street_id: street_id.to_string(),
        congestion_level,
    };

    (event, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn payload(congestion_level: Option<&str>) -> RawReadingPayload {
        RawReadingPayload {
            device_id: "d1".to_string(),
            timestamp: "2024-01-01T10:00:00Z".to_string(),
            vehicle_count: 5,
            congestion_level: congestion_level.map(str::to_string),
            street_id: None,
        }
    }

    #[test]
    fn test_derive_preserves_fields() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let (event, message) = derive(&payload(Some("low")), "main_st", ts);

        assert_eq!(event.device_id, "d1");
        assert_eq!(event.timestamp, ts);
        assert_eq!(event.street_id, "main_st");
        assert_eq!(event.congestion_level, "low");

        assert_eq!(message.device_id, "d1");
        assert_eq!(message.timestamp, "2024-01-01T10:00:00Z");
        assert_eq!(message.street_id, "main_st");
        assert_eq!(message.congestion_level, "low");
    }

    #[test]
    fn test_derive_defaults_missing_congestion_to_unknown() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let (event, message) = derive(&payload(None), "main_st", ts);
        assert_eq!(event.congestion_level, "unknown");
        assert_eq!(message.congestion_level, "unknown");
    }
}
