use crate::errors::{Error, Result};
use crate::model::{HealthPayload, RawReadingPayload};

/// Decodes raw-reading message bytes into a typed payload.
///
/// serde reports missing required keys by name, so incomplete payloads
/// fail here with the offending field in the error message.
pub fn raw_reading(payload: &[u8]) -> Result<RawReadingPayload> {
    let reading: RawReadingPayload = serde_json::from_slice(payload)
        .map_err(|e| Error::Decode(format!("raw reading: {}", e)))?;

    if reading.device_id.is_empty() {
        return Err(Error::Decode("raw reading: device_id is empty".to_string()));
    }

    Ok(reading)
}

/// Decodes health message bytes into a typed payload.
pub fn health(payload: &[u8]) -> Result<HealthPayload> {
    let report: HealthPayload = serde_json::from_slice(payload)
        .map_err(|e| Error::Decode(format!("health report: {}", e)))?;

    if report.device_id.is_empty() {
        return Err(Error::Decode("health report: device_id is empty".to_string()));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_reading_complete() {
        let payload = br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00Z","vehicle_count":5,"congestion_level":"low"}"#;
        let reading = raw_reading(payload).unwrap();
        assert_eq!(reading.device_id, "d1");
        assert_eq!(reading.vehicle_count, 5);
        assert_eq!(reading.congestion_level.as_deref(), Some("low"));
        assert_eq!(reading.street_id, None);
    }

    #[test]
    fn test_raw_reading_congestion_optional() {
        let payload = br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00Z","vehicle_count":5}"#;
        let reading = raw_reading(payload).unwrap();
        assert_eq!(reading.congestion_level, None);
    }

    #[test]
    fn test_raw_reading_missing_vehicle_count() {
        let payload = br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00Z"}"#;
        let err = raw_reading(payload).unwrap_err();
        assert!(err.to_string().contains("vehicle_count"));
    }

    #[test]
    fn test_raw_reading_negative_vehicle_count() {
        let payload = br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00Z","vehicle_count":-3}"#;
        assert!(matches!(raw_reading(payload), Err(Error::Decode(_))));
    }

    #[test]
    fn test_raw_reading_not_json() {
        assert!(matches!(raw_reading(b"not json"), Err(Error::Decode(_))));
    }

    #[test]
    fn test_raw_reading_empty_device_id() {
        let payload = br#"{"device_id":"","timestamp":"2024-01-01T10:00:00Z","vehicle_count":5}"#;
        assert!(matches!(raw_reading(payload), Err(Error::Decode(_))));
    }

    #[test]
    fn test_health_complete() {
        let payload = br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00Z","status":"ok","uptime_s":120}"#;
        let report = health(payload).unwrap();
        assert_eq!(report.status, "ok");
        assert_eq!(report.uptime_s, 120);
    }

    #[test]
    fn test_health_missing_uptime() {
        let payload = br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00Z","status":"ok"}"#;
        let err = health(payload).unwrap_err();
        assert!(err.to_string().contains("uptime_s"));
    }
}
