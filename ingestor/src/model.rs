use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel congestion level applied to derived status events when the
/// sensor did not report one. Never written to `traffic_raw`.
pub const CONGESTION_UNKNOWN: &str = "unknown";

/// Inbound payload on `traffic/raw/<street>` (wire format, timestamp
/// still the publisher's string).
#[derive(Debug, Clone, Deserialize)]
pub struct RawReadingPayload {
    pub device_id: String,
    pub timestamp: String,
    pub vehicle_count: u32,
    #[serde(default)]
    pub congestion_level: Option<String>,
    /// Some publishers still embed the street in the payload; the topic
    /// segment is authoritative and this field is ignored when present.
    #[serde(default)]
    pub street_id: Option<String>,
}

/// Inbound payload on `traffic/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthPayload {
    pub device_id: String,
    pub timestamp: String,
    pub status: String,
    pub uptime_s: i64,
}

/// Persisted raw reading, timestamp normalized to UTC.
#[derive(Debug, Clone, Serialize)]
pub struct RawReading {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub street_id: String,
    pub vehicle_count: i64,
    pub congestion_level: Option<String>,
}

/// Persisted status event derived from a raw reading. Congestion level
/// is never absent here.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub street_id: String,
    pub congestion_level: String,
}

/// Outbound wire form republished on `traffic/status/<street>`. Carries
/// the original timestamp string, not the normalized instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessage {
    pub device_id: String,
    pub timestamp: String,
    pub street_id: String,
    pub congestion_level: String,
}

/// Persisted device health report.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub uptime_s: i64,
}
