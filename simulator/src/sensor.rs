use serde::Serialize;

/// Raw reading as published on `traffic/raw/<street>`.
#[derive(Debug, Clone, Serialize)]
pub struct RawReadingMessage {
    pub device_id: String,
    pub timestamp: String,
    pub vehicle_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub congestion_level: Option<String>,
}

/// Health report as published on `traffic/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthMessage {
    pub device_id: String,
    pub timestamp: String,
    pub status: String,
    pub uptime_s: i64,
}
