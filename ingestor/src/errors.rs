use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unroutable topic: {0}")]
    Unroutable(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("malformed timestamp {0:?}: {1}")]
    MalformedTimestamp(String, chrono::ParseError),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("channel send error")]
    ChannelSend,
}

pub type Result<T> = std::result::Result<T, Error>;
