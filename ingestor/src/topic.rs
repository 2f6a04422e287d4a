use crate::errors::{Error, Result};

/// Subscription set registered on every (re)connect.
pub const RAW_SUBSCRIPTION: &str = "traffic/raw/+";
pub const HEALTH_TOPIC: &str = "traffic/health";

const RAW_PREFIX: &str = "traffic/raw/";
const STATUS_PREFIX: &str = "traffic/status";

/// Classified inbound channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    RawReading { street_id: String },
    Health,
}

/// Maps an inbound topic to a message kind, extracting the street
/// identifier for raw readings. Unknown topics are unroutable.
pub fn route(topic: &str) -> Result<Route> {
    if topic == HEALTH_TOPIC {
        return Ok(Route::Health);
    }

    if let Some(street) = topic.strip_prefix(RAW_PREFIX) {
        // exactly one non-empty trailing segment
        if !street.is_empty() && !street.contains('/') {
            return Ok(Route::RawReading {
                street_id: street.to_string(),
            });
        }
    }

    Err(Error::Unroutable(topic.to_string()))
}

/// Outbound topic for the derived status event of a street.
pub fn status_topic(street_id: &str) -> String {
    format!("{}/{}", STATUS_PREFIX, street_id)
}
