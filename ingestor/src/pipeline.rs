use crate::db;
use crate::decode;
use crate::errors::{Error, Result};
use crate::metrics::{
    DECODE_FAILURES_TOTAL, HEALTH_PERSISTED_TOTAL, MESSAGES_TOTAL, READINGS_PERSISTED_TOTAL,
    STATUS_PUBLISHED_TOTAL, STORE_FAILURES_TOTAL, UNROUTABLE_TOTAL,
};
use crate::model::{HealthReport, RawReading, StatusEvent, StatusMessage};
use crate::status;
use crate::timestamp;
use crate::topic::{self, Route};
use rumqttc::{AsyncClient, QoS};
use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// One inbound broker message, as handed off by the endpoint.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Records prepared from one inbound message, ready to publish/persist.
#[derive(Debug, Clone)]
pub enum Prepared {
    RawReading {
        reading: RawReading,
        event: StatusEvent,
        message: StatusMessage,
    },
    Health(HealthReport),
}

/// Pure half of message handling: route, decode, normalize, derive.
/// No side effects, so every drop reason is unit-testable.
pub fn prepare(topic: &str, payload: &[u8]) -> Result<Prepared> {
    match topic::route(topic)? {
        Route::RawReading { street_id } => {
            let decoded = decode::raw_reading(payload)?;

            // the topic segment is authoritative for the street
            if let Some(payload_street) = decoded.street_id.as_deref() {
                if payload_street != street_id {
                    debug!(
                        "Payload street_id {:?} differs from topic street {:?}, topic wins",
                        payload_street, street_id
                    );
                }
            }

            let ts = timestamp::normalize(&decoded.timestamp)?;
            let (event, message) = status::derive(&decoded, &street_id, ts);

            let reading = RawReading {
                device_id: decoded.device_id,
                timestamp: ts,
                street_id,
                vehicle_count: decoded.vehicle_count as i64,
                congestion_level: decoded.congestion_level,
            };

            Ok(Prepared::RawReading {
                reading,
                event,
                message,
            })
        }
        Route::Health => {
            let decoded = decode::health(payload)?;
            let ts = timestamp::normalize(&decoded.timestamp)?;

            Ok(Prepared::Health(HealthReport {
                device_id: decoded.device_id,
                timestamp: ts,
                status: decoded.status,
                uptime_s: decoded.uptime_s,
            }))
        }
    }
}

/// Effectful half: republish and persist.
///
/// The status event is published before the commit, so downstream may
/// observe a status whose rows were never persisted if the commit then
/// fails. That window is accepted; the publish is not rolled back.
async fn handle(prepared: Prepared, pool: &PgPool, client: &AsyncClient) -> Result<()> {
    match prepared {
        Prepared::RawReading {
            reading,
            event,
            message,
        } => {
            let status_topic = topic::status_topic(&event.street_id);
            let body = serde_json::to_vec(&message)?;
            client
                .publish(status_topic, QoS::AtLeastOnce, false, body)
                .await?;
            STATUS_PUBLISHED_TOTAL.inc();

            db::insert_reading(pool, &reading, &event).await?;
            READINGS_PERSISTED_TOTAL.inc();
        }
        Prepared::Health(report) => {
            db::insert_health(pool, &report).await?;
            HEALTH_PERSISTED_TOTAL.inc();
        }
    }

    Ok(())
}

/// Per-message isolation boundary. Every failure kind terminates here:
/// logged, counted, and dropped without affecting later messages.
pub async fn process(msg: InboundMessage, pool: &PgPool, client: &AsyncClient) {
    MESSAGES_TOTAL.inc();
    debug!(
        "Processing message on topic {}, size: {} bytes",
        msg.topic,
        msg.payload.len()
    );

    let prepared = match prepare(&msg.topic, &msg.payload) {
        Ok(p) => p,
        Err(Error::Unroutable(topic)) => {
            warn!("Dropping message on unroutable topic: {}", topic);
            UNROUTABLE_TOTAL.inc();
            return;
        }
        Err(e) => {
            warn!("Dropping undecodable message on {}: {}", msg.topic, e);
            DECODE_FAILURES_TOTAL.inc();
            return;
        }
    };

    if let Err(e) = handle(prepared, pool, client).await {
        error!("Failed to commit message from {}: {}", msg.topic, e);
        STORE_FAILURES_TOTAL.inc();
    }
}

/// Pipeline worker: drains the endpoint channel, handling each message
/// to completion before taking the next.
pub async fn run(mut rx: mpsc::Receiver<InboundMessage>, pool: PgPool, client: AsyncClient) {
    info!("Starting ingestion pipeline");

    while let Some(msg) = rx.recv().await {
        process(msg, &pool, &client).await;
    }

    info!("Ingestion pipeline stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_prepare_raw_reading() {
        let payload = br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00Z","vehicle_count":5,"congestion_level":"low"}"#;
        let prepared = prepare("traffic/raw/main_st", payload).unwrap();

        match prepared {
            Prepared::RawReading {
                reading,
                event,
                message,
            } => {
                let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
                assert_eq!(reading.device_id, "d1");
                assert_eq!(reading.timestamp, ts);
                assert_eq!(reading.street_id, "main_st");
                assert_eq!(reading.vehicle_count, 5);
                assert_eq!(reading.congestion_level.as_deref(), Some("low"));

                assert_eq!(event.device_id, "d1");
                assert_eq!(event.timestamp, ts);
                assert_eq!(event.street_id, "main_st");
                assert_eq!(event.congestion_level, "low");

                assert_eq!(message.timestamp, "2024-01-01T10:00:00Z");
                assert_eq!(message.congestion_level, "low");
            }
            other => panic!("expected raw reading, got {:?}", other),
        }
    }

    #[test]
    fn test_prepare_raw_reading_without_congestion() {
        let payload =
            br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00Z","vehicle_count":5}"#;
        let prepared = prepare("traffic/raw/main_st", payload).unwrap();

        match prepared {
            Prepared::RawReading {
                reading,
                event,
                message,
            } => {
                // the sentinel lands on the derived event only
                assert_eq!(reading.congestion_level, None);
                assert_eq!(event.congestion_level, "unknown");
                assert_eq!(message.congestion_level, "unknown");
            }
            other => panic!("expected raw reading, got {:?}", other),
        }
    }

    #[test]
    fn test_prepare_street_from_topic_wins_over_payload() {
        let payload = br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00Z","vehicle_count":5,"street_id":"elsewhere"}"#;
        let prepared = prepare("traffic/raw/main_st", payload).unwrap();

        match prepared {
            Prepared::RawReading { reading, event, .. } => {
                assert_eq!(reading.street_id, "main_st");
                assert_eq!(event.street_id, "main_st");
            }
            other => panic!("expected raw reading, got {:?}", other),
        }
    }

    #[test]
    fn test_prepare_health() {
        let payload = br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00Z","status":"ok","uptime_s":120}"#;
        let prepared = prepare("traffic/health", payload).unwrap();

        match prepared {
            Prepared::Health(report) => {
                assert_eq!(report.device_id, "d1");
                assert_eq!(report.status, "ok");
                assert_eq!(report.uptime_s, 120);
            }
            other => panic!("expected health report, got {:?}", other),
        }
    }

    #[test]
    fn test_prepare_unroutable_topic() {
        let payload = br#"{"device_id":"d1"}"#;
        assert!(matches!(
            prepare("unknown/topic", payload),
            Err(Error::Unroutable(_))
        ));
    }

    #[test]
    fn test_prepare_missing_vehicle_count() {
        let payload = br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00Z"}"#;
        assert!(matches!(
            prepare("traffic/raw/main_st", payload),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_prepare_malformed_timestamp() {
        let payload = br#"{"device_id":"d1","timestamp":"yesterday","vehicle_count":5}"#;
        assert!(matches!(
            prepare("traffic/raw/main_st", payload),
            Err(Error::MalformedTimestamp(_, _))
        ));
    }

    #[test]
    fn test_prepare_naive_timestamp_rejected() {
        // no offset and no Z: refused rather than guessed at
        let payload =
            br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00","vehicle_count":5}"#;
        assert!(matches!(
            prepare("traffic/raw/main_st", payload),
            Err(Error::MalformedTimestamp(_, _))
        ));
    }

    #[test]
    fn test_prepare_doubled_suffix_matches_plain_offset() {
        let doubled = br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00+00:00Z","vehicle_count":5}"#;
        let plain =
            br#"{"device_id":"d1","timestamp":"2024-01-01T10:00:00+00:00","vehicle_count":5}"#;

        let a = match prepare("traffic/raw/main_st", doubled).unwrap() {
            Prepared::RawReading { reading, .. } => reading.timestamp,
            other => panic!("expected raw reading, got {:?}", other),
        };
        let b = match prepare("traffic/raw/main_st", plain).unwrap() {
            Prepared::RawReading { reading, .. } => reading.timestamp,
            other => panic!("expected raw reading, got {:?}", other),
        };
        assert_eq!(a, b);
    }
}
