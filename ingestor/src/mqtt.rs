use crate::errors::{Error, Result};
use crate::metrics::CHANNEL_FULL_TOTAL;
use crate::pipeline::InboundMessage;
use crate::topic;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Creates the broker client. The returned `AsyncClient` is cloned into
/// the pipeline for status republishing; the event loop is driven by
/// `run_endpoint`.
pub fn connect(broker: &str, port: u16, client_id: &str) -> (AsyncClient, EventLoop) {
    let mut mqtt_options = MqttOptions::new(client_id, broker, port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_clean_session(false);

    AsyncClient::new(mqtt_options, 10_000)
}

/// Drives the broker connection: subscribes on every ConnAck (so the
/// subscription set survives reconnects), forwards inbound publishes to
/// the pipeline channel, and lets rumqttc handle reconnection itself.
pub async fn run_endpoint(
    client: AsyncClient,
    mut eventloop: EventLoop,
    tx: mpsc::Sender<InboundMessage>,
) -> Result<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Connected to MQTT broker");
                client
                    .subscribe(topic::RAW_SUBSCRIPTION, QoS::AtLeastOnce)
                    .await?;
                client
                    .subscribe(topic::HEALTH_TOPIC, QoS::AtLeastOnce)
                    .await?;
                info!(
                    "Subscribed to {} and {} with QoS 1",
                    topic::RAW_SUBSCRIPTION,
                    topic::HEALTH_TOPIC
                );
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                forward(publish, &tx).await?;
            }
            Ok(_) => {}
            Err(e) => {
                error!("MQTT error: {}", e);
                // rumqttc automatically reconnects, so we just log and continue
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Hands one publish off to the pipeline. Falls back to a blocking send
/// under backpressure; a closed channel means the pipeline is gone and
/// the endpoint should stop.
async fn forward(publish: Publish, tx: &mpsc::Sender<InboundMessage>) -> Result<()> {
    let msg = InboundMessage {
        topic: publish.topic,
        payload: publish.payload.to_vec(),
    };

    match tx.try_send(msg) {
        Ok(()) => Ok(()),
        Err(mpsc::error::TrySendError::Full(msg)) => {
            CHANNEL_FULL_TOTAL.inc();
            debug!("Pipeline channel full, using blocking send");
            tx.send(msg).await.map_err(|_| Error::ChannelSend)
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            error!("Pipeline channel closed, cannot forward message");
            Err(Error::ChannelSend)
        }
    }
}
