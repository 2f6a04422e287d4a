mod sensor;

use chrono::{SecondsFormat, Utc};
use clap::Parser;
use rand::Rng;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use sensor::{HealthMessage, RawReadingMessage};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Synthetic roadside-sensor publisher for local testing.
#[derive(Debug, Parser)]
struct Args {
    /// MQTT broker host
    #[arg(long, env = "MQTT_BROKER", default_value = "localhost")]
    broker: String,

    /// MQTT broker port
    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    port: u16,

    /// Delay between readings, per street
    #[arg(long, env = "INTERVAL_MS", default_value_t = 1000)]
    interval_ms: u64,

    /// Streets to simulate (comma separated)
    #[arg(
        long,
        env = "STREETS",
        value_delimiter = ',',
        default_value = "main_st,oak_ave,pine_rd"
    )]
    streets: Vec<String>,

    /// Seconds between health reports, per device
    #[arg(long, env = "HEALTH_INTERVAL_S", default_value_t = 30)]
    health_interval_s: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting Traffic Simulator");
    info!(
        "Broker: {}:{}, Streets: {:?}, Interval: {}ms",
        args.broker, args.port, args.streets, args.interval_ms
    );

    let client_id = format!("traffic-sim-{}", uuid::Uuid::new_v4());
    let mut mqtt_options = MqttOptions::new(&client_id, &args.broker, args.port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 1000);

    // Spawn eventloop handler
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT eventloop error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    tokio::time::sleep(Duration::from_secs(2)).await;
    info!("Connected to MQTT broker, starting to publish readings");

    let started = Instant::now();
    let mut last_health = Instant::now();
    let mut counter = 0u64;

    loop {
        for street in &args.streets {
            let device_id = format!("sensor-{}", street);
            let reading = generate_reading(device_id);

            let topic = format!("traffic/raw/{}", street);
            let payload = match serde_json::to_string(&reading) {
                Ok(p) => p,
                Err(e) => {
                    error!("Failed to serialize reading: {}", e);
                    continue;
                }
            };

            match client.publish(&topic, QoS::AtLeastOnce, false, payload).await {
                Ok(_) => {
                    counter += 1;
                }
                Err(e) => {
                    warn!("Failed to publish: {}", e);
                }
            }
        }

        if last_health.elapsed() >= Duration::from_secs(args.health_interval_s) {
            last_health = Instant::now();
            for street in &args.streets {
                let health = HealthMessage {
                    device_id: format!("sensor-{}", street),
                    timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                    status: "ok".to_string(),
                    uptime_s: started.elapsed().as_secs() as i64,
                };
                if let Ok(payload) = serde_json::to_string(&health) {
                    if let Err(e) = client
                        .publish("traffic/health", QoS::AtLeastOnce, false, payload)
                        .await
                    {
                        warn!("Failed to publish health: {}", e);
                    }
                }
            }
        }

        if counter % 100 == 0 && counter > 0 {
            info!("Published {} readings", counter);
        }

        tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
    }
}

fn generate_reading(device_id: String) -> RawReadingMessage {
    let mut rng = rand::thread_rng();

    let vehicle_count: u32 = rng.gen_range(0..45);
    let congestion_level = if rng.gen_bool(0.1) {
        // some sensors omit the field entirely
        None
    } else if vehicle_count < 10 {
        Some("low".to_string())
    } else if vehicle_count < 25 {
        Some("medium".to_string())
    } else {
        Some("high".to_string())
    };

    RawReadingMessage {
        device_id,
        timestamp: format_timestamp(&mut rng),
        vehicle_count,
        congestion_level,
    }
}

/// Real sensors disagree on timestamp encoding; reproduce the variants
/// the ingestor has to normalize, including the doubled "+00:00Z" one.
fn format_timestamp(rng: &mut impl Rng) -> String {
    let now = Utc::now();
    match rng.gen_range(0..10) {
        0..=5 => now.to_rfc3339_opts(SecondsFormat::Secs, true),
        6..=8 => now.to_rfc3339_opts(SecondsFormat::Secs, false),
        _ => format!("{}Z", now.to_rfc3339_opts(SecondsFormat::Secs, false)),
    }
}
