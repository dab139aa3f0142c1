//! MQTT barcode resolver service.
//!
//! Subscribes to the per-device lookup request topics, resolves each barcode
//! through the [`LookupClient`], and publishes a correlated response back to
//! the requesting device. Requests without a barcode (or with an unparseable
//! payload) are dropped without a response; the device's own client-side
//! timeout covers that case.

use std::time::{Duration, Instant};

use chrono::Utc;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::MqttConfig;
use crate::models::{LookupRequest, LookupResponse};
use crate::services::LookupClient;

/// Topic filter matching lookup requests from any device.
pub const REQUEST_TOPIC_FILTER: &str = "barcode/lookup/request/+";

const REQUEST_TOPIC_PREFIX: &str = "barcode/lookup/request/";
const RESPONSE_TOPIC_PREFIX: &str = "barcode/lookup/response";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct ResolverService {
    client: AsyncClient,
    event_loop: EventLoop,
    lookup: LookupClient,
}

impl ResolverService {
    pub fn new(config: &MqttConfig, lookup: LookupClient) -> Self {
        // Unique suffix so parallel instances never steal each other's session.
        let client_id = format!("barcode-proxy-{}", &Uuid::new_v4().simple().to_string()[..8]);
        let mut options = MqttOptions::new(client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        let (client, event_loop) = AsyncClient::new(options, 16);

        Self {
            client,
            event_loop,
            lookup,
        }
    }

    /// Drive the connection until the owning task is aborted.
    ///
    /// Subscription happens on every ConnAck so the filter survives broker
    /// reconnects. Each inbound request is handled on its own task; slow
    /// lookups never stall the event loop or each other.
    pub async fn start(mut self) {
        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Connected to MQTT broker, subscribing to {}", REQUEST_TOPIC_FILTER);
                    if let Err(e) = self
                        .client
                        .subscribe(REQUEST_TOPIC_FILTER, QoS::AtLeastOnce)
                        .await
                    {
                        error!("Failed to subscribe to {}: {}", REQUEST_TOPIC_FILTER, e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let client = self.client.clone();
                    let lookup = self.lookup.clone();
                    tokio::spawn(async move {
                        handle_request(client, lookup, &publish.topic, &publish.payload).await;
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    error!(
                        "MQTT connection error: {}, retrying in {}s",
                        e,
                        RECONNECT_DELAY.as_secs()
                    );
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}

async fn handle_request(client: AsyncClient, lookup: LookupClient, topic: &str, payload: &[u8]) {
    let Some(device_id) = device_id_from_topic(topic) else {
        debug!("Ignoring message on unrelated topic: {}", topic);
        return;
    };

    let Some(request) = parse_request(payload) else {
        warn!("Dropping invalid lookup request from {}", device_id);
        return;
    };

    let request_id = request.request_id.unwrap_or_else(|| "unknown".to_string());
    info!(
        "Processing request {} from {}: {}",
        request_id, device_id, request.barcode
    );

    let started = Instant::now();
    let product = lookup.lookup(&request.barcode).await;
    let lookup_time_ms = started.elapsed().as_millis() as u64;

    let response = LookupResponse {
        request_id,
        success: product.is_some(),
        barcode: request.barcode,
        product,
        lookup_time_ms,
        timestamp: Utc::now().timestamp(),
    };

    let topic = response_topic(device_id);
    let payload = match serde_json::to_vec(&response) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to encode response for {}: {}", device_id, e);
            return;
        }
    };

    // Publish failures are logged only; delivery retry is the transport's
    // business, not ours.
    match client.publish(&topic, QoS::AtLeastOnce, false, payload).await {
        Ok(()) => info!(
            "Published response to {}: {} ({}ms)",
            device_id,
            if response.success { "SUCCESS" } else { "NOT_FOUND" },
            lookup_time_ms
        ),
        Err(e) => error!("Failed to publish response to {}: {}", topic, e),
    }
}

/// Extract the device id from a request topic, rejecting anything outside
/// the request namespace or with a nested path where the id should be.
fn device_id_from_topic(topic: &str) -> Option<&str> {
    topic
        .strip_prefix(REQUEST_TOPIC_PREFIX)
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

fn response_topic(device_id: &str) -> String {
    format!("{}/{}", RESPONSE_TOPIC_PREFIX, device_id)
}

/// Parse an inbound payload. `None` when the message is not valid JSON or
/// the barcode field is missing or empty.
fn parse_request(payload: &[u8]) -> Option<LookupRequest> {
    let request: LookupRequest = serde_json::from_slice(payload).ok()?;
    if request.barcode.is_empty() {
        return None;
    }
    Some(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_is_the_trailing_topic_segment() {
        assert_eq!(
            device_id_from_topic("barcode/lookup/request/dev1"),
            Some("dev1")
        );
        assert_eq!(device_id_from_topic("barcode/lookup/request/"), None);
        assert_eq!(device_id_from_topic("barcode/lookup/response/dev1"), None);
        assert_eq!(
            device_id_from_topic("barcode/lookup/request/dev1/extra"),
            None
        );
    }

    #[test]
    fn response_topic_targets_the_requesting_device() {
        assert_eq!(response_topic("dev1"), "barcode/lookup/response/dev1");
    }

    #[test]
    fn request_with_barcode_parses() {
        let request =
            parse_request(br#"{"barcode":"012345678905","request_id":"abc123","timestamp":1}"#)
                .unwrap();
        assert_eq!(request.barcode, "012345678905");
        assert_eq!(request.request_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn request_missing_barcode_is_rejected() {
        assert!(parse_request(br#"{"request_id":"abc123"}"#).is_none());
        assert!(parse_request(br#"{"barcode":"","request_id":"abc123"}"#).is_none());
    }

    #[test]
    fn non_json_payload_is_rejected() {
        assert!(parse_request(b"012345678905").is_none());
        assert!(parse_request(b"").is_none());
    }
}
