//! Change-notification feed for the pins collection.
//!
//! Maintains a persistent SSE connection to the backend's change stream and
//! forwards every insert/update/delete event to the broadcaster. The feed
//! carries no row data worth trusting; consumers respond with a full
//! refetch, so a dropped or duplicated event costs at most one redundant
//! rebuild.

use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event as SseEvent, EventSource};
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::events::{ChangeKind, PinChangeBroadcaster, PinChangeNotification};
use crate::pin::PinId;

/// Delay before reconnecting after a dropped stream.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ChangeEventData {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<PinId>,
}

fn parse_kind(kind: &str) -> Option<ChangeKind> {
    match kind {
        "INSERT" | "insert" => Some(ChangeKind::Insert),
        "UPDATE" | "update" => Some(ChangeKind::Update),
        "DELETE" | "delete" => Some(ChangeKind::Delete),
        _ => None,
    }
}

/// Task that subscribes to the change stream and pumps notifications into
/// the broadcaster, reconnecting on any stream error.
pub async fn change_feed_task(client: Client, feed_url: String, changes: PinChangeBroadcaster) {
    loop {
        info!("Connecting to change feed: {}", feed_url);

        let request_builder = client.get(&feed_url);

        let mut es = match EventSource::new(request_builder) {
            Ok(es) => es,
            Err(e) => {
                error!("Failed to create EventSource: {}", e);
                sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        while let Some(event) = es.next().await {
            match event {
                Ok(SseEvent::Open) => {
                    info!("Change feed connection opened");
                }
                Ok(SseEvent::Message(msg)) => {
                    debug!("Change feed event: {} - {}", msg.event, msg.data);

                    match msg.event.as_str() {
                        "change" => match serde_json::from_str::<ChangeEventData>(&msg.data) {
                            Ok(data) => {
                                let Some(kind) = parse_kind(&data.kind) else {
                                    warn!("Unknown change kind: {}", data.kind);
                                    continue;
                                };
                                changes.notify(PinChangeNotification {
                                    kind,
                                    pin_id: data.id,
                                });
                            }
                            Err(e) => {
                                warn!("Failed to parse change event: {}", e);
                            }
                        },
                        "connected" => {
                            info!("Change feed subscribed");
                        }
                        other => {
                            debug!("Unknown change feed event type: {}", other);
                        }
                    }
                }
                Err(e) => {
                    error!("Change feed error: {}", e);
                    break;
                }
            }
        }

        warn!("Change feed closed, reconnecting in 5s...");
        sleep(RECONNECT_DELAY).await;
    }
}
