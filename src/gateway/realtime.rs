//! Change-notification feeds.
//!
//! The gateway streams one JSON object per line for every committed row
//! change on a subscribed table. Consumers treat events purely as refetch
//! triggers; record payloads are passed through undecoded. There is no
//! reconnect: when the stream ends the subscription is simply closed
//! (failures are surfaced once and dropped, like everything else here).

use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{check_status, Gateway};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub record: serde_json::Value,
}

/// A live change feed for one table. Dropping it aborts the reader task.
pub struct Subscription {
    events: mpsc::Receiver<ChangeEvent>,
    reader: JoinHandle<()>,
}

impl Subscription {
    /// Next change notification, or `None` once the feed has closed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(self) {
        self.reader.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl Gateway {
    /// Opens a change feed for `table`.
    pub async fn subscribe(&self, table: &str) -> Result<Subscription> {
        let url = format!(
            "{}?table={}",
            self.endpoint("/realtime/v1/changes"),
            table
        );

        let mut request = self.http().get(url).header("apikey", self.api_key());
        if let Some(token) = self.bearer().await {
            request = request.bearer_auth(token);
        }

        let response = check_status(request.send().await?).await?;
        debug!(table, "Subscribed to change feed");

        let (tx, events) = mpsc::channel(32);
        let table_name = table.to_string();
        let reader = tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(table = %table_name, error = %e, "Change feed stream error");
                        break;
                    }
                };
                buffer.extend_from_slice(&chunk);

                while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline).collect();
                    let line = &line[..line.len() - 1];
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_slice::<ChangeEvent>(line) {
                        Ok(event) => {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            warn!(table = %table_name, error = %e, "Discarding undecodable change event");
                        }
                    }
                }
            }
            debug!(table = %table_name, "Change feed closed");
        });

        Ok(Subscription { events, reader })
    }
}
