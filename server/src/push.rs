//! Push notification fan-out.
//!
//! A meal announcement is sent as three identical bursts spaced two seconds
//! apart so the alert keeps ringing on the receiving phones instead of
//! flashing once. Bursts run on a detached task; the HTTP response that
//! triggered them never waits, and a failed burst is logged and skipped
//! without cancelling the ones still scheduled.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub const EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Tokens not matching the provider format are dropped before dispatch.
const TOKEN_PREFIX: &str = "ExponentPushToken";

const BURSTS: u64 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: Value,
    pub sound: &'static str,
    pub priority: &'static str,
    #[serde(rename = "categoryIdentifier")]
    pub category_identifier: &'static str,
    #[serde(rename = "channelId")]
    pub channel_id: &'static str,
}

#[derive(Error, Debug)]
pub enum PushError {
    #[error("push request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("push provider returned {0}")]
    Status(reqwest::StatusCode),
}

/// Seam between burst scheduling and the provider HTTP call.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, batch: &[PushMessage]) -> Result<(), PushError>;
}

/// Posts batches to the Expo push endpoint as a JSON array.
pub struct ExpoSender {
    client: reqwest::Client,
    url: String,
}

impl ExpoSender {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl PushSender for ExpoSender {
    async fn send(&self, batch: &[PushMessage]) -> Result<(), PushError> {
        let response = self.client.post(&self.url).json(batch).send().await?;

        if !response.status().is_success() {
            return Err(PushError::Status(response.status()));
        }

        Ok(())
    }
}

/// Handle to a scheduled fan-out. Dropping it detaches the bursts; `abort`
/// cancels whichever have not run yet.
pub struct DispatchHandle(Option<JoinHandle<()>>);

impl DispatchHandle {
    fn noop() -> Self {
        Self(None)
    }

    /// True when no recipients survived filtering and nothing was scheduled.
    pub fn is_noop(&self) -> bool {
        self.0.is_none()
    }

    pub fn abort(&self) {
        if let Some(handle) = &self.0 {
            handle.abort();
        }
    }

    /// Waits for all bursts to run. Used by tests; request handlers drop the
    /// handle instead.
    pub async fn wait(self) {
        if let Some(handle) = self.0 {
            let _ = handle.await;
        }
    }
}

pub struct Dispatcher {
    sender: Arc<dyn PushSender>,
    burst_spacing: Duration,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn PushSender>, burst_spacing: Duration) -> Self {
        Self {
            sender,
            burst_spacing,
        }
    }

    /// Fans `title`/`body` out to every valid token in three staggered
    /// bursts. Each burst tags the payload with its sequence number.
    pub fn dispatch(
        &self,
        tokens: Vec<String>,
        title: String,
        body: String,
        data: Value,
    ) -> DispatchHandle {
        let recipients: Vec<String> = tokens
            .into_iter()
            .filter(|token| {
                if token.starts_with(TOKEN_PREFIX) {
                    true
                } else {
                    debug!(token = %token, "Dropping malformed push token");
                    false
                }
            })
            .collect();

        if recipients.is_empty() {
            return DispatchHandle::noop();
        }

        let sender = self.sender.clone();
        let spacing = self.burst_spacing;

        let handle = tokio::spawn(async move {
            for burst in 1..=BURSTS {
                if burst > 1 {
                    tokio::time::sleep(spacing).await;
                }

                let batch = build_batch(&recipients, &title, &body, &data, burst);

                match sender.send(&batch).await {
                    Ok(()) => info!(burst, recipients = batch.len(), "Push burst sent"),
                    Err(e) => error!(burst, error = %e, "Push burst failed"),
                }
            }
        });

        DispatchHandle(Some(handle))
    }
}

fn build_batch(
    recipients: &[String],
    title: &str,
    body: &str,
    data: &Value,
    burst: u64,
) -> Vec<PushMessage> {
    recipients
        .iter()
        .map(|to| {
            let mut data = data.clone();
            if let Value::Object(map) = &mut data {
                map.insert("burst".to_string(), burst.into());
            }

            PushMessage {
                to: to.clone(),
                title: title.to_string(),
                body: body.to_string(),
                data,
                sound: "default",
                priority: "high",
                category_identifier: "MEAL_INVITATION",
                channel_id: "meal-pings",
            }
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::{testing::RecordingSender, *};

    fn dispatcher(sender: Arc<RecordingSender>) -> Dispatcher {
        Dispatcher::new(sender, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn no_valid_tokens_is_a_noop() {
        let sender = Arc::new(RecordingSender::default());
        let handle = dispatcher(sender.clone()).dispatch(
            vec!["web-abc123".to_string(), String::new()],
            "Lunch Time!".to_string(),
            "Alice is calling for Lunch!".to_string(),
            serde_json::json!({}),
        );

        assert!(handle.is_noop());
        handle.wait().await;
        assert!(sender.recorded().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sends_three_staggered_bursts_to_all_recipients() {
        let sender = Arc::new(RecordingSender::default());
        let started = Instant::now();

        let handle = dispatcher(sender.clone()).dispatch(
            vec![
                "ExponentPushToken[aaa]".to_string(),
                "web-bogus".to_string(),
                "ExponentPushToken[bbb]".to_string(),
            ],
            "Lunch Time!".to_string(),
            "Alice is calling for Lunch!".to_string(),
            serde_json::json!({"meal_type": "Lunch", "creator_name": "Alice"}),
        );
        handle.wait().await;

        // Two sleeps of the burst spacing ran in between.
        assert_eq!(started.elapsed(), Duration::from_secs(4));

        let batches = sender.recorded();
        assert_eq!(batches.len(), 3);
        for (i, batch) in batches.iter().enumerate() {
            assert_eq!(batch.len(), 2);
            for message in batch {
                assert!(message.to.starts_with("ExponentPushToken"));
                assert_eq!(message.data["burst"], (i as u64 + 1));
                assert_eq!(message.data["meal_type"], "Lunch");
                assert_eq!(message.category_identifier, "MEAL_INVITATION");
                assert_eq!(message.channel_id, "meal-pings");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_burst_does_not_cancel_the_rest() {
        let sender = Arc::new(RecordingSender::failing_first());

        let handle = dispatcher(sender.clone()).dispatch(
            vec!["ExponentPushToken[aaa]".to_string()],
            "Dinner Time!".to_string(),
            "Bob is calling for Dinner!".to_string(),
            serde_json::json!({}),
        );
        handle.wait().await;

        assert_eq!(sender.recorded().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_cancels_pending_bursts() {
        let sender = Arc::new(RecordingSender::default());

        let handle = dispatcher(sender.clone()).dispatch(
            vec!["ExponentPushToken[aaa]".to_string()],
            "Lunch Time!".to_string(),
            "Alice is calling for Lunch!".to_string(),
            serde_json::json!({}),
        );

        // Let the first burst land, then cancel before the second is due.
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.abort();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(sender.recorded().len(), 1);
    }
}
