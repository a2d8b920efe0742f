//! Terminal run notification.
//!
//! Fire-and-forget by contract: the coordinator logs a warning when delivery
//! fails and the run outcome is never affected.

use async_trait::async_trait;
use serde_json::json;
use storyreel_core::{RunId, RunStatus};
use storyreel_error::NotifyError;
use tracing::instrument;

/// What a terminal run reports outward.
#[derive(Debug, Clone)]
pub struct RunNotice {
    /// The run that finished
    pub run_id: RunId,
    /// Terminal status
    pub status: RunStatus,
    /// Episode title
    pub title: String,
    /// Episode number
    pub episode_number: u32,
    /// Where the output landed, when one was produced
    pub output_location: Option<String>,
}

/// Run notification collaborator.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a terminal run notice.
    async fn notify(&self, notice: &RunNotice) -> Result<(), NotifyError>;
}

/// Notifier that delivers nothing. Used when no webhook is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _notice: &RunNotice) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Webhook notifier posting a Slack Block Kit message.
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackNotifier {
    /// Create a notifier for a webhook URL.
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }

    fn payload(notice: &RunNotice) -> serde_json::Value {
        let (emoji, verb) = match notice.status {
            RunStatus::Succeeded => (":clapper:", "finished"),
            _ => (":rotating_light:", "failed"),
        };
        let mut lines = vec![format!(
            "{emoji} *{}* episode {} {verb}",
            notice.title, notice.episode_number
        )];
        lines.push(format!("Run `{}`: {}", notice.run_id, notice.status));
        if let Some(location) = &notice.output_location {
            lines.push(format!("Output: `{location}`"));
        }
        json!({
            "blocks": [{
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": lines.join("\n"),
                }
            }]
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    #[instrument(skip(self, notice), fields(run_id = %notice.run_id))]
    async fn notify(&self, notice: &RunNotice) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&Self::payload(notice))
            .send()
            .await
            .map_err(|e| NotifyError::new(format!("Webhook delivery failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(NotifyError::new(format!(
                "Webhook responded with {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(status: RunStatus) -> RunNotice {
        RunNotice {
            run_id: RunId::generate(),
            status,
            title: "Hedge Fund Analyst".into(),
            episode_number: 7,
            output_location: Some("/runs/x/episode_07.mp4".into()),
        }
    }

    #[test]
    fn success_payload_mentions_title_and_output() {
        let payload = SlackNotifier::payload(&notice(RunStatus::Succeeded));
        let text = payload["blocks"][0]["text"]["text"].as_str().unwrap();
        assert!(text.contains("Hedge Fund Analyst"));
        assert!(text.contains("episode 7 finished"));
        assert!(text.contains("episode_07.mp4"));
    }

    #[test]
    fn failure_payload_carries_the_reason() {
        let payload = SlackNotifier::payload(&notice(RunStatus::Failed {
            reason: "2/5 scenes failed".into(),
        }));
        let text = payload["blocks"][0]["text"]["text"].as_str().unwrap();
        assert!(text.contains("failed (2/5 scenes failed)"));
    }
}
