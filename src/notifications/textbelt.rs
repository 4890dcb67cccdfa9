//! Textbelt SMS transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::trait_def::{NotificationError, NotificationTransport};

pub const TEXTBELT_ENDPOINT: &str = "https://textbelt.com/text";

pub struct TextbeltTransport {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct TextbeltReply {
    success: bool,
    error: Option<String>,
}

impl TextbeltTransport {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl NotificationTransport for TextbeltTransport {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotificationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(NotificationError::NotConfigured)?;

        let form = [("phone", phone), ("message", message), ("key", api_key)];
        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let reply: TextbeltReply = response
            .json()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        if reply.success {
            Ok(())
        } else {
            Err(NotificationError::Rejected(
                reply.error.unwrap_or_else(|| "no reason given".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let transport = TextbeltTransport::new(TEXTBELT_ENDPOINT, Some(String::new()), 5).unwrap();
        let result = transport.send("+15555550100", "hello").await;
        assert!(matches!(result, Err(NotificationError::NotConfigured)));
    }

    #[test]
    fn test_reply_decoding() {
        let ok: TextbeltReply =
            serde_json::from_str(r#"{"success": true, "textId": "1", "quotaRemaining": 40}"#).unwrap();
        assert!(ok.success);

        let failed: TextbeltReply =
            serde_json::from_str(r#"{"success": false, "error": "Out of quota"}"#).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("Out of quota"));
    }
}
