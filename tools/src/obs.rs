//! OBS broadcast-control client.
//!
//! Translates natural-language phrases into calls against a local OBS
//! control bridge. The bridge must already be running; an unreachable
//! backend surfaces as a readable failure, never a fabricated success.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, ToolError};

/// A control request understood by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum ObsRequest {
    SetScene { scene: String },
    StartStream,
    StopStream,
    StartRecording,
    StopRecording,
    SetMute { muted: bool },
}

/// Client for the local OBS control bridge.
pub struct ObsClient {
    base_url: String,
    client: reqwest::Client,
}

impl ObsClient {
    /// Create a client against the given bridge base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Map a lower-cased phrase to a control request.
    pub fn map_phrase(phrase: &str) -> Result<ObsRequest> {
        if let Some(idx) = phrase.find("scene") {
            // "switch scene to gaming" / "scene gaming"
            let tail = phrase[idx + "scene".len()..].trim();
            let scene = tail.strip_prefix("to ").unwrap_or(tail).trim();
            if scene.is_empty() {
                return Err(ToolError::InvalidInput(
                    "no scene name given (try: switch scene to <name>)".to_string(),
                ));
            }
            return Ok(ObsRequest::SetScene {
                scene: scene.to_string(),
            });
        }

        let stopping = phrase.contains("stop") || phrase.contains("end");
        if phrase.contains("stream") {
            return Ok(if stopping {
                ObsRequest::StopStream
            } else {
                ObsRequest::StartStream
            });
        }
        if phrase.contains("record") {
            return Ok(if stopping {
                ObsRequest::StopRecording
            } else {
                ObsRequest::StartRecording
            });
        }
        if phrase.contains("unmute") {
            return Ok(ObsRequest::SetMute { muted: false });
        }
        if phrase.contains("mute") {
            return Ok(ObsRequest::SetMute { muted: true });
        }

        Err(ToolError::InvalidInput(format!(
            "could not map phrase to an OBS action: {phrase}"
        )))
    }

    /// Translate a phrase and send it to the bridge.
    pub async fn handle(&self, phrase: &str) -> Result<String> {
        let request = Self::map_phrase(phrase)?;
        debug!("Sending OBS request: {request:?}");

        let response = self
            .client
            .post(format!("{}/request", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ToolError::BackendUnreachable(format!(
                        "OBS control backend is not reachable at {} — is it running?",
                        self.base_url
                    ))
                } else {
                    ToolError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::ExecutionFailed(format!(
                "OBS bridge rejected the request: {}",
                body.trim()
            )));
        }

        Ok(match request {
            ObsRequest::SetScene { scene } => format!("Switched OBS scene to {scene}"),
            ObsRequest::StartStream => "Started the stream".to_string(),
            ObsRequest::StopStream => "Stopped the stream".to_string(),
            ObsRequest::StartRecording => "Started recording".to_string(),
            ObsRequest::StopRecording => "Stopped recording".to_string(),
            ObsRequest::SetMute { muted: true } => "Muted the mic".to_string(),
            ObsRequest::SetMute { muted: false } => "Unmuted the mic".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn maps_scene_switch() {
        let request = ObsClient::map_phrase("switch scene to gaming").unwrap();
        assert_eq!(
            request,
            ObsRequest::SetScene {
                scene: "gaming".to_string()
            }
        );
    }

    #[test]
    fn maps_stream_and_record() {
        assert_eq!(
            ObsClient::map_phrase("start streaming").unwrap(),
            ObsRequest::StartStream
        );
        assert_eq!(
            ObsClient::map_phrase("stop recording").unwrap(),
            ObsRequest::StopRecording
        );
    }

    #[test]
    fn unmute_wins_over_mute_substring() {
        assert_eq!(
            ObsClient::map_phrase("unmute the mic").unwrap(),
            ObsRequest::SetMute { muted: false }
        );
    }

    #[test]
    fn unmappable_phrase_is_invalid_input() {
        let err = ObsClient::map_phrase("obs do something").unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_reported() {
        // Port 9 (discard) is never an OBS bridge.
        let client = ObsClient::new("http://127.0.0.1:9");
        let err = client.handle("start streaming").await.unwrap_err();
        assert!(matches!(err, ToolError::BackendUnreachable(_)));
    }
}
