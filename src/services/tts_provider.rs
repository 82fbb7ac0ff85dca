use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, warn};

use crate::config::TTSConfig;

#[derive(Clone)]
pub struct TTSProvider {
    config: TTSConfig,
    client: reqwest::Client,
}

impl TTSProvider {
    pub fn new(config: TTSConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    pub fn is_available(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|v| !v.trim().is_empty())
            && !self.config.voice.trim().is_empty()
            && !self.config.api_endpoint.trim().is_empty()
    }

    /// 合成一段语音，返回 `data:audio/mpeg;base64,...` 形式的数据 URL。
    ///
    /// 尽力而为：未配置、网络失败、非 2xx 都只返回 `None`，不视为错误。
    pub async fn synthesize(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let api_key = self.config.api_key.as_deref().filter(|v| !v.trim().is_empty())?;
        if !self.is_available() {
            return None;
        }

        let url = format!("{}/audio/speech", self.config.api_endpoint.trim_end_matches('/'));
        let payload = serde_json::json!({
            "model": self.config.model,
            "voice": self.config.voice,
            "input": text,
            "response_format": "mp3"
        });

        let response = match self.client.post(&url).bearer_auth(api_key).json(&payload).send().await {
            Ok(resp) => resp,
            Err(err) => {
                warn!(error = %err, "TTS request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(?status, "TTS request rejected");
            return None;
        }

        match response.bytes().await {
            Ok(bytes) if !bytes.is_empty() => {
                debug!(len = bytes.len(), "TTS audio synthesized");
                Some(format!("data:audio/mpeg;base64,{}", BASE64.encode(&bytes)))
            }
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "failed to read TTS response body");
                None
            }
        }
    }
}
