use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TTS_MODEL: &str = "gpt-4o-mini-tts";
const DEFAULT_TTS_VOICE: &str = "nova";
const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_TTS_TIMEOUT_MS: u64 = 30_000;

/// 进程启动时一次性读取的全部配置，此后只向下传递，
/// 各组件不再自行读环境变量。
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// 桌面/本地模式：跳过令牌校验，注入本地学习者身份。
    pub desktop_mode: bool,
    pub api_token: Option<String>,
    pub llm: LLMConfig,
    pub tts: TTSConfig,
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_LLM_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TTSConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

impl Default for TTSConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_TTS_MODEL.to_string(),
            voice: DEFAULT_TTS_VOICE.to_string(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TTS_TIMEOUT_MS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let desktop_mode = env_bool("DESKTOP_MODE").unwrap_or(false);
        let api_token = env_string("API_AUTH_TOKEN");

        let llm = LLMConfig {
            api_key: env_string("LLM_API_KEY"),
            model: env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            api_endpoint: normalize_endpoint(
                env_string("LLM_API_ENDPOINT")
                    .or_else(|| env_string("LLM_BASE_URL"))
                    .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
            ),
            timeout: Duration::from_millis(env_u64("LLM_TIMEOUT").unwrap_or(DEFAULT_LLM_TIMEOUT_MS)),
        };

        let tts = TTSConfig {
            // TTS 缺省复用 LLM 的密钥与端点（同一供应商），可单独覆盖。
            api_key: env_string("TTS_API_KEY").or_else(|| env_string("LLM_API_KEY")),
            model: env_string("TTS_MODEL").unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string()),
            voice: env_string("TTS_VOICE").unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string()),
            api_endpoint: normalize_endpoint(
                env_string("TTS_API_ENDPOINT").unwrap_or_else(|| llm.api_endpoint.clone()),
            ),
            timeout: Duration::from_millis(env_u64("TTS_TIMEOUT").unwrap_or(DEFAULT_TTS_TIMEOUT_MS)),
        };

        Self {
            host,
            port,
            log_level,
            desktop_mode,
            api_token,
            llm,
            tts,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn env_bool(key: &str) -> Option<bool> {
    let value = env_string(key)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn normalize_endpoint(endpoint: String) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}
