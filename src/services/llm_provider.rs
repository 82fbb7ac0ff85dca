use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::config::LLMConfig;

const MAX_RETRIES: usize = 3;
const BASE_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub model: Option<String>,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<ChatUsage>,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
}

/// 批改裁决。字段缺失或类型不符时按保守值处理，见 [`parse_verdict`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LLMVerdict {
    pub is_correct: bool,
    pub feedback_text: String,
    pub grammar_ok: bool,
    pub vocabulary_ok: bool,
    pub structure_ok: bool,
}

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("LLM not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
}

#[derive(Clone)]
pub struct LLMProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LLMProvider {
    pub fn new(config: LLMConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    pub fn is_available(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|v| !v.trim().is_empty())
            && !self.config.model.trim().is_empty()
            && !self.config.api_endpoint.trim().is_empty()
    }

    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LLMError> {
        let api_key = self.config.api_key.as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(LLMError::NotConfigured("LLM_API_KEY"))?;

        let url = format!("{}/chat/completions", self.config.api_endpoint.trim_end_matches('/'));
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false
        });

        self.post_with_retry(&url, api_key, &payload).await
    }

    /// 请求远端模型批改一次学生回答，返回结构化裁决。
    ///
    /// 任何网络、状态码或解析失败都以 `LLMError` 返回，由调用方降级处理。
    pub async fn evaluate_answer(
        &self,
        teacher_question: &str,
        expected_answer: &str,
        target_structures: &[String],
        user_answer: &str,
        lesson_title: &str,
    ) -> Result<LLMVerdict, LLMError> {
        let messages = [
            ChatMessage {
                role: "system".into(),
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".into(),
                content: build_user_prompt(
                    teacher_question,
                    expected_answer,
                    target_structures,
                    user_answer,
                    lesson_title,
                ),
            },
        ];

        let response = self.chat(&messages).await?;
        let content = response.first_content().ok_or(LLMError::EmptyChoices)?;
        parse_verdict(content)
    }

    async fn post_with_retry(
        &self,
        url: &str,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> Result<ChatResponse, LLMError> {
        let mut last_error: Option<LLMError> = None;

        for retry in 0..=MAX_RETRIES {
            match self.client.post(url).bearer_auth(api_key).json(payload).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await?;
                        match serde_json::from_slice(&bytes) {
                            Ok(v) => return Ok(v),
                            Err(e) => {
                                let body_str = String::from_utf8_lossy(&bytes);
                                tracing::error!("Failed to parse LLM response JSON: {}. Body: {}", e, body_str);
                                return Err(LLMError::Json(e));
                            }
                        }
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = LLMError::HttpStatus { status, body };
                    if retry < MAX_RETRIES && is_retryable(status) {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, ?status, "LLM request failed, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let err = LLMError::Request(e);
                    if retry < MAX_RETRIES {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, "LLM request error, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        Err(last_error.unwrap_or(LLMError::NotConfigured("unknown")))
    }
}

const SYSTEM_PROMPT: &str = "\
你是一位温柔耐心的少儿英语老师，正在批改孩子在对话练习中的口语回答。\
允许同义表达以及大小写、标点上的小差异；重点看意思和目标句型是否用对。\
用简短、鼓励性的中文写反馈，最多两句话。\
只输出一个 JSON 对象，不要输出任何其他文字，字段为：\
{\"is_correct\": 布尔, \"feedback_text\": 字符串, \"grammar_ok\": 布尔, \"vocabulary_ok\": 布尔, \"structure_ok\": 布尔}";

fn build_user_prompt(
    teacher_question: &str,
    expected_answer: &str,
    target_structures: &[String],
    user_answer: &str,
    lesson_title: &str,
) -> String {
    format!(
        "课程：{lesson_title}\n老师的问题：{teacher_question}\n参考答案：{expected_answer}\n目标句型：{structures}\n孩子的回答：{user_answer}",
        structures = target_structures.join(", "),
    )
}

/// 尽量宽容地解析模型输出：剥掉可能的 Markdown 代码块围栏，
/// 缺失或类型不符的布尔按 false、字符串按空串处理。
pub fn parse_verdict(raw: &str) -> Result<LLMVerdict, LLMError> {
    let cleaned = strip_code_fences(raw);
    let value: serde_json::Value = serde_json::from_str(cleaned.trim())?;

    Ok(LLMVerdict {
        is_correct: value.get("is_correct").and_then(|v| v.as_bool()).unwrap_or(false),
        feedback_text: value
            .get("feedback_text")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        grammar_ok: value.get("grammar_ok").and_then(|v| v.as_bool()).unwrap_or(false),
        vocabulary_ok: value.get("vocabulary_ok").and_then(|v| v.as_bool()).unwrap_or(false),
        structure_ok: value.get("structure_ok").and_then(|v| v.as_bool()).unwrap_or(false),
    })
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}
