use std::sync::Arc;

use tracing::warn;

use crate::lesson::types::{CorrectionDetails, EvaluationResult};
use crate::services::feedback::FeedbackSynthesizer;
use crate::services::llm_provider::LLMProvider;

/// 一次批改所需的全部上下文。
///
/// 前置条件：`accepted_answers` 非空，`user_answer` 去掉空白后非空；
/// 两者都由调用方（会话状态机或路由校验）保证。
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub user_answer: String,
    pub expected_answer: String,
    pub accepted_answers: Vec<String>,
    pub target_structures: Vec<String>,
    pub teacher_question: String,
    pub lesson_title: String,
}

/// 归一化：小写、去首尾空白、内部空白折叠为单个空格、去掉末尾的 `.`/`!`/`?`。
/// 幂等：`normalize(normalize(s)) == normalize(s)`。
pub fn normalize(input: &str) -> String {
    let collapsed = input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    // 末尾可能交替出现标点和空格（如 "a. !"），剥到不动点为止
    let mut result = collapsed.as_str();
    loop {
        let stripped = result.trim_end_matches(['.', '!', '?']).trim_end();
        if stripped.len() == result.len() {
            break;
        }
        result = stripped;
    }
    result.to_string()
}

pub fn check_exact_match(user_answer: &str, accepted_answers: &[String]) -> bool {
    let normalized = normalize(user_answer);
    accepted_answers
        .iter()
        .any(|accepted| normalize(accepted) == normalized)
}

/// 按固定顺序组合三个策略：精确匹配 → 远端模型 → 本地启发式。
/// 前两个返回 `Option`，最后一个兜底，因此 `evaluate` 永不失败。
#[derive(Clone)]
pub struct AnswerEvaluator {
    llm: Arc<LLMProvider>,
    feedback: Arc<FeedbackSynthesizer>,
}

impl AnswerEvaluator {
    pub fn new(llm: Arc<LLMProvider>, feedback: Arc<FeedbackSynthesizer>) -> Self {
        Self { llm, feedback }
    }

    pub async fn evaluate(&self, request: &EvaluationRequest) -> EvaluationResult {
        if let Some(result) = self.try_exact_match(request).await {
            return result;
        }
        if let Some(result) = self.try_llm(request).await {
            return result;
        }
        self.fallback_heuristic(request).await
    }

    async fn try_exact_match(&self, request: &EvaluationRequest) -> Option<EvaluationResult> {
        if !check_exact_match(&request.user_answer, &request.accepted_answers) {
            return None;
        }

        let feedback_text = self.feedback.praise();
        let feedback_audio = self.feedback.audio_for(&feedback_text).await;
        Some(EvaluationResult {
            is_correct: true,
            feedback_text,
            feedback_audio,
            correct_answer: request.expected_answer.clone(),
            details: CorrectionDetails::all_ok(),
        })
    }

    async fn try_llm(&self, request: &EvaluationRequest) -> Option<EvaluationResult> {
        if !self.llm.is_available() {
            return None;
        }

        let verdict = match self
            .llm
            .evaluate_answer(
                &request.teacher_question,
                &request.expected_answer,
                &request.target_structures,
                &request.user_answer,
                &request.lesson_title,
            )
            .await
        {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(error = %err, "LLM evaluation failed, falling back to heuristic");
                return None;
            }
        };

        let feedback_audio = self.feedback.audio_for(&verdict.feedback_text).await;
        Some(EvaluationResult {
            is_correct: verdict.is_correct,
            feedback_text: verdict.feedback_text,
            feedback_audio,
            correct_answer: request.expected_answer.clone(),
            details: CorrectionDetails {
                grammar_ok: verdict.grammar_ok,
                vocabulary_ok: verdict.vocabulary_ok,
                structure_ok: verdict.structure_ok,
            },
        })
    }

    /// 无模型可用时的兜底：包含关系算“接近”，否则提示重试；一律判错。
    async fn fallback_heuristic(&self, request: &EvaluationRequest) -> EvaluationResult {
        let user = normalize(&request.user_answer);
        let expected = normalize(&request.expected_answer);
        let close = !user.is_empty()
            && !expected.is_empty()
            && (user.contains(&expected) || expected.contains(&user));

        let feedback_text = if close {
            self.feedback.close_miss(&request.expected_answer)
        } else {
            self.feedback.try_again(&request.expected_answer)
        };
        let feedback_audio = self.feedback.audio_for(&feedback_text).await;

        EvaluationResult {
            is_correct: false,
            feedback_text,
            feedback_audio,
            correct_answer: request.expected_answer.clone(),
            details: CorrectionDetails::none_ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LLMConfig, TTSConfig};
    use crate::services::tts_provider::TTSProvider;

    fn evaluator_without_remote() -> AnswerEvaluator {
        let llm = Arc::new(LLMProvider::new(LLMConfig::default()));
        let tts = Arc::new(TTSProvider::new(TTSConfig::default()));
        AnswerEvaluator::new(llm, Arc::new(FeedbackSynthesizer::new(tts)))
    }

    fn request(user_answer: &str, expected: &str, accepted: &[&str]) -> EvaluationRequest {
        EvaluationRequest {
            user_answer: user_answer.to_string(),
            expected_answer: expected.to_string(),
            accepted_answers: accepted.iter().map(|s| s.to_string()).collect(),
            target_structures: vec!["It is ...".to_string()],
            teacher_question: "What colour is it?".to_string(),
            lesson_title: "Colours".to_string(),
        }
    }

    #[test]
    fn normalize_lowercases_trims_and_collapses() {
        assert_eq!(normalize("  It  Is   Red.  "), "it is red");
        assert_eq!(normalize("HELLO!"), "hello");
        assert_eq!(normalize("fine ?"), "fine");
    }

    #[test]
    fn normalize_is_idempotent_on_tricky_inputs() {
        for input in ["Red!!", "  a  b  ", "", "...", "I'm fine.", "a. !"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn exact_match_ignores_case_whitespace_and_trailing_punctuation() {
        let accepted = vec!["it is red".to_string()];
        assert!(check_exact_match("It Is Red.", &accepted));
        assert!(check_exact_match("  it   is red!", &accepted));
        assert!(!check_exact_match("it is blue", &accepted));
    }

    #[tokio::test]
    async fn exact_match_path_needs_no_remote_evaluator() {
        let evaluator = evaluator_without_remote();
        let result = evaluator
            .evaluate(&request("I am fine", "I'm fine", &["I'm fine", "i am fine"]))
            .await;

        assert!(result.is_correct);
        assert!(result.details.grammar_ok && result.details.vocabulary_ok && result.details.structure_ok);
        assert_eq!(result.correct_answer, "I'm fine");
        assert!(crate::services::feedback::PRAISE_POOL.contains(&result.feedback_text.as_str()));
    }

    #[tokio::test]
    async fn heuristic_marks_substring_answers_as_close() {
        let evaluator = evaluator_without_remote();
        let result = evaluator.evaluate(&request("red colour", "red", &["red"])).await;

        assert!(!result.is_correct);
        assert!(result.feedback_text.contains("很接近"));
        assert!(result.feedback_text.contains("red"));
        assert!(!result.details.grammar_ok);
    }

    #[tokio::test]
    async fn heuristic_asks_for_retry_on_unrelated_answers() {
        let evaluator = evaluator_without_remote();
        let result = evaluator.evaluate(&request("banana", "red", &["red"])).await;

        assert!(!result.is_correct);
        assert!(result.feedback_text.contains("再试一次"));
        assert!(result.feedback_text.contains("red"));
    }

    #[tokio::test]
    async fn evaluate_always_returns_a_result_without_any_remote_service() {
        let evaluator = evaluator_without_remote();
        // 没有 LLM、没有 TTS：仍要得到完整的结果对象。
        let result = evaluator.evaluate(&request("blue", "red", &["red"])).await;

        assert!(!result.is_correct);
        assert!(result.feedback_audio.is_none());
        assert_eq!(result.correct_answer, "red");
    }
}
