use std::sync::Arc;

use rand::Rng;

use crate::services::tts_provider::TTSProvider;

/// 答对时随机抽取的夸奖语，固定池。
pub const PRAISE_POOL: &[&str] = &[
    "太棒了！",
    "说得真好！",
    "完全正确！",
    "答对啦，真厉害！",
    "非常好，继续加油！",
];

#[derive(Clone)]
pub struct FeedbackSynthesizer {
    tts: Arc<TTSProvider>,
}

impl FeedbackSynthesizer {
    pub fn new(tts: Arc<TTSProvider>) -> Self {
        Self { tts }
    }

    pub fn praise(&self) -> String {
        let mut rng = rand::rng();
        let index = rng.random_range(0..PRAISE_POOL.len());
        PRAISE_POOL[index].to_string()
    }

    pub fn close_miss(&self, correct_answer: &str) -> String {
        format!("很接近了！正确答案是「{correct_answer}」。")
    }

    pub fn try_again(&self, correct_answer: &str) -> String {
        format!("再试一次吧，正确答案是「{correct_answer}」。")
    }

    /// 为反馈文本合成语音，失败时静默返回 `None`。
    pub async fn audio_for(&self, text: &str) -> Option<String> {
        self.tts.synthesize(text).await
    }
}
