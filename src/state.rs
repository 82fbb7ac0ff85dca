use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::lesson::manager::LessonSessionManager;
use crate::services::evaluator::AnswerEvaluator;
use crate::services::feedback::FeedbackSynthesizer;
use crate::services::llm_provider::LLMProvider;
use crate::services::tts_provider::TTSProvider;
use crate::store::memory::{MemoryDialogueStore, MemoryProgressStore};
use crate::store::{DialogueStore, ProgressStore};

/// 所有协作方在这里一次性构建并显式注入，测试可整体替换存储实现。
#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    config: Arc<Config>,
    dialogue_store: Arc<dyn DialogueStore>,
    progress_store: Arc<dyn ProgressStore>,
    llm: Arc<LLMProvider>,
    evaluator: AnswerEvaluator,
    sessions: Arc<LessonSessionManager>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let dialogue_store = Arc::new(MemoryDialogueStore::new());
        crate::seed::seed_dialogue_store(&dialogue_store);
        let progress_store = Arc::new(MemoryProgressStore::new());
        Self::with_stores(config, dialogue_store, progress_store)
    }

    pub fn with_stores(
        config: Config,
        dialogue_store: Arc<dyn DialogueStore>,
        progress_store: Arc<dyn ProgressStore>,
    ) -> Self {
        let llm = Arc::new(LLMProvider::new(config.llm.clone()));
        let tts = Arc::new(TTSProvider::new(config.tts.clone()));
        let feedback = Arc::new(FeedbackSynthesizer::new(tts));
        let evaluator = AnswerEvaluator::new(Arc::clone(&llm), feedback);
        let sessions = Arc::new(LessonSessionManager::new(
            Arc::clone(&dialogue_store),
            Arc::clone(&progress_store),
            evaluator.clone(),
        ));

        Self {
            started_at: Instant::now(),
            config: Arc::new(config),
            dialogue_store,
            progress_store,
            llm,
            evaluator,
            sessions,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dialogue_store(&self) -> Arc<dyn DialogueStore> {
        Arc::clone(&self.dialogue_store)
    }

    pub fn progress_store(&self) -> Arc<dyn ProgressStore> {
        Arc::clone(&self.progress_store)
    }

    pub fn llm(&self) -> Arc<LLMProvider> {
        Arc::clone(&self.llm)
    }

    pub fn evaluator(&self) -> &AnswerEvaluator {
        &self.evaluator
    }

    pub fn sessions(&self) -> Arc<LessonSessionManager> {
        Arc::clone(&self.sessions)
    }
}
