use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, warn};
use uuid::Uuid;

use crate::lesson::session::{Phase, Score, SessionEvent, SessionState, SessionSummary, TeacherPhase};
use crate::lesson::types::{ConversationEntry, EvaluationResult, Turn};
use crate::services::evaluator::{AnswerEvaluator, EvaluationRequest};
use crate::store::{DialogueStore, NewProgressRecord, ProgressStore};

#[derive(Debug, Error)]
pub enum SessionManagerError {
    #[error("会话不存在")]
    NotFound,
}

/// 客户端可投递的事件（加载完成/失败由服务端内部产生）。
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    AudioEnded,
    AnswerChanged { text: String },
    Submit,
    Next,
    Restart,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub phase: Phase,
    pub teacher_phase: TeacherPhase,
    pub dialogue_index: usize,
    pub turn_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_turn: Option<Turn>,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationResult>,
    pub score: Score,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub history: Vec<ConversationEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
    pub progress_save_warning: bool,
}

struct SessionEntry {
    owner_id: String,
    state: SessionState,
    summary: Option<SessionSummary>,
    progress_saved: bool,
    progress_save_warning: bool,
}

/// 活动会话注册表。每个会话由一把锁保护，事件逐个处理完再放行，
/// 不存在对同一会话状态的并发写。
pub struct LessonSessionManager {
    dialogue_store: Arc<dyn DialogueStore>,
    progress_store: Arc<dyn ProgressStore>,
    evaluator: AnswerEvaluator,
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionEntry>>>>,
}

impl LessonSessionManager {
    pub fn new(
        dialogue_store: Arc<dyn DialogueStore>,
        progress_store: Arc<dyn ProgressStore>,
        evaluator: AnswerEvaluator,
    ) -> Self {
        Self {
            dialogue_store,
            progress_store,
            evaluator,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// 创建会话并一次性加载对话数据。加载失败或数据为空都进入
    /// 终态 `error`，不做重试。
    pub async fn start(
        &self,
        owner_id: &str,
        level: &str,
        stage: &str,
        lesson_id: &str,
    ) -> SessionView {
        let session_id = Uuid::new_v4().to_string();
        let state = SessionState::new(Utc::now());

        let state = match self.dialogue_store.dialogues_for_lesson(level, stage, lesson_id) {
            Ok(dialogues) => state.apply(SessionEvent::DialoguesLoaded(dialogues)),
            Err(err) => {
                error!(error = %err, level, stage, lesson_id, "failed to load lesson dialogues");
                state.apply(SessionEvent::LoadFailed("获取对话数据失败".to_string()))
            }
        };

        let entry = SessionEntry {
            owner_id: owner_id.to_string(),
            state,
            summary: None,
            progress_saved: false,
            progress_save_warning: false,
        };
        let view = view_of(&session_id, &entry);

        self.sessions
            .write()
            .await
            .insert(session_id, Arc::new(Mutex::new(entry)));
        view
    }

    pub async fn view(
        &self,
        session_id: &str,
        owner_id: &str,
    ) -> Result<SessionView, SessionManagerError> {
        let entry = self.entry(session_id).await?;
        let guard = entry.lock().await;
        if guard.owner_id != owner_id {
            return Err(SessionManagerError::NotFound);
        }
        Ok(view_of(session_id, &guard))
    }

    /// 处理一个客户端事件并返回处理后的视图。
    /// 提交会在这里同步跑完评估（评估器本身永不失败，任务挂掉则
    /// 映射为可恢复的 `EvaluationFailed`）。
    pub async fn handle_event(
        &self,
        session_id: &str,
        owner_id: &str,
        event: ClientEvent,
    ) -> Result<SessionView, SessionManagerError> {
        let entry = self.entry(session_id).await?;
        let mut guard = entry.lock().await;
        if guard.owner_id != owner_id {
            return Err(SessionManagerError::NotFound);
        }

        let state = std::mem::replace(&mut guard.state, SessionState::new(Utc::now()));
        let state = match event {
            ClientEvent::AudioEnded => state.apply(SessionEvent::AudioEnded),
            ClientEvent::AnswerChanged { text } => state.apply(SessionEvent::AnswerChanged(text)),
            ClientEvent::Submit => {
                let state = state.apply(SessionEvent::Submit);
                if state.phase == Phase::Evaluating {
                    self.run_evaluation(state).await
                } else {
                    state
                }
            }
            ClientEvent::Next => state.apply(SessionEvent::Next),
            ClientEvent::Restart => {
                guard.summary = None;
                guard.progress_saved = false;
                guard.progress_save_warning = false;
                state.apply(SessionEvent::Restart { started_at: Utc::now() })
            }
        };
        guard.state = state;

        if guard.state.phase == Phase::Summary && !guard.progress_saved {
            self.finalize(&mut guard);
        }

        Ok(view_of(session_id, &guard))
    }

    pub async fn close(&self, session_id: &str, owner_id: &str) -> Result<(), SessionManagerError> {
        let entry = self.entry(session_id).await?;
        {
            let guard = entry.lock().await;
            if guard.owner_id != owner_id {
                return Err(SessionManagerError::NotFound);
            }
        }
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn entry(&self, session_id: &str) -> Result<Arc<Mutex<SessionEntry>>, SessionManagerError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or(SessionManagerError::NotFound)
    }

    async fn run_evaluation(&self, state: SessionState) -> SessionState {
        let Some(request) = build_request(&state) else {
            return state.apply(SessionEvent::EvaluationFailed("当前回合无法评估".to_string()));
        };

        let evaluator = self.evaluator.clone();
        let handle = tokio::spawn(async move { evaluator.evaluate(&request).await });

        match handle.await {
            Ok(result) => state.apply(SessionEvent::EvaluationSucceeded(result)),
            Err(err) => {
                error!(error = %err, "evaluation task died");
                state.apply(SessionEvent::EvaluationFailed(
                    "评估服务暂时不可用，请重新提交".to_string(),
                ))
            }
        }
    }

    /// 总结落库：覆盖到的每个对话各存一条进度记录，单条失败只记
    /// 警告，不影响总结展示。
    fn finalize(&self, entry: &mut SessionEntry) {
        let summary = entry.state.summary(Utc::now());
        let mut any_failed = false;

        for (index, dialogue) in entry.state.dialogues.iter().enumerate() {
            if index > entry.state.dialogue_index {
                break;
            }
            let tally = entry
                .state
                .dialogue_scores
                .get(index)
                .copied()
                .unwrap_or_default();
            let record = NewProgressRecord {
                owner_id: entry.owner_id.clone(),
                dialogue_id: dialogue.id.clone(),
                total_turns: tally.total,
                correct_turns: tally.correct,
                duration_seconds: summary.duration_seconds,
            };
            if let Err(err) = self.progress_store.insert(record) {
                warn!(error = %err, dialogue_id = %dialogue.id, "failed to save progress record");
                any_failed = true;
            }
        }

        entry.summary = Some(summary);
        entry.progress_saved = true;
        entry.progress_save_warning = any_failed;
    }
}

fn build_request(state: &SessionState) -> Option<EvaluationRequest> {
    let dialogue = state.current_dialogue()?;
    let Turn::Student(student) = state.current_turn()? else {
        return None;
    };

    Some(EvaluationRequest {
        user_answer: state.answer.trim().to_string(),
        expected_answer: student.expected_answer.clone(),
        accepted_answers: student.accepted_answers.clone(),
        target_structures: dialogue.target_structures.clone(),
        teacher_question: state
            .current_teacher_question()
            .unwrap_or_default()
            .to_string(),
        lesson_title: dialogue.title.clone(),
    })
}

fn view_of(session_id: &str, entry: &SessionEntry) -> SessionView {
    SessionView {
        session_id: session_id.to_string(),
        phase: entry.state.phase,
        teacher_phase: entry.state.teacher_phase,
        dialogue_index: entry.state.dialogue_index,
        turn_index: entry.state.turn_index,
        current_turn: entry.state.current_turn().cloned(),
        answer: entry.state.answer.clone(),
        evaluation: entry.state.evaluation.clone(),
        score: entry.state.score,
        error: entry.state.error.clone(),
        history: entry.state.history.clone(),
        summary: entry.summary.clone(),
        progress_save_warning: entry.progress_save_warning,
    }
}
