use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lesson::types::{ConversationEntry, Dialogue, EvaluationResult, Turn};

/// 会话主阶段。`Error` 仅从 `Loading` 或 `Evaluating` 进入；
/// `Summary` 是正常终点。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    TeacherSpeaking,
    StudentTurn,
    Evaluating,
    Feedback,
    Summary,
    Error,
}

/// 老师回合内的子阶段：问题 → （可选）重复 → （可选）提示。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeacherPhase {
    Question,
    Repeat,
    Hint,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub correct: u32,
    pub total: u32,
}

impl Score {
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.correct as f64 / self.total as f64) * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub duration_seconds: i64,
    pub correct_turns: u32,
    pub total_turns: u32,
    pub percentage: u32,
}

/// 驱动状态机的离散事件。每个事件被完整处理后才接受下一个。
#[derive(Debug, Clone)]
pub enum SessionEvent {
    DialoguesLoaded(Vec<Dialogue>),
    LoadFailed(String),
    AudioEnded,
    AnswerChanged(String),
    Submit,
    EvaluationSucceeded(EvaluationResult),
    EvaluationFailed(String),
    Next,
    Restart { started_at: DateTime<Utc> },
}

/// 单个学习者的会话状态。只能通过 [`SessionState::apply`] 变化；
/// 每个转移函数接受旧状态返回新状态，便于单独测试。
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub dialogues: Vec<Dialogue>,
    pub dialogue_index: usize,
    pub turn_index: usize,
    pub phase: Phase,
    pub teacher_phase: TeacherPhase,
    pub answer: String,
    pub evaluation: Option<EvaluationResult>,
    pub score: Score,
    /// 与 `dialogues` 等长，供总结页按对话分别存一条进度记录。
    pub dialogue_scores: Vec<Score>,
    pub error: Option<String>,
    pub history: Vec<ConversationEntry>,
    pub started_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            dialogues: Vec::new(),
            dialogue_index: 0,
            turn_index: 0,
            phase: Phase::Loading,
            teacher_phase: TeacherPhase::Question,
            answer: String::new(),
            evaluation: None,
            score: Score::default(),
            dialogue_scores: Vec::new(),
            error: None,
            history: Vec::new(),
            started_at,
        }
    }

    pub fn current_dialogue(&self) -> Option<&Dialogue> {
        self.dialogues.get(self.dialogue_index)
    }

    pub fn current_turn(&self) -> Option<&Turn> {
        self.current_dialogue()?.turn(self.turn_index)
    }

    /// 学生回合对应的上下文：同一对话内最近一个在前的老师问题。
    pub fn current_teacher_question(&self) -> Option<&str> {
        let dialogue = self.current_dialogue()?;
        dialogue.turns[..self.turn_index.min(dialogue.turns.len())]
            .iter()
            .rev()
            .find_map(|turn| match turn {
                Turn::Teacher(teacher) => Some(teacher.text.as_str()),
                Turn::Student(_) => None,
            })
    }

    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            duration_seconds: (now - self.started_at).num_seconds().max(0),
            correct_turns: self.score.correct,
            total_turns: self.score.total,
            percentage: self.score.percentage(),
        }
    }

    /// 唯一的转移入口。未列出的 (阶段, 事件) 组合一律是无操作。
    pub fn apply(self, event: SessionEvent) -> SessionState {
        match event {
            SessionEvent::DialoguesLoaded(dialogues) => self.on_dialogues_loaded(dialogues),
            SessionEvent::LoadFailed(message) => self.on_load_failed(message),
            SessionEvent::AudioEnded => self.on_audio_ended(),
            SessionEvent::AnswerChanged(text) => self.on_answer_changed(text),
            SessionEvent::Submit => self.on_submit(),
            SessionEvent::EvaluationSucceeded(result) => self.on_evaluation_succeeded(result),
            SessionEvent::EvaluationFailed(message) => self.on_evaluation_failed(message),
            SessionEvent::Next => self.on_next(),
            SessionEvent::Restart { started_at } => self.on_restart(started_at),
        }
    }

    fn on_dialogues_loaded(mut self, dialogues: Vec<Dialogue>) -> SessionState {
        if self.phase != Phase::Loading {
            return self;
        }
        if dialogues.is_empty() || dialogues.iter().any(|d| d.turns.is_empty()) {
            self.phase = Phase::Error;
            self.error = Some("该课程暂无对话内容".to_string());
            return self;
        }

        self.dialogue_scores = vec![Score::default(); dialogues.len()];
        self.dialogues = dialogues;
        self.dialogue_index = 0;
        self.turn_index = 0;
        self.enter_turn()
    }

    fn on_load_failed(mut self, message: String) -> SessionState {
        if self.phase != Phase::Loading {
            return self;
        }
        self.phase = Phase::Error;
        self.error = Some(message);
        self
    }

    fn on_audio_ended(mut self) -> SessionState {
        if self.phase != Phase::TeacherSpeaking {
            return self;
        }
        let Some(Turn::Teacher(teacher)) = self.current_turn().cloned() else {
            return self;
        };

        match self.teacher_phase {
            TeacherPhase::Question if teacher.repeat => {
                self.teacher_phase = TeacherPhase::Repeat;
                self
            }
            TeacherPhase::Question | TeacherPhase::Repeat if teacher.hint.is_some() => {
                self.teacher_phase = TeacherPhase::Hint;
                self
            }
            TeacherPhase::Question | TeacherPhase::Repeat | TeacherPhase::Hint => {
                self.advance_turn()
            }
        }
    }

    fn on_answer_changed(mut self, text: String) -> SessionState {
        if self.phase != Phase::StudentTurn {
            return self;
        }
        self.answer = text;
        self
    }

    /// 空白提交是无操作；`Evaluating` 期间的再次提交被忽略（同一时刻
    /// 只允许一个在途评估）。
    fn on_submit(mut self) -> SessionState {
        if self.phase != Phase::StudentTurn {
            return self;
        }
        let trimmed = self.answer.trim();
        if trimmed.is_empty() {
            return self;
        }

        self.history.push(ConversationEntry::student(trimmed.to_string()));
        self.error = None;
        self.phase = Phase::Evaluating;
        self
    }

    fn on_evaluation_succeeded(mut self, result: EvaluationResult) -> SessionState {
        if self.phase != Phase::Evaluating {
            return self;
        }

        self.score.total += 1;
        if let Some(tally) = self.dialogue_scores.get_mut(self.dialogue_index) {
            tally.total += 1;
        }
        if result.is_correct {
            self.score.correct += 1;
            if let Some(tally) = self.dialogue_scores.get_mut(self.dialogue_index) {
                tally.correct += 1;
            }
        }

        self.history.push(ConversationEntry::feedback(result.feedback_text.clone()));
        self.evaluation = Some(result);
        self.phase = Phase::Feedback;
        self
    }

    /// 可恢复失败：留在当前学生回合，保留已输入的答案，允许重新提交。
    fn on_evaluation_failed(mut self, message: String) -> SessionState {
        if self.phase != Phase::Evaluating {
            return self;
        }
        self.phase = Phase::StudentTurn;
        self.error = Some(message);
        self
    }

    fn on_next(self) -> SessionState {
        if self.phase != Phase::Feedback {
            return self;
        }
        self.advance_turn()
    }

    fn on_restart(mut self, started_at: DateTime<Utc>) -> SessionState {
        if self.dialogues.is_empty() {
            return self;
        }

        self.dialogue_index = 0;
        self.turn_index = 0;
        self.score = Score::default();
        self.dialogue_scores = vec![Score::default(); self.dialogues.len()];
        self.answer.clear();
        self.evaluation = None;
        self.error = None;
        self.history.clear();
        self.started_at = started_at;
        self.enter_turn()
    }

    /// 回合推进函数（纯函数，确定性）：
    /// 1. 当前对话还有下一回合 → 进入它；
    /// 2. 否则还有下一对话 → 进入其第 0 回合；
    /// 3. 否则 → 总结页。
    pub fn advance_turn(mut self) -> SessionState {
        let has_next_turn = self
            .current_dialogue()
            .is_some_and(|d| self.turn_index + 1 < d.turns.len());

        if has_next_turn {
            self.turn_index += 1;
            return self.enter_turn();
        }

        if self.dialogue_index + 1 < self.dialogues.len() {
            self.dialogue_index += 1;
            self.turn_index = 0;
            return self.enter_turn();
        }

        self.answer.clear();
        self.evaluation = None;
        self.error = None;
        self.phase = Phase::Summary;
        self
    }

    fn enter_turn(mut self) -> SessionState {
        self.answer.clear();
        self.evaluation = None;
        self.error = None;

        let turn = self.current_turn().cloned();
        match turn {
            Some(Turn::Teacher(teacher)) => {
                self.phase = Phase::TeacherSpeaking;
                self.teacher_phase = TeacherPhase::Question;
                self.history.push(ConversationEntry::teacher(teacher.text));
            }
            Some(Turn::Student(_)) => {
                self.phase = Phase::StudentTurn;
            }
            None => {
                self.phase = Phase::Error;
                self.error = Some("对话数据不完整".to_string());
            }
        }
        self
    }
}
