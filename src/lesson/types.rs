use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialogue {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub target_vocabulary: Vec<String>,
    #[serde(default)]
    pub target_structures: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub turns: Vec<Turn>,
}

impl Dialogue {
    pub fn turn(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    pub fn student_turn_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|turn| matches!(turn, Turn::Student(_)))
            .count()
    }
}

/// 回合角色标签联合：老师回合或学生回合。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum Turn {
    Teacher(TeacherTurn),
    Student(StudentTurn),
}

impl Turn {
    pub fn index(&self) -> usize {
        match self {
            Turn::Teacher(turn) => turn.index,
            Turn::Student(turn) => turn.index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherTurn {
    pub index: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<TurnAudio>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnAudio {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// 学生回合：`accepted_answers` 非空，任一变体均算正确。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTurn {
    pub index: usize,
    pub expected_answer: String,
    pub accepted_answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub is_correct: bool,
    pub feedback_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_audio: Option<String>,
    pub correct_answer: String,
    pub details: CorrectionDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionDetails {
    pub grammar_ok: bool,
    pub vocabulary_ok: bool,
    pub structure_ok: bool,
}

impl CorrectionDetails {
    pub fn all_ok() -> Self {
        Self {
            grammar_ok: true,
            vocabulary_ok: true,
            structure_ok: true,
        }
    }

    pub fn none_ok() -> Self {
        Self {
            grammar_ok: false,
            vocabulary_ok: false,
            structure_ok: false,
        }
    }
}

/// 仅供展示的会话记录，评估逻辑不读取。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub text: String,
}

impl ConversationEntry {
    pub fn teacher(text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Teacher,
            text: text.into(),
        }
    }

    pub fn student(text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Student,
            text: text.into(),
        }
    }

    pub fn feedback(text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Feedback,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Teacher,
    Student,
    Feedback,
}
