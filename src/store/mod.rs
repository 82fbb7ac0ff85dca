pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lesson::types::Dialogue;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// 课程内容库：按 级别/阶段/课程 返回一组对话。
/// 持久化本身是外部协作方，这里只定义接缝。
pub trait DialogueStore: Send + Sync {
    fn dialogues_for_lesson(
        &self,
        level: &str,
        stage: &str,
        lesson_id: &str,
    ) -> Result<Vec<Dialogue>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: String,
    pub owner_id: String,
    pub dialogue_id: String,
    /// 百分比得分，由 correct/total 取整得出。
    pub score: u32,
    pub total_turns: u32,
    pub correct_turns: u32,
    pub duration_seconds: i64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProgressRecord {
    pub owner_id: String,
    pub dialogue_id: String,
    pub total_turns: u32,
    pub correct_turns: u32,
    pub duration_seconds: i64,
}

/// 进度记录库：按 id + 所有者 存取。
pub trait ProgressStore: Send + Sync {
    fn insert(&self, record: NewProgressRecord) -> Result<ProgressRecord, StoreError>;
    fn get(&self, owner_id: &str, id: &str) -> Result<Option<ProgressRecord>, StoreError>;
    fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ProgressRecord>, StoreError>;
    fn delete(&self, owner_id: &str, id: &str) -> Result<bool, StoreError>;
}
