use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::lesson::session::Score;
use crate::lesson::types::Dialogue;
use crate::store::{DialogueStore, NewProgressRecord, ProgressRecord, ProgressStore, StoreError};

type LessonKey = (String, String, String);

#[derive(Default)]
pub struct MemoryDialogueStore {
    lessons: RwLock<HashMap<LessonKey, Vec<Dialogue>>>,
}

impl MemoryDialogueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_lesson(
        &self,
        level: impl Into<String>,
        stage: impl Into<String>,
        lesson_id: impl Into<String>,
        dialogues: Vec<Dialogue>,
    ) {
        self.lessons
            .write()
            .insert((level.into(), stage.into(), lesson_id.into()), dialogues);
    }

    pub fn lesson_count(&self) -> usize {
        self.lessons.read().len()
    }
}

impl DialogueStore for MemoryDialogueStore {
    fn dialogues_for_lesson(
        &self,
        level: &str,
        stage: &str,
        lesson_id: &str,
    ) -> Result<Vec<Dialogue>, StoreError> {
        let key = (level.to_string(), stage.to_string(), lesson_id.to_string());
        Ok(self.lessons.read().get(&key).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryProgressStore {
    records: RwLock<HashMap<String, ProgressRecord>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn insert(&self, record: NewProgressRecord) -> Result<ProgressRecord, StoreError> {
        let score = Score {
            correct: record.correct_turns,
            total: record.total_turns,
        };
        let stored = ProgressRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: record.owner_id,
            dialogue_id: record.dialogue_id,
            score: score.percentage(),
            total_turns: record.total_turns,
            correct_turns: record.correct_turns,
            duration_seconds: record.duration_seconds,
            completed_at: Utc::now(),
        };
        self.records.write().insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn get(&self, owner_id: &str, id: &str) -> Result<Option<ProgressRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .get(id)
            .filter(|record| record.owner_id == owner_id)
            .cloned())
    }

    fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ProgressRecord>, StoreError> {
        let mut records: Vec<ProgressRecord> = self
            .records
            .read()
            .values()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(records)
    }

    fn delete(&self, owner_id: &str, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write();
        let owned = records
            .get(id)
            .is_some_and(|record| record.owner_id == owner_id);
        if owned {
            records.remove(id);
        }
        Ok(owned)
    }
}
