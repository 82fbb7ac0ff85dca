use crate::lesson::types::{Dialogue, StudentTurn, TeacherTurn, Turn, TurnAudio};
use crate::store::memory::MemoryDialogueStore;

/// 把内置课程目录灌入内存对话库。重复调用只会覆盖同一批课程。
pub fn seed_dialogue_store(store: &MemoryDialogueStore) {
    store.insert_lesson("starter", "1", "greetings", greetings_dialogues());
    store.insert_lesson("starter", "1", "colours", colours_dialogues());
    store.insert_lesson("starter", "2", "feelings", feelings_dialogues());

    tracing::info!(lessons = store.lesson_count(), "seeded built-in lesson catalog");
}

fn teacher(index: usize, text: &str, hint: Option<&str>, repeat: bool, audio_base: &str) -> Turn {
    Turn::Teacher(TeacherTurn {
        index,
        text: text.to_string(),
        hint: hint.map(str::to_string),
        repeat,
        audio: Some(TurnAudio {
            question: Some(format!("{audio_base}-q{index}.mp3")),
            repeat: repeat.then(|| format!("{audio_base}-r{index}.mp3")),
            hint: hint.map(|_| format!("{audio_base}-h{index}.mp3")),
        }),
    })
}

fn student(index: usize, expected: &str, accepted: &[&str]) -> Turn {
    Turn::Student(StudentTurn {
        index,
        expected_answer: expected.to_string(),
        accepted_answers: accepted.iter().map(|s| s.to_string()).collect(),
    })
}

fn greetings_dialogues() -> Vec<Dialogue> {
    vec![
        Dialogue {
            id: "greetings-1".to_string(),
            title: "Saying hello".to_string(),
            target_vocabulary: vec!["hello".into(), "fine".into(), "thank you".into()],
            target_structures: vec!["How are you?".into(), "I'm fine".into()],
            image: Some("/images/starter/greetings-1.png".to_string()),
            turns: vec![
                teacher(0, "Hello! How are you today?", Some("I'm ..."), true, "/audio/starter/greetings-1"),
                student(1, "I'm fine, thank you", &["I'm fine, thank you", "i am fine thank you", "I'm fine"]),
                teacher(2, "Great! What's your name?", Some("My name is ..."), false, "/audio/starter/greetings-1"),
                student(3, "My name is Lily", &["My name is Lily", "my name is lily", "I'm Lily"]),
            ],
        },
        Dialogue {
            id: "greetings-2".to_string(),
            title: "Saying goodbye".to_string(),
            target_vocabulary: vec!["goodbye".into(), "see you".into()],
            target_structures: vec!["See you tomorrow".into()],
            image: None,
            turns: vec![
                teacher(0, "It's time to go. Goodbye!", None, false, "/audio/starter/greetings-2"),
                student(1, "Goodbye, see you tomorrow", &["Goodbye, see you tomorrow", "goodbye see you tomorrow", "bye, see you tomorrow"]),
            ],
        },
    ]
}

fn colours_dialogues() -> Vec<Dialogue> {
    vec![
        Dialogue {
            id: "colours-1".to_string(),
            title: "What colour is it?".to_string(),
            target_vocabulary: vec!["red".into(), "blue".into(), "yellow".into()],
            target_structures: vec!["It is ...".into(), "What colour is it?".into()],
            image: Some("/images/starter/colours-1.png".to_string()),
            turns: vec![
                teacher(0, "Look at the apple. What colour is it?", Some("It is ..."), true, "/audio/starter/colours-1"),
                student(1, "It is red", &["It is red", "it's red", "red"]),
                teacher(2, "Well done! And the sky? What colour is the sky?", Some("It is ..."), false, "/audio/starter/colours-1"),
                student(3, "It is blue", &["It is blue", "it's blue", "blue"]),
            ],
        },
        Dialogue {
            id: "colours-2".to_string(),
            title: "My favourite colour".to_string(),
            target_vocabulary: vec!["favourite".into(), "green".into()],
            target_structures: vec!["My favourite colour is ...".into()],
            image: None,
            turns: vec![
                teacher(0, "What is your favourite colour?", Some("My favourite colour is ..."), false, "/audio/starter/colours-2"),
                student(1, "My favourite colour is green", &["My favourite colour is green", "my favorite color is green", "green"]),
            ],
        },
    ]
}

fn feelings_dialogues() -> Vec<Dialogue> {
    vec![Dialogue {
        id: "feelings-1".to_string(),
        title: "How do you feel?".to_string(),
        target_vocabulary: vec!["happy".into(), "sad".into(), "tired".into()],
        target_structures: vec!["I am ...".into(), "Are you ...?".into()],
        image: None,
        turns: vec![
            teacher(0, "Look at the boy. He is smiling. How does he feel?", Some("He is ..."), true, "/audio/starter/feelings-1"),
            student(1, "He is happy", &["He is happy", "he's happy", "happy"]),
            teacher(2, "Yes! And you? Are you happy today?", None, false, "/audio/starter/feelings-1"),
            student(3, "Yes, I am happy", &["Yes, I am happy", "yes i'm happy", "I am happy"]),
        ],
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DialogueStore;

    #[test]
    fn seeded_turns_are_strictly_ordered_from_zero() {
        let store = MemoryDialogueStore::new();
        seed_dialogue_store(&store);

        for (level, stage, lesson) in [
            ("starter", "1", "greetings"),
            ("starter", "1", "colours"),
            ("starter", "2", "feelings"),
        ] {
            let dialogues = store.dialogues_for_lesson(level, stage, lesson).unwrap();
            assert!(!dialogues.is_empty());
            for dialogue in &dialogues {
                assert!(!dialogue.turns.is_empty());
                for (position, turn) in dialogue.turns.iter().enumerate() {
                    assert_eq!(turn.index(), position);
                }
            }
        }
    }

    #[test]
    fn seeded_student_turns_always_offer_accepted_answers() {
        let store = MemoryDialogueStore::new();
        seed_dialogue_store(&store);

        let dialogues = store.dialogues_for_lesson("starter", "1", "colours").unwrap();
        for dialogue in &dialogues {
            for turn in &dialogue.turns {
                if let Turn::Student(student) = turn {
                    assert!(!student.accepted_answers.is_empty());
                }
            }
        }
    }
}
