use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single to-do item. Only `completed` changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
}

impl Task {
    /// Builds an open task from already-trimmed, non-empty text.
    pub fn new_active(text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            completed: false,
        }
    }

    /// First eight hex digits of the id, used when rendering.
    pub fn short_id(&self) -> String {
        let simple = self.id.simple().to_string();
        simple[..8].to_string()
    }
}
