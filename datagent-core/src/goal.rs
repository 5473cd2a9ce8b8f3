//! Agent goals
//!
//! Goals are static instructions handed to the model at the top of every
//! prompt. They are never mutated by the loop.

use serde::{Deserialize, Serialize};

/// A single goal. `priority` is carried for display only; goals are presented
/// in the order they were supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub priority: i32,
    pub name: String,
    pub description: String,
}

impl Goal {
    pub fn new(priority: i32, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            priority,
            name: name.into(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_fields() {
        let goal = Goal::new(1, "Terminate", "Call terminate directly.");
        assert_eq!(goal.priority, 1);
        assert_eq!(goal.name, "Terminate");
        assert_eq!(goal, goal.clone());
    }
}
