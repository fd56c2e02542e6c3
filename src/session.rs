//! In-memory conversation history.
//!
//! A session is an append-only log of turns. Turns are recorded in the order
//! they happen and are never edited or removed, so an answer always follows
//! the question that produced it. History is not fed back into the model;
//! every question is answered independently.

use crate::models::{Role, Turn};

/// Append-only turn log for one conversation.
#[derive(Default)]
pub struct Session {
    turns: Vec<Turn>,
}

impl Session {
    pub fn new() -> Session {
        Session { turns: Vec::new() }
    }

    /// Record a question/answer exchange. The user turn is always appended
    /// before the assistant turn, even when the answer is an error report.
    pub fn record_exchange(&mut self, question: &str, answer: &str) {
        self.push(Role::User, question);
        self.push(Role::Assistant, answer);
    }

    pub fn push(&mut self, role: Role, content: &str) {
        self.turns.push(Turn {
            role,
            content: content.to_string(),
        });
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchanges_alternate_user_then_assistant() {
        let mut session = Session::new();
        session.record_exchange("q1", "a1");
        session.record_exchange("q2", "Error: upstream down");

        let turns = session.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "q1");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "a1");
        assert_eq!(turns[2].role, Role::User);
        assert_eq!(turns[3].role, Role::Assistant);
        assert_eq!(turns[3].content, "Error: upstream down");
    }

    #[test]
    fn order_is_preserved() {
        let mut session = Session::new();
        for i in 0..10 {
            session.record_exchange(&format!("q{}", i), &format!("a{}", i));
        }
        for (i, pair) in session.turns().chunks(2).enumerate() {
            assert_eq!(pair[0].content, format!("q{}", i));
            assert_eq!(pair[1].content, format!("a{}", i));
        }
    }
}
