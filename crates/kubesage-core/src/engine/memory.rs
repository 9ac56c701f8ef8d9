// Kubesage Engine — Conversation Memory
// Bounded-window view over an unbounded per-session turn list. Turns are
// immutable once appended and never individually deleted; only the window
// handed to the parser is bounded.

use crate::atoms::types::ConversationTurn;

#[derive(Debug, Default)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a completed turn. No eviction.
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// The most recent min(n, len) turns in chronological order.
    pub fn context_window(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Serialize a window as alternating "User:"/"Assistant:" lines for the
/// parser prompt.
pub fn render_window(turns: &[ConversationTurn]) -> String {
    let mut lines = Vec::with_capacity(turns.len() * 2);
    for turn in turns {
        lines.push(format!("User: {}", turn.query));
        lines.push(format!("Assistant: {}", turn.response));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::TaskParams;

    fn turn(n: usize) -> ConversationTurn {
        ConversationTurn {
            query: format!("q{}", n),
            response: format!("r{}", n),
            params: TaskParams::default(),
            timestamp: format!("2026-01-01 00:00:{:02}", n),
        }
    }

    #[test]
    fn window_returns_most_recent_in_order() {
        let mut mem = ConversationMemory::new();
        for n in 1..=7 {
            mem.append(turn(n));
        }

        let window = mem.context_window(5);
        let queries: Vec<&str> = window.iter().map(|t| t.query.as_str()).collect();
        assert_eq!(queries, vec!["q3", "q4", "q5", "q6", "q7"]);
        // Full history is retained.
        assert_eq!(mem.len(), 7);
    }

    #[test]
    fn window_smaller_history() {
        let mut mem = ConversationMemory::new();
        mem.append(turn(1));
        mem.append(turn(2));
        assert_eq!(mem.context_window(5).len(), 2);
        assert_eq!(mem.context_window(0).len(), 0);
    }

    #[test]
    fn render_alternates_roles() {
        let mut mem = ConversationMemory::new();
        mem.append(turn(1));
        mem.append(turn(2));
        let text = render_window(mem.context_window(5));
        assert_eq!(text, "User: q1\nAssistant: r1\nUser: q2\nAssistant: r2");
    }

    #[test]
    fn render_empty_window() {
        assert_eq!(render_window(&[]), "");
    }
}
