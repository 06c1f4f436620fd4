use crate::record::Turn;

/// Number of turns replayed when nothing else is configured.
pub const DEFAULT_WINDOW_TURNS: usize = 3;

/// Picks the trailing turns replayed to the model.
///
/// Storage keeps every turn; trimming happens only here, so the prompt cost is
/// bounded by the window size however long the conversation has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow {
    size: usize,
}

impl ContextWindow {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Most recent `size` turns, oldest first.
    pub fn select<'a>(&self, turns: &'a [Turn]) -> &'a [Turn] {
        let start = turns.len().saturating_sub(self.size);
        &turns[start..]
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_TURNS)
    }
}
