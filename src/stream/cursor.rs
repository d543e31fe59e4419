//! Resume position within a room's event log.

use crate::sse::StreamEvent;

/// Highest `seq` consumed so far. Never moves backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor(Option<i64>);

impl Cursor {
    pub fn new(start: Option<i64>) -> Self {
        Self(start)
    }

    pub fn get(&self) -> Option<i64> {
        self.0
    }

    /// Advance past `event` if it carries a higher `seq`.
    ///
    /// Returns true when the cursor moved.
    pub fn observe(&mut self, event: &StreamEvent) -> bool {
        match (event.seq(), self.0) {
            (Some(seq), Some(current)) if seq <= current => false,
            (Some(seq), _) => {
                self.0 = Some(seq);
                true
            }
            (None, _) => false,
        }
    }
}
