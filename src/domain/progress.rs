//! Progress derivation from the accumulated message history.

use crate::domain::status::StatusMessage;

/// UI-facing progress snapshot for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    /// 0-100. Never decreases across a task's history: out-of-range or
    /// regressing server values are corrected here, not in the stream.
    pub display_percent: u8,
    /// True until the first status message arrives.
    pub is_loading: bool,
    /// Step label of the most recent message.
    pub current_step: Option<String>,
}

impl ProgressView {
    pub fn from_history(history: &[StatusMessage]) -> Self {
        let display_percent = history
            .iter()
            .map(|m| m.total_progress.clamp(0, 100) as u8)
            .max()
            .unwrap_or(0);

        ProgressView {
            display_percent,
            is_loading: history.is_empty(),
            current_step: history.last().map(|m| m.step.clone()),
        }
    }
}
