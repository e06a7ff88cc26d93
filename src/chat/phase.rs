//! Phases of one user-initiated chat turn.

/// Where a turn currently is.
///
/// ```text
/// Idle → Streaming → Done
/// Idle → Streaming → ToolExecuting → Done                 (tool failed)
/// Idle → Streaming → ToolExecuting → FollowUpStreaming → Done
/// ```
///
/// The session returns to `Idle` once `Done` has been reached or the turn
/// failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    Streaming,
    ToolExecuting,
    FollowUpStreaming,
    Done,
}

impl TurnPhase {
    /// Whether a turn is in flight.
    pub fn is_busy(self) -> bool {
        !matches!(self, Self::Idle | Self::Done)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::ToolExecuting => "tool_executing",
            Self::FollowUpStreaming => "follow_up_streaming",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
