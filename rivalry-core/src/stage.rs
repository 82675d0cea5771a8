use serde::{Deserialize, Serialize};

/// Coarse lifecycle of a session as seen by the presentation loop.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    /// Instructions on screen, waiting for the start key.
    #[default]
    Welcome,
    Running,
    /// Schedule exhausted or exit key pressed. Terminal.
    Finished,
}

impl SessionStage {
    pub fn next(&self) -> Option<Self> {
        use SessionStage::*;
        Some(match self {
            Welcome => Running,
            Running => Finished,
            Finished => return None,
        })
    }

    pub fn allows_responses(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_welcome(&self) -> bool {
        matches!(self, Self::Welcome)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}
