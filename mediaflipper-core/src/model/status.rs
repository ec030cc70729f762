use serde::{Deserialize, Serialize};

/// Shared by JobContainer and JobStep (spec §3). Transitions are monotonic
/// toward one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Started,
    Active,
    Running,
    Completed,
    Failed,
    Lost,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Lost)
    }
}

/// BulkItem lifecycle states (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BulkItemState {
    NotQueued,
    Pending,
    Active,
    Completed,
    Failed,
    Aborted,
}

impl BulkItemState {
    /// Numeric index used in the `state:<N>` index keys. `Pending`,
    /// `Active`, `Completed`, `Failed` keep the indices the original
    /// media-flipper state machine used (0-3; spec §8 scenario 1 pins
    /// `Completed` to index 2) — `NotQueued` and `Aborted` are appended
    /// rather than renumbering, so existing index keys stay stable.
    pub const ALL: [BulkItemState; 6] = [
        BulkItemState::Pending,
        BulkItemState::Active,
        BulkItemState::Completed,
        BulkItemState::Failed,
        BulkItemState::NotQueued,
        BulkItemState::Aborted,
    ];

    pub fn index(self) -> u8 {
        match self {
            BulkItemState::Pending => 0,
            BulkItemState::Active => 1,
            BulkItemState::Completed => 2,
            BulkItemState::Failed => 3,
            BulkItemState::NotQueued => 4,
            BulkItemState::Aborted => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Image,
    Other,
}
