//! Mutation requests as they arrive on `POST /api/queue`.

use serde::{Deserialize, Serialize};

/// Wire body: `{"action": "callNext", "loketId": "loket-1"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRequest {
    pub action: String,
    #[serde(
        rename = "loketId",
        alias = "counterId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub counter_id: Option<String>,
}

/// A parsed mutation. Unknown action names are kept so the store can still
/// record the write (version bump only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueAction {
    CallNext(String),
    Recall(String),
    ResetOne(String),
    ResetAll,
    Unrecognized(String),
}

impl QueueAction {
    /// Wire name of the action.
    pub fn name(&self) -> &str {
        match self {
            QueueAction::CallNext(_) => "callNext",
            QueueAction::Recall(_) => "recallCurrent",
            QueueAction::ResetOne(_) => "resetQueue",
            QueueAction::ResetAll => "resetAll",
            QueueAction::Unrecognized(name) => name,
        }
    }

    pub fn counter_id(&self) -> Option<&str> {
        match self {
            QueueAction::CallNext(id) | QueueAction::Recall(id) | QueueAction::ResetOne(id) => {
                Some(id)
            }
            QueueAction::ResetAll | QueueAction::Unrecognized(_) => None,
        }
    }
}

impl From<MutationRequest> for QueueAction {
    /// A counter action without `loketId` targets the empty id, which matches no
    /// counter and therefore becomes a no-op.
    fn from(req: MutationRequest) -> Self {
        let id = req.counter_id.unwrap_or_default();
        match req.action.as_str() {
            "callNext" => QueueAction::CallNext(id),
            "recallCurrent" => QueueAction::Recall(id),
            "resetQueue" => QueueAction::ResetOne(id),
            "resetAll" => QueueAction::ResetAll,
            _ => QueueAction::Unrecognized(req.action),
        }
    }
}

impl From<&QueueAction> for MutationRequest {
    fn from(action: &QueueAction) -> Self {
        Self {
            action: action.name().to_string(),
            counter_id: action.counter_id().map(str::to_string),
        }
    }
}
