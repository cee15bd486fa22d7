use serde::Serialize;

use crate::{error::BridgeResult, models::model::Token};

/// Outcome of an approval request as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ApprovalState {
    Pending,
    Loading,
    Successful { tx_hash: String },
    Failed { error: String },
}

impl ApprovalState {
    /// A declined signature prompt goes back to `Pending` so it can be retried.
    pub fn from_result(result: &BridgeResult<String>) -> Self {
        match result {
            Ok(tx_hash) => Self::Successful {
                tx_hash: tx_hash.clone(),
            },
            Err(e) if e.is_user_rejected() => Self::Pending,
            Err(e) => Self::Failed {
                error: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEvent {
    AllowanceChecked { requires_approval: bool },
    AllowanceCheckFailed(String),
    ApprovalSubmitted,
    ApprovalFinished(ApprovalState),
    ActionStarted,
    ActionRejected,
}

/// Where the user is in the approve-then-act flow of a deposit or claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum ActionStep {
    Direct,
    CheckingAllowance,
    NeedsApproval,
    Approving,
    Approved,
    Bridging { direct: bool },
    Failed { error: String },
}

impl ActionStep {
    pub fn initial(token: &Token) -> Self {
        if token.is_native() {
            Self::Direct
        } else {
            Self::CheckingAllowance
        }
    }

    pub fn can_submit(&self) -> bool {
        matches!(self, Self::Direct | Self::Approved)
    }

    /// Applies `event`; events that do not fit the current step leave it as is.
    pub fn next(self, event: ActionEvent) -> Self {
        match (self, event) {
            (Self::CheckingAllowance, ActionEvent::AllowanceChecked { requires_approval }) => {
                if requires_approval {
                    Self::NeedsApproval
                } else {
                    Self::Approved
                }
            }
            (Self::CheckingAllowance, ActionEvent::AllowanceCheckFailed(error)) => {
                Self::Failed { error }
            }
            (Self::NeedsApproval, ActionEvent::ApprovalSubmitted) => Self::Approving,
            (Self::Approving, ActionEvent::ApprovalFinished(state)) => match state {
                ApprovalState::Successful { .. } => Self::Approved,
                ApprovalState::Pending => Self::NeedsApproval,
                ApprovalState::Loading => Self::Approving,
                ApprovalState::Failed { error } => Self::Failed { error },
            },
            (Self::Direct, ActionEvent::ActionStarted) => Self::Bridging { direct: true },
            (Self::Approved, ActionEvent::ActionStarted) => Self::Bridging { direct: false },
            (Self::Bridging { direct }, ActionEvent::ActionRejected) => {
                if direct {
                    Self::Direct
                } else {
                    Self::Approved
                }
            }
            (step, _) => step,
        }
    }
}
