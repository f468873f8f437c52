use {
    crate::{
        domain::eth::{TokenAddress, TxId},
        infra::blockchain,
    },
    std::fmt,
    thiserror::Error,
};

/// The primary action a submission ends with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Swap,
    AddLiquidity,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Swap => "swap",
            Kind::AddLiquidity => "add_liquidity",
        }
    }
}

/// Where the orchestrator is in sequencing a submission.
///
/// `Idle -> AwaitingApproval -> ApprovalSubmitted -> ApprovalConfirmed ->
/// AwaitingAction -> ActionSubmitted -> ActionConfirmed -> Idle`, with the
/// approval steps repeated per token and skipped when nothing needs to be
/// approved. Any step that talks to the signer or waits for a receipt can end
/// in [`State::Failed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum State {
    #[default]
    Idle,
    AwaitingApproval(TokenAddress),
    ApprovalSubmitted {
        token: TokenAddress,
        tx: TxId,
    },
    ApprovalConfirmed(TokenAddress),
    AwaitingAction(Kind),
    ActionSubmitted {
        kind: Kind,
        tx: TxId,
    },
    ActionConfirmed {
        kind: Kind,
        tx: TxId,
    },
    Failed(Failure),
}

impl State {
    /// Whether a submission is in flight. Only [`State::Idle`] and
    /// [`State::Failed`] accept a new one.
    pub fn is_busy(&self) -> bool {
        !matches!(self, State::Idle | State::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::AwaitingApproval(_) => "awaiting_approval",
            State::ApprovalSubmitted { .. } => "approval_submitted",
            State::ApprovalConfirmed(_) => "approval_confirmed",
            State::AwaitingAction(_) => "awaiting_action",
            State::ActionSubmitted { .. } => "action_submitted",
            State::ActionConfirmed { .. } => "action_confirmed",
            State::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Idle => f.write_str("idle"),
            State::AwaitingApproval(token) => write!(f, "approve {token} in your wallet"),
            State::ApprovalSubmitted { token, tx } => write!(f, "approving {token} ({tx})"),
            State::ApprovalConfirmed(token) => write!(f, "approved {token}"),
            State::AwaitingAction(Kind::Swap) => f.write_str("confirm the swap in your wallet"),
            State::AwaitingAction(Kind::AddLiquidity) => {
                f.write_str("confirm the deposit in your wallet")
            }
            State::ActionSubmitted {
                kind: Kind::Swap,
                tx,
            } => write!(f, "swapping ({tx})"),
            State::ActionSubmitted {
                kind: Kind::AddLiquidity,
                tx,
            } => write!(f, "adding liquidity ({tx})"),
            State::ActionConfirmed { kind, tx } => write!(f, "{} confirmed ({tx})", kind.as_str()),
            State::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}

/// Why a submission failed after it started talking to the signer. A failed
/// submission can be retried with the same inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    #[error("rejected by the user")]
    UserRejected,
    #[error("approval failed: {0}")]
    ApprovalFailed(String),
    #[error("action reverted: {0}")]
    ActionReverted(String),
}

impl Failure {
    pub(super) fn approval(err: blockchain::Error) -> Self {
        match err {
            blockchain::Error::Rejected(_) => Self::UserRejected,
            err => Self::ApprovalFailed(err.to_string()),
        }
    }

    pub(super) fn action(err: blockchain::Error) -> Self {
        match err {
            blockchain::Error::Rejected(_) => Self::UserRejected,
            err => Self::ActionReverted(err.to_string()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Failure::UserRejected => "user_rejected",
            Failure::ApprovalFailed(_) => "approval_failed",
            Failure::ActionReverted(_) => "action_reverted",
        }
    }
}
