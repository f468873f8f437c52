use {
    super::{Address, TokenAddress, U256},
    serde::Deserialize,
};

/// An ERC20 allowance.
///
/// https://eips.ethereum.org/EIPS/eip-20
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Allowance {
    pub spender: Spender,
    pub amount: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Spender {
    /// The spender address.
    pub address: Address,
    /// The token being spent.
    pub token: TokenAddress,
}

/// An allowance that's already in effect, this essentially models the result of
/// the allowance() method, see https://eips.ethereum.org/EIPS/eip-20#methods.
#[derive(Debug, Clone, Copy)]
pub struct Existing(pub Allowance);

impl From<Allowance> for Existing {
    fn from(inner: Allowance) -> Self {
        Self(inner)
    }
}

/// An allowance that is required for some action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Required(pub Allowance);

impl From<Allowance> for Required {
    fn from(inner: Allowance) -> Self {
        Self(inner)
    }
}

impl Required {
    /// Check if this allowance needs to be approved, and if so, return the
    /// appropriate [`Approval`]. An unknown allowance, or one for a different
    /// spender, never covers the requirement.
    pub fn approval(&self, existing: Option<&Existing>) -> Option<Approval> {
        let current = existing
            .filter(|existing| existing.0.spender == self.0.spender)
            .map(|existing| existing.0.amount);
        needs_approval(current, self.0.amount).then_some(Approval(self.0))
    }
}

/// Whether spending `amount` requires an approval given the `current`
/// allowance. `None` means the allowance is not known (yet).
pub fn needs_approval(current: Option<U256>, amount: U256) -> bool {
    current.is_none_or(|current| amount > current)
}

/// An approval which needs to be made with an approve() call, see
/// https://eips.ethereum.org/EIPS/eip-20#methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Approval(pub Allowance);

impl Approval {
    /// Approve the maximal amount possible, i.e. set the approved amount to
    /// [`U256::MAX`].
    pub fn max(self) -> Self {
        Self(Allowance {
            amount: U256::MAX,
            ..self.0
        })
    }
}

/// How much to approve when an approval is needed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalPolicy {
    /// Approve exactly the amount about to be spent.
    #[default]
    Exact,
    /// Approve [`U256::MAX`] once so later actions don't need approvals.
    Unlimited,
}

impl ApprovalPolicy {
    pub fn apply(self, approval: Approval) -> Approval {
        match self {
            Self::Exact => approval,
            Self::Unlimited => approval.max(),
        }
    }
}
