//! Typed contract writes. Every transaction the client sends is one of these
//! calls, validated by the orchestrator before it reaches the chain.

use crate::domain::{
    eth::{self, Address, Asset, ContractAddress, TokenAddress, U256},
    time::Deadline,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `approve(spender, amount)` on an ERC20 token.
    Approve(eth::Approval),
    /// `swapExactTokensForTokens` on the router.
    Swap(Swap),
    /// `addLiquidity` on the router.
    AddLiquidity(AddLiquidity),
}

impl Call {
    /// The kind of the call, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Call::Approve(_) => "approve",
            Call::Swap(_) => "swap",
            Call::AddLiquidity(_) => "add_liquidity",
        }
    }
}

/// Sells an exact amount of one token for at least `min_out` of another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swap {
    pub router: ContractAddress,
    pub sell: Asset,
    /// The token bought and the minimum amount accepted.
    pub min_out: Asset,
    pub recipient: Address,
    pub deadline: Deadline,
}

impl Swap {
    pub fn path(&self) -> Vec<Address> {
        vec![self.sell.token.into(), self.min_out.token.into()]
    }
}

/// Deposits up to the desired amounts of both tokens into a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidity {
    pub router: ContractAddress,
    pub a: Deposit,
    pub b: Deposit,
    pub recipient: Address,
    pub deadline: Deadline,
}

/// One side of a liquidity deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deposit {
    pub token: TokenAddress,
    pub desired: U256,
    pub min: U256,
}
