use {
    crate::domain::{
        eth,
        liquidity,
        orchestrator,
        reconciler,
        slippage::Tolerance,
    },
    std::time::Duration,
};

pub mod file;

/// Static, network specific configuration. Loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub tokens: Vec<eth::Token>,
    pub router: eth::ContractAddress,
    pub pairs: liquidity::Pairs,
    pub approval: eth::ApprovalPolicy,
    pub deadline: Duration,
    pub refresh_interval: Duration,
    pub confirmations: u64,
    pub slippage: Tolerance,
}

impl Config {
    /// Looks up a configured token by symbol (case insensitive) or address.
    pub fn token(&self, token: &str) -> Option<&eth::Token> {
        let address = token.parse::<eth::Address>().ok();
        self.tokens.iter().find(|candidate| {
            candidate.symbol.eq_ignore_ascii_case(token)
                || Some(candidate.address.as_address()) == address
        })
    }

    pub fn orchestrator(&self) -> orchestrator::Config {
        orchestrator::Config {
            router: self.router,
            approval: self.approval,
            deadline: self.deadline,
        }
    }

    pub fn reconciler(&self) -> reconciler::Config {
        reconciler::Config {
            router: self.router,
            pairs: self.pairs.clone(),
        }
    }
}
