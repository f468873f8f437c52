//! Pricing math for the supported pool types, and how to find the pool of a
//! token pair.

use {
    crate::{
        domain::eth::{ContractAddress, TokenAddress},
        infra::blockchain::{self, Chain},
    },
    std::collections::HashMap,
};

pub mod uniswap_v2;

/// Where pair addresses come from.
#[derive(Debug, Clone, Copy)]
pub enum Source {
    /// Ask the factory's `getPair`.
    Factory(ContractAddress),
    /// Derive the address with CREATE2, without asking the chain.
    Create2(uniswap_v2::PairProvider),
}

/// Finds the pair contract of two tokens. Explicitly configured pairs take
/// precedence over the source.
#[derive(Debug, Clone)]
pub struct Pairs {
    source: Source,
    known: HashMap<(TokenAddress, TokenAddress), ContractAddress>,
}

impl Pairs {
    pub fn new(
        source: Source,
        known: impl IntoIterator<Item = ((TokenAddress, TokenAddress), ContractAddress)>,
    ) -> Self {
        Self {
            source,
            known: known
                .into_iter()
                .map(|((a, b), pair)| (ordered(a, b), pair))
                .collect(),
        }
    }

    pub async fn find(
        &self,
        chain: &dyn Chain,
        a: TokenAddress,
        b: TokenAddress,
    ) -> Result<Option<ContractAddress>, blockchain::Error> {
        if let Some(pair) = self.known.get(&ordered(a, b)) {
            return Ok(Some(*pair));
        }
        match self.source {
            Source::Factory(factory) => chain.pair(factory, a, b).await,
            Source::Create2(provider) => Ok(Some(provider.pair_address(a, b))),
        }
    }
}

fn ordered(a: TokenAddress, b: TokenAddress) -> (TokenAddress, TokenAddress) {
    if a < b { (a, b) } else { (b, a) }
}
