//! Swap quotes. The router's read-only `getAmountsOut` is the only source a
//! swap bound may be derived from, since it matches what the router executes.

use {
    crate::{
        domain::eth::{self, Token},
        infra::blockchain::{self, Chain},
    },
    thiserror::Error,
};

/// Asks the router how much of `buy` selling `amount_in` of `sell` yields.
pub async fn swap(
    chain: &dyn Chain,
    router: eth::ContractAddress,
    sell: &Token,
    buy: &Token,
    amount_in: eth::U256,
) -> Result<eth::U256, Error> {
    let amounts = chain
        .amounts_out(router, amount_in, vec![sell.address, buy.address])
        .await
        .map_err(Error::Unavailable)?;
    match amounts.last() {
        Some(amount_out) if !amount_out.is_zero() => Ok(*amount_out),
        Some(_) => Err(Error::NoLiquidity),
        None => Err(Error::Unavailable(blockchain::Error::Contract(
            "router returned no amounts".to_owned(),
        ))),
    }
}

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("pool has no liquidity")]
    NoLiquidity,
    #[error("quote unavailable: {0}")]
    Unavailable(#[source] blockchain::Error),
}
