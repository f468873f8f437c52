use {
    crate::domain::eth::{self, ContractAddress, TokenAddress, U256},
    alloy::primitives::keccak256,
    hex_literal::hex,
    number::u256_ext::U256Ext,
    thiserror::Error,
};

/// Hash of the Uniswap V2 pair creation code. Forks that deploy a modified
/// pair contract use a different digest.
pub const INIT_CODE_DIGEST: [u8; 32] =
    hex!("96e8ac4277198ff8b6f785478aa9a39f403cb768dd02cbee326c3e7da348845f");

/// Pool state as read from a pair contract. The reserves are in the pool's
/// own slot order, which is independent of the order the user picked the
/// tokens in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pool {
    pub address: ContractAddress,
    pub token0: TokenAddress,
    pub token1: TokenAddress,
    pub reserve0: U256,
    pub reserve1: U256,
    /// Block timestamp of the last reserve update.
    pub timestamp: u32,
}

impl Pool {
    /// Resolves the pool's reserves into the order `(a, b)`.
    pub fn reserves(&self, a: TokenAddress, b: TokenAddress) -> Result<Reserves, Error> {
        // https://github.com/Uniswap/v2-periphery/blob/master/contracts/libraries/UniswapV2Library.sol#L29
        if (a, b) == (self.token0, self.token1) {
            Ok(Reserves {
                a: self.reserve0,
                b: self.reserve1,
            })
        } else if (a, b) == (self.token1, self.token0) {
            Ok(Reserves {
                a: self.reserve1,
                b: self.reserve0,
            })
        } else {
            Err(Error::TokenMismatch)
        }
    }
}

/// Pool reserves in the order the user selected the tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reserves {
    pub a: U256,
    pub b: U256,
}

impl Reserves {
    /// The amount of `b` matching `amount_a` at the current pool ratio.
    pub fn counter_amount(&self, amount_a: U256) -> Result<U256, Error> {
        counter_amount(self.a, self.b, amount_a)
    }

    /// An estimate of the output of selling `amount_a` into the pool. Only
    /// meant for display, the router's quote is what bounds a swap.
    pub fn estimated_amount_out(&self, amount_a: U256) -> Option<U256> {
        estimated_amount_out(self.a, self.b, amount_a)
    }
}

/// Computes `floor(amount_in * reserve_out / reserve_in)`, the amount of the
/// other token that keeps a liquidity deposit at the pool ratio.
pub fn counter_amount(reserve_in: U256, reserve_out: U256, amount_in: U256) -> Result<U256, Error> {
    if reserve_in.is_zero() {
        return Err(Error::NoLiquidity);
    }
    amount_in
        .checked_mul_div(&reserve_out, &reserve_in)
        .ok_or(Error::Overflow)
}

/// Constant product output with the 0.3% pool fee.
///
/// https://github.com/Uniswap/v2-periphery/blob/master/contracts/libraries/UniswapV2Library.sol#L43
pub fn estimated_amount_out(reserve_in: U256, reserve_out: U256, amount_in: U256) -> Option<U256> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return None;
    }
    let amount_in_with_fee = amount_in.checked_mul(U256::from(997u64))?;
    let denominator = reserve_in
        .checked_mul(U256::from(1000u64))?
        .checked_add(amount_in_with_fee)?;
    amount_in_with_fee.checked_mul_div(&reserve_out, &denominator)
}

/// Derives pair addresses from the factory without a chain round trip.
#[derive(Clone, Copy, Debug)]
pub struct PairProvider {
    pub factory: ContractAddress,
    pub init_code_digest: [u8; 32],
}

impl PairProvider {
    pub fn pair_address(&self, a: TokenAddress, b: TokenAddress) -> ContractAddress {
        let (token0, token1) = if a < b { (a, b) } else { (b, a) };

        // https://docs.uniswap.org/contracts/v2/guides/smart-contract-integration/getting-pair-addresses
        let salt = {
            let mut buffer = [0u8; 40];
            buffer[0..20].copy_from_slice(token0.as_address().as_slice());
            buffer[20..40].copy_from_slice(token1.as_address().as_slice());
            keccak256(buffer)
        };
        create2(self.factory, &salt, &self.init_code_digest)
    }
}

/// Address of a contract deployed by `creator` with CREATE2.
///
/// https://eips.ethereum.org/EIPS/eip-1014
fn create2(
    creator: ContractAddress,
    salt: &[u8; 32],
    init_code_digest: &[u8; 32],
) -> ContractAddress {
    let mut preimage = [0xff; 85];
    preimage[1..21].copy_from_slice(creator.0.as_slice());
    preimage[21..53].copy_from_slice(salt);
    preimage[53..85].copy_from_slice(init_code_digest);
    ContractAddress(eth::Address::from_slice(&keccak256(preimage)[12..]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("pool has no liquidity")]
    NoLiquidity,
    #[error("amount overflows 256 bits")]
    Overflow,
    #[error("pool does not trade the selected tokens")]
    TokenMismatch,
}
