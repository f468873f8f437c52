use {std::fmt, thiserror::Error};

mod allowance;

pub use {
    alloy::primitives::{Address, B256, U256},
    allowance::{Allowance, Approval, ApprovalPolicy, Existing, Required, Spender, needs_approval},
};

/// Chain ID as defined by EIP-155.
///
/// https://eips.ethereum.org/EIPS/eip-155
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// An address of an Ethereum contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContractAddress(pub Address);

impl From<Address> for ContractAddress {
    fn from(value: Address) -> Self {
        Self(value)
    }
}

impl From<ContractAddress> for Address {
    fn from(value: ContractAddress) -> Self {
        value.0
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// An address of an ERC20 token contract.
///
/// https://eips.ethereum.org/EIPS/eip-20
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAddress(pub ContractAddress);

impl TokenAddress {
    pub fn as_address(&self) -> Address {
        self.0.0
    }
}

impl From<Address> for TokenAddress {
    fn from(value: Address) -> Self {
        Self(value.into())
    }
}

impl From<TokenAddress> for Address {
    fn from(value: TokenAddress) -> Self {
        value.0.0
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId(pub B256);

impl From<B256> for TxId {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// An ERC20 token as known to the client. Tokens are defined by static
/// configuration and never change at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub address: TokenAddress,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    /// Parses a user entered decimal string into an amount of this token.
    pub fn parse(&self, amount: &str) -> Result<TokenAmount, InvalidAmount> {
        let value = number::to_fixed_point(amount, self.decimals)?;
        Ok(self.amount(value))
    }

    /// Like [`Token::parse`] but additionally rejects zero, for amounts that
    /// are about to be spent.
    pub fn parse_positive(&self, amount: &str) -> Result<TokenAmount, InvalidAmount> {
        let amount = self.parse(amount)?;
        if amount.is_zero() {
            return Err(InvalidAmount::Zero);
        }
        Ok(amount)
    }

    pub fn amount(&self, value: U256) -> TokenAmount {
        TokenAmount {
            value,
            decimals: self.decimals,
        }
    }

    pub fn asset(&self, amount: U256) -> Asset {
        Asset {
            token: self.address,
            amount,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidAmount {
    #[error(transparent)]
    Malformed(#[from] number::ParseError),
    #[error("amount must be greater than zero")]
    Zero,
}

/// A fixed point amount together with the precision of the token it
/// denominates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    pub value: U256,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Adds two amounts. Returns `None` on overflow or if the amounts don't
    /// share the same precision.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        (self.decimals == other.decimals).then_some(())?;
        Some(Self {
            value: self.value.checked_add(other.value)?,
            decimals: self.decimals,
        })
    }

    /// Subtracts two amounts. Returns `None` on underflow or if the amounts
    /// don't share the same precision.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        (self.decimals == other.decimals).then_some(())?;
        Some(Self {
            value: self.value.checked_sub(other.value)?,
            decimals: self.decimals,
        })
    }

    /// Renders the amount with a fixed number of fractional digits for
    /// display. Excess digits are truncated.
    pub fn display(&self, digits: usize) -> String {
        number::format_units(self.value, self.decimals, digits)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&number::from_fixed_point(self.value, self.decimals))
    }
}

/// An amount of a specific token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    pub token: TokenAddress,
    pub amount: U256,
}
