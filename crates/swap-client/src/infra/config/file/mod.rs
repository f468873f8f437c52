pub use load::load;
use {
    crate::domain::{eth, slippage::Tolerance},
    serde::Deserialize,
    serde_with::serde_as,
    std::time::Duration,
};

mod load;

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Config {
    /// Optionally specify the chain ID the client is configured for. The
    /// actual chain ID is fetched from the node, and the client exits if it
    /// does not match this value.
    chain_id: Option<u64>,

    /// The Uniswap V2 router. Defaults to the canonical deployment of the
    /// connected chain.
    router: Option<eth::Address>,

    /// The Uniswap V2 factory used to discover pairs. Defaults to the
    /// canonical deployment of the connected chain.
    factory: Option<eth::Address>,

    /// When set, pair addresses are derived with CREATE2 from the factory
    /// and this digest of the pair creation code instead of asking the
    /// factory.
    init_code_digest: Option<eth::B256>,

    /// The tokens the client knows about.
    #[serde(rename = "token")]
    tokens: Vec<TokenConfig>,

    /// Pairs with a known address, skipping discovery.
    #[serde(rename = "pair", default)]
    pairs: Vec<PairConfig>,

    /// How much to approve when an approval is needed.
    #[serde(default)]
    approval: eth::ApprovalPolicy,

    /// How long after submission the router still accepts an action.
    #[serde(with = "humantime_serde", default = "default_deadline")]
    deadline: Duration,

    /// How often balances, allowances and reserves are refreshed while
    /// watching.
    #[serde(with = "humantime_serde", default = "default_refresh_interval")]
    refresh_interval: Duration,

    /// Number of confirmations to wait for before a transaction counts as
    /// included.
    #[serde(default = "default_confirmations")]
    confirmations: u64,

    /// Default slippage tolerance in percent, e.g. "0.5".
    #[serde_as(as = "serde_with::DisplayFromStr")]
    #[serde(default)]
    slippage: Tolerance,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct TokenConfig {
    address: eth::Address,
    symbol: String,
    decimals: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PairConfig {
    /// Symbols of the two tokens of the pair.
    tokens: [String; 2],
    address: eth::Address,
}

fn default_deadline() -> Duration {
    Duration::from_secs(20 * 60)
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_confirmations() -> u64 {
    1
}
