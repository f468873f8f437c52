use {
    crate::domain::slippage::Tolerance,
    alloy::signers::local::PrivateKeySigner,
    std::path::PathBuf,
    url::Url,
};

#[derive(Debug, clap::Parser)]
#[clap(about = "Swap tokens and provide liquidity on Uniswap V2 style pools")]
pub struct Args {
    /// The log filter.
    #[clap(long, env, default_value = "warn,swap_client=info")]
    pub log: String,

    /// At which log level logs should be printed to stderr instead of stdout.
    #[clap(long, env)]
    pub stderr_threshold: Option<tracing::Level>,

    /// Whether to use JSON format for the logs.
    #[clap(long, env, default_value = "false")]
    pub use_json_logs: bool,

    /// The node RPC API endpoint.
    #[clap(long, env)]
    pub node_url: Url,

    /// The private key of the account that signs transactions.
    #[clap(long, env, hide_env_values = true)]
    pub private_key: PrivateKeySigner,

    /// Path to the client configuration file. This file should be in TOML
    /// format. For an example see `crates/swap-client/example.toml`.
    #[clap(long, env)]
    pub config: PathBuf,

    /// Print the collected metrics in the prometheus text format to stderr
    /// once the command finished.
    #[clap(long, env, default_value = "false")]
    pub print_metrics: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Show the account's balance of every configured token.
    Balances,

    /// Show the reserves of a pair and the account's share of it.
    Pool {
        /// Symbol or address of the first token.
        a: String,
        /// Symbol or address of the second token.
        b: String,
    },

    /// Quote selling an amount of one token for another.
    Quote {
        sell: String,
        buy: String,
        /// Decimal amount of `sell`, e.g. "1.5".
        amount: String,
        /// Slippage tolerance in percent. Defaults to the configured value.
        #[clap(long)]
        slippage: Option<Tolerance>,
    },

    /// Sell an exact amount of one token for another, approving the router
    /// first if needed.
    Swap {
        sell: String,
        buy: String,
        amount: String,
        #[clap(long)]
        slippage: Option<Tolerance>,
    },

    /// Deposit two tokens into their pair, approving the router first if
    /// needed.
    AddLiquidity {
        a: String,
        b: String,
        amount_a: String,
        /// Amount of `b`. Defaults to the amount matching the pool ratio.
        amount_b: Option<String>,
        #[clap(long)]
        slippage: Option<Tolerance>,
    },

    /// Keep a quote up to date while chain state changes, until interrupted.
    Watch {
        sell: String,
        buy: String,
        amount: String,
        #[clap(long)]
        slippage: Option<Tolerance>,
    },
}
