use {
    crate::{
        domain::{
            eth,
            liquidity::{self, uniswap_v2},
        },
        infra::{self, config::file},
    },
    contracts::{IUniswapV2Factory, IUniswapV2Router02},
    std::{collections::HashSet, path::Path},
    tokio::fs,
};

/// Load the client configuration from a TOML file for the connected
/// network.
///
/// # Panics
///
/// This method panics if the config is invalid or on I/O errors.
pub async fn load(chain: eth::ChainId, path: &Path) -> infra::Config {
    let data = fs::read_to_string(path)
        .await
        .unwrap_or_else(|e| panic!("I/O error while reading {path:?}: {e:?}"));
    let config: file::Config = toml::de::from_str(&data)
        .unwrap_or_else(|err| panic!("TOML syntax error while reading {path:?}: {err}"));

    assert_eq!(
        config.chain_id.map(eth::ChainId).unwrap_or(chain),
        chain,
        "The configured chain ID does not match connected Ethereum node"
    );
    assert!(!config.tokens.is_empty(), "no tokens configured");
    assert!(
        !config.refresh_interval.is_zero(),
        "refresh interval must be positive"
    );
    assert!(!config.deadline.is_zero(), "deadline must be positive");

    let tokens: Vec<eth::Token> = config
        .tokens
        .into_iter()
        .map(|token| eth::Token {
            address: token.address.into(),
            symbol: token.symbol,
            decimals: token.decimals,
        })
        .collect();
    let mut symbols = HashSet::new();
    for token in &tokens {
        assert!(
            symbols.insert(token.symbol.to_lowercase()),
            "token symbol {} configured twice",
            token.symbol
        );
    }
    let lookup = |symbol: &str| {
        tokens
            .iter()
            .find(|token| token.symbol.eq_ignore_ascii_case(symbol))
            .map(|token| token.address)
            .unwrap_or_else(|| panic!("pair references unknown token {symbol}"))
    };

    let router = config
        .router
        .or_else(|| IUniswapV2Router02::deployment(chain.0))
        .unwrap_or_else(|| panic!("no router configured for chain {}", chain.0));
    let factory = config
        .factory
        .or_else(|| IUniswapV2Factory::deployment(chain.0))
        .unwrap_or_else(|| panic!("no factory configured for chain {}", chain.0));
    let source = match config.init_code_digest {
        Some(digest) => liquidity::Source::Create2(uniswap_v2::PairProvider {
            factory: factory.into(),
            init_code_digest: digest.0,
        }),
        None => liquidity::Source::Factory(factory.into()),
    };
    let pairs = liquidity::Pairs::new(
        source,
        config.pairs.iter().map(|pair| {
            let [a, b] = &pair.tokens;
            ((lookup(a), lookup(b)), pair.address.into())
        }),
    );

    infra::Config {
        router: router.into(),
        pairs,
        approval: config.approval,
        deadline: config.deadline,
        refresh_interval: config.refresh_interval,
        confirmations: config.confirmations,
        slippage: config.slippage,
        tokens,
    }
}
