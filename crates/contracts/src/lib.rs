//! Typed bindings for the on-chain contracts the client talks to: ERC-20
//! tokens and the Uniswap V2 pair, factory and router.

pub mod networks {
    pub const MAINNET: u64 = 1;
    pub const SEPOLIA: u64 = 11155111;
    pub const BASE: u64 = 8453;
}

/// Generates bindings for a Solidity interface. The generated module exposes
/// everything `alloy::sol!` creates plus an `Instance` alias bound to the
/// type erased provider and, if deployment information is given, the
/// canonical deployment per chain.
#[macro_export]
macro_rules! bindings {
    ($contract:ident { $($body:tt)* } $(, $deployment_info:expr)?) => {
        paste::paste! {
            // Generate the main bindings in a private module. That allows
            // us to re-export all items in our own module while also adding
            // some items ourselves.
            #[allow(non_snake_case)]
            mod [<$contract Private>] {
                alloy::sol! {
                    #[allow(missing_docs)]
                    #[sol(rpc)]
                    interface $contract {
                        $($body)*
                    }
                }
            }

            #[allow(non_snake_case)]
            pub mod $contract {
                use alloy::providers::DynProvider;

                pub use super::[<$contract Private>]::*;
                pub type Instance = $contract::[<$contract Instance>]<DynProvider>;

                $(
                use {
                    std::{sync::LazyLock, collections::HashMap},
                    alloy::primitives::{address, Address},
                    $crate::networks::*,
                };

                pub static DEPLOYMENT_INFO: LazyLock<HashMap<u64, Address>> = LazyLock::new(|| {
                    $deployment_info
                });

                /// Returns the canonical deployment on the given chain, if any.
                pub fn deployment(chain_id: u64) -> Option<Address> {
                    DEPLOYMENT_INFO.get(&chain_id).copied()
                }
                )?
            }
        }
    };
}

bindings!(IERC20 {
    function balanceOf(address account) external view returns (uint256);
    function allowance(address owner, address spender) external view returns (uint256);
    function approve(address spender, uint256 amount) external returns (bool);
    function decimals() external view returns (uint8);
});

bindings!(IUniswapV2Pair {
    function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    function token0() external view returns (address);
    function token1() external view returns (address);
});

bindings!(
    IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address);
    },
    maplit::hashmap! {
        MAINNET => address!("0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f"),
        BASE => address!("0x8909Dc15e40173Ff4699343b6eB8132c65e18eC6"),
    }
);

bindings!(
    IUniswapV2Router02 {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);
        function addLiquidity(
            address tokenA,
            address tokenB,
            uint256 amountADesired,
            uint256 amountBDesired,
            uint256 amountAMin,
            uint256 amountBMin,
            address to,
            uint256 deadline
        ) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);
    },
    maplit::hashmap! {
        MAINNET => address!("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
        BASE => address!("0x4752ba5dbc23f44d87826276bf6fd6b1c372ad24"),
    }
);
