use {
    crate::{
        domain::{action, eth, liquidity::uniswap_v2},
        infra::observe,
    },
    alloy::{
        network::EthereumWallet,
        providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
        rpc::client::ClientBuilder,
        signers::local::PrivateKeySigner,
    },
    contracts::{IERC20, IUniswapV2Factory, IUniswapV2Pair, IUniswapV2Router02},
    std::fmt,
};

mod error;
mod instrumentation;

pub use error::Error;

/// Everything the client needs from the chain: reads, and writes that are
/// signed by the connected account.
///
/// This is the connection context that gets passed to every component that
/// talks to the chain, so tests can swap in a fake.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Chain: Send + Sync + 'static {
    /// The account that signs and receives.
    fn account(&self) -> eth::Address;

    /// ERC20 balance of `owner`. Also used for LP token balances, since pairs
    /// are ERC20 tokens themselves.
    async fn balance(
        &self,
        token: eth::TokenAddress,
        owner: eth::Address,
    ) -> Result<eth::U256, Error>;

    async fn allowance(
        &self,
        owner: eth::Address,
        spender: eth::Spender,
    ) -> Result<eth::Existing, Error>;

    /// Asks the factory for the pair of two tokens. `None` if the pair was
    /// never created.
    async fn pair(
        &self,
        factory: eth::ContractAddress,
        a: eth::TokenAddress,
        b: eth::TokenAddress,
    ) -> Result<Option<eth::ContractAddress>, Error>;

    async fn pool(&self, pair: eth::ContractAddress) -> Result<uniswap_v2::Pool, Error>;

    /// The router's `getAmountsOut` for the given path.
    async fn amounts_out(
        &self,
        router: eth::ContractAddress,
        amount_in: eth::U256,
        path: Vec<eth::TokenAddress>,
    ) -> Result<Vec<eth::U256>, Error>;

    /// Signs and broadcasts a call. Returns as soon as the node accepted the
    /// transaction.
    async fn submit(&self, call: action::Call) -> Result<eth::TxId, Error>;

    /// Waits until the transaction is included. Fails with
    /// [`Error::Reverted`] if it was included but reverted.
    async fn confirm(&self, tx: eth::TxId) -> Result<(), Error>;
}

/// The Ethereum blockchain, accessed through a node's RPC API with a local
/// signer.
#[derive(Clone)]
pub struct Ethereum {
    provider: DynProvider,
    account: eth::Address,
    chain: eth::ChainId,
    confirmations: u64,
}

impl Ethereum {
    /// Connects to the node at `url`. Every request is logged and measured
    /// by the instrumentation layer.
    pub async fn new(url: &url::Url, signer: PrivateKeySigner) -> Result<Self, Error> {
        let account = signer.address();
        let rpc = ClientBuilder::default()
            .layer(instrumentation::InstrumentationLayer)
            .http(url.clone());
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::new(signer))
            .connect_client(rpc)
            .erased();
        let chain = provider.get_chain_id().await?.into();

        Ok(Self {
            provider,
            account,
            chain,
            confirmations: 1,
        })
    }

    /// Sets how many blocks must be built on top of a transaction before
    /// [`Chain::confirm`] returns.
    pub fn with_confirmations(self, confirmations: u64) -> Self {
        Self {
            confirmations: confirmations.max(1),
            ..self
        }
    }

    pub fn chain(&self) -> eth::ChainId {
        self.chain
    }

    /// The number of decimals a token contract declares.
    pub async fn decimals(&self, token: eth::TokenAddress) -> Result<u8, Error> {
        Ok(IERC20::Instance::new(token.into(), self.provider.clone())
            .decimals()
            .call()
            .await?)
    }

    fn router(&self, address: eth::ContractAddress) -> IUniswapV2Router02::Instance {
        IUniswapV2Router02::Instance::new(address.into(), self.provider.clone())
    }
}

#[async_trait::async_trait]
impl Chain for Ethereum {
    fn account(&self) -> eth::Address {
        self.account
    }

    async fn balance(
        &self,
        token: eth::TokenAddress,
        owner: eth::Address,
    ) -> Result<eth::U256, Error> {
        Ok(IERC20::Instance::new(token.into(), self.provider.clone())
            .balanceOf(owner)
            .call()
            .await?)
    }

    async fn allowance(
        &self,
        owner: eth::Address,
        spender: eth::Spender,
    ) -> Result<eth::Existing, Error> {
        let amount = IERC20::Instance::new(spender.token.into(), self.provider.clone())
            .allowance(owner, spender.address)
            .call()
            .await?;
        Ok(eth::Allowance { spender, amount }.into())
    }

    async fn pair(
        &self,
        factory: eth::ContractAddress,
        a: eth::TokenAddress,
        b: eth::TokenAddress,
    ) -> Result<Option<eth::ContractAddress>, Error> {
        let pair = IUniswapV2Factory::Instance::new(factory.into(), self.provider.clone())
            .getPair(a.into(), b.into())
            .call()
            .await?;
        Ok((!pair.is_zero()).then_some(pair.into()))
    }

    async fn pool(&self, pair: eth::ContractAddress) -> Result<uniswap_v2::Pool, Error> {
        let instance = IUniswapV2Pair::Instance::new(pair.into(), self.provider.clone());
        let token0 = instance.token0();
        let token1 = instance.token1();
        let reserves = instance.getReserves();
        let (token0, token1, reserves) = futures::try_join!(
            token0.call().into_future(),
            token1.call().into_future(),
            reserves.call().into_future()
        )?;

        let reserve = |reserve: alloy::primitives::Uint<112, 2>| {
            u128::try_from(reserve)
                .map(eth::U256::from)
                .map_err(|_| Error::Contract(format!("pair {pair} reported invalid reserves")))
        };
        Ok(uniswap_v2::Pool {
            address: pair,
            token0: token0.into(),
            token1: token1.into(),
            reserve0: reserve(reserves.reserve0)?,
            reserve1: reserve(reserves.reserve1)?,
            timestamp: reserves.blockTimestampLast,
        })
    }

    async fn amounts_out(
        &self,
        router: eth::ContractAddress,
        amount_in: eth::U256,
        path: Vec<eth::TokenAddress>,
    ) -> Result<Vec<eth::U256>, Error> {
        let path = path.into_iter().map(Into::into).collect();
        Ok(self
            .router(router)
            .getAmountsOut(amount_in, path)
            .call()
            .await?)
    }

    async fn submit(&self, call: action::Call) -> Result<eth::TxId, Error> {
        let pending = match &call {
            action::Call::Approve(approval) => {
                let eth::Allowance { spender, amount } = approval.0;
                IERC20::Instance::new(spender.token.into(), self.provider.clone())
                    .approve(spender.address, amount)
                    .from(self.account)
                    .send()
                    .await?
            }
            action::Call::Swap(swap) => {
                self.router(swap.router)
                    .swapExactTokensForTokens(
                        swap.sell.amount,
                        swap.min_out.amount,
                        swap.path(),
                        swap.recipient,
                        swap.deadline.timestamp(),
                    )
                    .from(self.account)
                    .send()
                    .await?
            }
            action::Call::AddLiquidity(add) => {
                self.router(add.router)
                    .addLiquidity(
                        add.a.token.into(),
                        add.b.token.into(),
                        add.a.desired,
                        add.b.desired,
                        add.a.min,
                        add.b.min,
                        add.recipient,
                        add.deadline.timestamp(),
                    )
                    .from(self.account)
                    .send()
                    .await?
            }
        };
        let tx = eth::TxId(*pending.tx_hash());
        observe::broadcast(&call, tx);
        Ok(tx)
    }

    async fn confirm(&self, tx: eth::TxId) -> Result<(), Error> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx.0)
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await?;
        if receipt.status() {
            Ok(())
        } else {
            Err(Error::Reverted(tx))
        }
    }
}

impl fmt::Debug for Ethereum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Ethereum")
            .field("account", &self.account)
            .field("chain", &self.chain)
            .field("confirmations", &self.confirmations)
            .finish()
    }
}
