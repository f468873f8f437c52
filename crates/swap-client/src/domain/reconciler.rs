//! Keeps the displayed quote consistent with the current inputs and the
//! latest chain state.
//!
//! Inputs, the chain snapshot and the derived quote live together in one
//! [`View`] that is published on a watch channel. Every input change bumps
//! the view's generation; a quote computed for an older generation is thrown
//! away instead of being shown.

use {
    crate::{
        domain::{
            eth::{self, Token, TokenAmount},
            liquidity::{self, uniswap_v2},
            orchestrator::{self, Confirmed, Intent, Orchestrator},
            quote,
            slippage::{InvalidTolerance, Tolerance},
        },
        infra::{
            blockchain::{self, Chain},
            observe,
        },
    },
    futures::future::join_all,
    std::{collections::HashMap, sync::Arc, time::Duration},
    tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior},
};

/// Which form the inputs belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sell `amount_a` of `a` for `b`.
    Swap,
    /// Deposit `amount_a` of `a` and `amount_b` of `b`.
    Liquidity,
}

/// The user's inputs, exactly as entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs {
    pub mode: Mode,
    pub a: Token,
    pub b: Token,
    pub amount_a: String,
    pub amount_b: String,
    /// Whether `amount_b` was typed by the user. Suggestions never overwrite
    /// a typed amount.
    pub amount_b_edited: bool,
    pub tolerance: Tolerance,
}

impl Inputs {
    pub fn new(mode: Mode, a: Token, b: Token, tolerance: Tolerance) -> Self {
        Self {
            mode,
            a,
            b,
            amount_a: String::new(),
            amount_b: String::new(),
            amount_b_edited: false,
            tolerance,
        }
    }

    pub fn intent(&self) -> Intent {
        match self.mode {
            Mode::Swap => Intent::Swap {
                sell: self.a.clone(),
                buy: self.b.clone(),
                amount: self.amount_a.clone(),
            },
            Mode::Liquidity => Intent::AddLiquidity {
                a: self.a.clone(),
                b: self.b.clone(),
                amount_a: self.amount_a.clone(),
                amount_b: self.amount_b.clone(),
            },
        }
    }

    fn pair(&self) -> (eth::TokenAddress, eth::TokenAddress) {
        (self.a.address, self.b.address)
    }
}

/// The figures derived from the inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Quote {
    /// Constant product estimate from the last known reserves, shown until
    /// the router answers. Never used to bound a swap.
    Estimate { amount_out: TokenAmount },
    Swap {
        /// The router's quote for selling `amount_a`.
        amount_out: TokenAmount,
        /// The least the swap will accept at the current tolerance.
        min_out: TokenAmount,
    },
    Liquidity {
        /// The amount of `b` matching `amount_a` at the pool ratio.
        suggested_b: TokenAmount,
    },
}

impl Quote {
    /// Recomputes the minimum of a swap quote for `tolerance`.
    fn bound(&mut self, tolerance: Tolerance) {
        if let Quote::Swap {
            amount_out,
            min_out,
        } = self
        {
            min_out.value = tolerance.minimum_accepted(amount_out.value);
        }
    }
}

/// Chain state relevant to the current inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub balances: HashMap<eth::TokenAddress, eth::U256>,
    pub allowances: HashMap<eth::TokenAddress, eth::U256>,
    pub pool: Option<uniswap_v2::Pool>,
    /// The account's LP token balance in the pool.
    pub liquidity: Option<eth::U256>,
    /// Set when a transaction confirmed after this snapshot was taken.
    pub stale: bool,
}

impl Snapshot {
    /// Pool reserves in the order of the inputs, if the pool is known.
    pub fn reserves(&self, inputs: &Inputs) -> Option<uniswap_v2::Reserves> {
        self.pool?.reserves(inputs.a.address, inputs.b.address).ok()
    }
}

/// Everything a front end needs to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub generation: u64,
    pub inputs: Inputs,
    pub snapshot: Snapshot,
    pub quote: Option<Quote>,
    /// Why there is no quote for a non-empty amount.
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub router: eth::ContractAddress,
    pub pairs: liquidity::Pairs,
}

pub struct Reconciler {
    chain: Arc<dyn Chain>,
    config: Config,
    view: watch::Sender<View>,
}

impl Reconciler {
    pub fn new(chain: Arc<dyn Chain>, config: Config, inputs: Inputs) -> Self {
        Self {
            chain,
            config,
            view: watch::Sender::new(View {
                generation: 0,
                inputs,
                snapshot: Default::default(),
                quote: None,
                error: None,
            }),
        }
    }

    pub fn view(&self) -> View {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view.subscribe()
    }

    /// Sets the amount of `a` and re-derives the quote for it.
    pub async fn set_amount(&self, amount: &str) {
        self.edit(|inputs| {
            inputs.amount_a = amount.to_owned();
            if inputs.mode == Mode::Liquidity && !inputs.amount_b_edited {
                inputs.amount_b.clear();
            }
        });
        self.requote().await;
    }

    /// Sets the amount of `b` of a liquidity deposit. Clearing it lets the
    /// pool ratio suggest an amount again.
    pub async fn set_counter_amount(&self, amount: &str) {
        self.edit(|inputs| {
            inputs.amount_b = amount.to_owned();
            inputs.amount_b_edited = !amount.trim().is_empty();
        });
        self.requote().await;
    }

    /// Selects a new token pair. Reserves of the previous pair are dropped.
    pub async fn select(&self, a: Token, b: Token) {
        let changed = self.edit(|inputs| {
            inputs.a = a;
            inputs.b = b;
        });
        if changed {
            self.reload_pool().await;
        }
    }

    /// Swaps the roles of `a` and `b`. Entered amounts are cleared since they
    /// no longer refer to the same tokens.
    pub async fn switch_tokens(&self) {
        self.edit(|inputs| {
            std::mem::swap(&mut inputs.a, &mut inputs.b);
            inputs.amount_a.clear();
            inputs.amount_b.clear();
            inputs.amount_b_edited = false;
        });
        self.requote().await;
    }

    /// Parses and applies a new slippage tolerance. The minimum of a current
    /// swap quote is updated in place, no new quote is needed.
    pub fn set_tolerance(&self, tolerance: &str) -> Result<Tolerance, InvalidTolerance> {
        let tolerance = tolerance.parse::<Tolerance>()?;
        self.view.send_modify(|view| {
            view.inputs.tolerance = tolerance;
            if let Some(quote) = &mut view.quote {
                quote.bound(tolerance);
            }
        });
        Ok(tolerance)
    }

    /// Re-derives the quote for the current inputs. The result is only
    /// published if the inputs did not change in the meantime.
    pub async fn requote(&self) {
        let View {
            generation,
            inputs,
            snapshot,
            quote: current,
            ..
        } = self.view();

        let amount = match inputs.a.parse(&inputs.amount_a) {
            Ok(amount) if !amount.is_zero() => amount,
            Ok(_) => {
                self.publish(generation, Ok(None));
                return;
            }
            Err(_) if inputs.amount_a.trim().is_empty() => {
                self.publish(generation, Ok(None));
                return;
            }
            Err(err) => {
                self.publish(generation, Err(err.to_string()));
                return;
            }
        };

        let quote = match inputs.mode {
            Mode::Swap => {
                let estimate = snapshot
                    .reserves(&inputs)
                    .and_then(|reserves| reserves.estimated_amount_out(amount.value));
                if let (None, Some(estimate)) = (&current, estimate) {
                    self.publish(
                        generation,
                        Ok(Some(Quote::Estimate {
                            amount_out: inputs.b.amount(estimate),
                        })),
                    );
                }
                quote::swap(
                    &*self.chain,
                    self.config.router,
                    &inputs.a,
                    &inputs.b,
                    amount.value,
                )
                .await
                .map(|amount_out| Quote::Swap {
                    amount_out: inputs.b.amount(amount_out),
                    min_out: inputs
                        .b
                        .amount(inputs.tolerance.minimum_accepted(amount_out)),
                })
                .map_err(|err| {
                    observe::quote_failed(&err);
                    err.to_string()
                })
            }
            Mode::Liquidity => match snapshot.reserves(&inputs) {
                // Without a pool any ratio is accepted, nothing to suggest.
                None => {
                    self.publish(generation, Ok(None));
                    return;
                }
                Some(reserves) => reserves
                    .counter_amount(amount.value)
                    .map(|suggested| Quote::Liquidity {
                        suggested_b: inputs.b.amount(suggested),
                    })
                    .map_err(|err| err.to_string()),
            },
        };
        self.publish(generation, quote.map(Some));
    }

    /// Reads balances, allowances and the pool for the current token pair.
    /// Requotes if the reserves changed.
    ///
    /// Only a failed pool read fails the refresh. A balance or allowance that
    /// can't be read is left out of the snapshot, which makes it unknown.
    pub async fn refresh(&self) -> Result<(), blockchain::Error> {
        let View {
            generation, inputs, ..
        } = self.view();
        let owner = self.chain.account();
        let tokens = [inputs.a.address, inputs.b.address];

        let balances = join_all(tokens.map(|token| self.chain.balance(token, owner))).await;
        let allowances = join_all(tokens.map(|token| {
            self.chain.allowance(
                owner,
                eth::Spender {
                    address: self.config.router.0,
                    token,
                },
            )
        }))
        .await;
        let pool = self.pool(&inputs).await?;
        let liquidity = match &pool {
            Some(pool) => self
                .chain
                .balance(pool.address.0.into(), owner)
                .await
                .inspect_err(observe::refresh_failed)
                .ok(),
            None => None,
        };

        let mut snapshot = Snapshot {
            pool,
            liquidity,
            ..Default::default()
        };
        for (token, balance) in tokens.into_iter().zip(balances) {
            match balance {
                Ok(balance) => {
                    snapshot.balances.insert(token, balance);
                }
                Err(err) => observe::refresh_failed(&err),
            }
        }
        for (token, allowance) in tokens.into_iter().zip(allowances) {
            match allowance {
                Ok(allowance) => {
                    snapshot.allowances.insert(token, allowance.0.amount);
                }
                Err(err) => observe::refresh_failed(&err),
            }
        }

        let mut reserves_changed = false;
        let published = self.view.send_if_modified(|view| {
            if view.inputs.pair() != inputs.pair() {
                observe::snapshot_discarded(generation, view.generation);
                return false;
            }
            reserves_changed = view.snapshot.pool != snapshot.pool;
            view.snapshot = snapshot;
            true
        });
        if published {
            observe::refreshed(&self.view.borrow().snapshot);
        }
        if reserves_changed {
            self.requote().await;
        }
        Ok(())
    }

    /// Submits the current inputs. Once the action is confirmed the entered
    /// amounts are cleared and the chain state refreshed; on failure the
    /// inputs are kept for a retry.
    ///
    /// A deposit re-reads the pool first, so a suggested counter amount
    /// follows the reserves the router will see. The router re-quotes swaps
    /// on its own.
    pub async fn submit(
        &self,
        orchestrator: &Orchestrator,
    ) -> Result<Confirmed, orchestrator::Error> {
        if self.view().inputs.mode == Mode::Liquidity {
            self.refresh()
                .await
                .map_err(|err| orchestrator::Error::QuoteUnavailable(err.to_string()))?;
        }
        let inputs = self.view().inputs;
        let confirmed = orchestrator.submit(&inputs.intent(), inputs.tolerance).await?;

        self.edit(|inputs| {
            inputs.amount_a.clear();
            inputs.amount_b.clear();
            inputs.amount_b_edited = false;
        });
        self.view.send_modify(|view| view.snapshot.stale = true);
        if let Err(err) = self.refresh().await {
            observe::refresh_failed(&err);
        }
        Ok(confirmed)
    }

    /// Refreshes the chain state every `interval` until the returned
    /// subscription is dropped.
    pub fn poll(self: &Arc<Self>, interval: Duration) -> Subscription {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = this.refresh().await {
                    observe::refresh_failed(&err);
                }
            }
        });
        Subscription { handle }
    }

    async fn reload_pool(&self) {
        self.view.send_modify(|view| {
            view.snapshot.pool = None;
            view.snapshot.liquidity = None;
        });
        if let Err(err) = self.refresh().await {
            observe::refresh_failed(&err);
        }
        self.requote().await;
    }

    async fn pool(&self, inputs: &Inputs) -> Result<Option<uniswap_v2::Pool>, blockchain::Error> {
        let (a, b) = inputs.pair();
        match self.config.pairs.find(&*self.chain, a, b).await? {
            Some(pair) => Ok(Some(self.chain.pool(pair).await?)),
            None => Ok(None),
        }
    }

    /// Applies an input change. Bumps the generation and drops the current
    /// quote if anything changed.
    fn edit(&self, change: impl FnOnce(&mut Inputs)) -> bool {
        self.view.send_if_modified(|view| {
            let before = view.inputs.clone();
            change(&mut view.inputs);
            if view.inputs == before {
                return false;
            }
            view.generation += 1;
            view.quote = None;
            view.error = None;
            true
        })
    }

    /// Publishes a quote computed for `generation`. Returns `false` if the
    /// inputs changed since, in which case the quote is discarded.
    fn publish(&self, generation: u64, quote: Result<Option<Quote>, String>) -> bool {
        self.view.send_if_modified(|view| {
            if view.generation != generation {
                observe::quote_discarded(generation, view.generation);
                return false;
            }
            match quote {
                Ok(mut quote) => {
                    // The tolerance may have changed while the quote was
                    // computed without bumping the generation.
                    if let Some(quote) = &mut quote {
                        quote.bound(view.inputs.tolerance);
                    }
                    if let (Some(Quote::Liquidity { suggested_b }), false) =
                        (&quote, view.inputs.amount_b_edited)
                    {
                        view.inputs.amount_b = suggested_b.to_string();
                    }
                    view.quote = quote;
                    view.error = None;
                }
                Err(err) => {
                    view.quote = None;
                    view.error = Some(err);
                }
            }
            true
        })
    }
}

/// A running periodic refresh. Dropping it stops the refresh.
#[must_use = "dropping the subscription stops the refresh"]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
