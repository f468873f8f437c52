//! Sequences the transactions of a swap or a liquidity deposit: approvals
//! first, one at a time and each waited for, then the action itself.

use {
    crate::{
        domain::{
            action::{self, Call},
            eth::{self, Token},
            quote,
            slippage::Tolerance,
            time::Deadline,
        },
        infra::{blockchain::Chain, observe},
    },
    futures::future::join_all,
    std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    },
    thiserror::Error,
    tokio::sync::watch,
};

mod state;

pub use state::{Failure, Kind, State};

#[derive(Debug, Clone)]
pub struct Config {
    pub router: eth::ContractAddress,
    pub approval: eth::ApprovalPolicy,
    /// How long after submission the router still accepts an action.
    pub deadline: Duration,
}

/// A submission as entered by the user. Amounts are kept as typed and only
/// parsed when submitting, so what gets sent always matches the current
/// input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Swap {
        sell: Token,
        buy: Token,
        amount: String,
    },
    AddLiquidity {
        a: Token,
        b: Token,
        amount_a: String,
        amount_b: String,
    },
}

/// A submission that went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmed {
    pub kind: Kind,
    pub approvals: Vec<eth::TxId>,
    pub tx: eth::TxId,
}

pub struct Orchestrator {
    chain: Arc<dyn Chain>,
    config: Config,
    state: watch::Sender<State>,
    /// Approvals confirmed since the last successful action. The node may
    /// still report the old allowance right after an approval confirmed.
    approved: Mutex<HashMap<eth::Spender, eth::U256>>,
}

impl Orchestrator {
    pub fn new(chain: Arc<dyn Chain>, config: Config) -> Self {
        Self {
            chain,
            config,
            state: watch::Sender::new(State::Idle),
            approved: Default::default(),
        }
    }

    pub fn state(&self) -> State {
        self.state.borrow().clone()
    }

    /// Every state change is published here.
    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Acknowledges a failure and returns to [`State::Idle`]. Does nothing
    /// while a submission is in flight.
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if !matches!(state, State::Failed(_)) {
                return false;
            }
            *state = State::Idle;
            true
        });
    }

    /// Validates the intent against fresh chain state, then sends the
    /// required approvals and the action.
    ///
    /// Validation errors are returned without touching the state. Once the
    /// first transaction is about to be signed, failures move the state to
    /// [`State::Failed`] and are returned as [`Error::Failed`].
    pub async fn submit(&self, intent: &Intent, tolerance: Tolerance) -> Result<Confirmed, Error> {
        if self.state.borrow().is_busy() {
            observe::busy();
            return Err(Error::Busy);
        }

        let plan = self.plan(intent, tolerance).await?;
        let approvals = self.approvals(&plan.required).await;
        let initial = match approvals.first() {
            Some(approval) => State::AwaitingApproval(approval.0.spender.token),
            None => State::AwaitingAction(plan.kind),
        };
        if !self.claim(initial) {
            observe::busy();
            return Err(Error::Busy);
        }

        match self.execute(&plan, approvals).await {
            Ok(confirmed) => {
                observe::confirmed(&confirmed);
                self.transition(State::Idle);
                Ok(confirmed)
            }
            Err(failure) => {
                observe::failed(plan.kind, &failure);
                self.transition(State::Failed(failure.clone()));
                Err(Error::Failed(failure))
            }
        }
    }

    async fn plan(&self, intent: &Intent, tolerance: Tolerance) -> Result<Plan, Error> {
        let router = self.config.router.0;
        match intent {
            Intent::Swap { sell, buy, amount } => {
                if sell.address == buy.address {
                    return Err(Error::IdenticalTokens);
                }
                let amount_in = sell.parse_positive(amount)?;
                let quoted =
                    quote::swap(&*self.chain, self.config.router, sell, buy, amount_in.value)
                        .await?;
                let min_out = tolerance.minimum_accepted(quoted);
                observe::quoted(sell, buy, amount_in.value, quoted, min_out);

                Ok(Plan {
                    kind: Kind::Swap,
                    required: vec![required(router, sell, amount_in.value)],
                    action: Action::Swap {
                        sell: sell.asset(amount_in.value),
                        min_out: buy.asset(min_out),
                    },
                })
            }
            Intent::AddLiquidity {
                a,
                b,
                amount_a,
                amount_b,
            } => {
                if a.address == b.address {
                    return Err(Error::IdenticalTokens);
                }
                let amount_a = a.parse_positive(amount_a)?.value;
                let amount_b = b.parse_positive(amount_b)?.value;
                let deposit = |token: &Token, desired| action::Deposit {
                    token: token.address,
                    desired,
                    min: tolerance.minimum_accepted(desired),
                };

                Ok(Plan {
                    kind: Kind::AddLiquidity,
                    required: vec![required(router, a, amount_a), required(router, b, amount_b)],
                    action: Action::AddLiquidity {
                        a: deposit(a, amount_a),
                        b: deposit(b, amount_b),
                    },
                })
            }
        }
    }

    /// The approvals still missing for the required allowances, in order. An
    /// allowance that can't be read counts as missing.
    async fn approvals(&self, required: &[eth::Required]) -> Vec<eth::Approval> {
        let owner = self.chain.account();
        let existing = join_all(required.iter().map(|required| async move {
            let spender = required.0.spender;
            self.chain
                .allowance(owner, spender)
                .await
                .inspect_err(|err| observe::allowance_unknown(&spender, err))
                .ok()
        }))
        .await;

        let approved = self.approved.lock().unwrap();
        required
            .iter()
            .zip(existing)
            .filter_map(|(required, existing)| {
                let existing = match (existing, approved.get(&required.0.spender)) {
                    (Some(existing), Some(approved)) if *approved > existing.0.amount => {
                        Some(eth::Existing(eth::Allowance {
                            amount: *approved,
                            ..existing.0
                        }))
                    }
                    (None, Some(approved)) => Some(eth::Existing(eth::Allowance {
                        spender: required.0.spender,
                        amount: *approved,
                    })),
                    (existing, _) => existing,
                };
                required.approval(existing.as_ref())
            })
            .map(|approval| self.config.approval.apply(approval))
            .collect()
    }

    async fn execute(
        &self,
        plan: &Plan,
        approvals: Vec<eth::Approval>,
    ) -> Result<Confirmed, Failure> {
        let mut approval_txs = Vec::with_capacity(approvals.len());
        for approval in approvals {
            let token = approval.0.spender.token;
            self.transition(State::AwaitingApproval(token));
            let tx = self
                .chain
                .submit(Call::Approve(approval))
                .await
                .map_err(Failure::approval)?;
            self.transition(State::ApprovalSubmitted { token, tx });
            self.chain.confirm(tx).await.map_err(Failure::approval)?;
            self.approved
                .lock()
                .unwrap()
                .insert(approval.0.spender, approval.0.amount);
            self.transition(State::ApprovalConfirmed(token));
            approval_txs.push(tx);
        }

        self.transition(State::AwaitingAction(plan.kind));
        let deadline = Deadline::from_now(self.config.deadline)
            .map_err(|err| Failure::ActionReverted(err.to_string()))?;
        let call = plan
            .action
            .call(self.config.router, self.chain.account(), deadline);
        let tx = self.chain.submit(call).await.map_err(Failure::action)?;
        self.transition(State::ActionSubmitted {
            kind: plan.kind,
            tx,
        });
        self.chain.confirm(tx).await.map_err(Failure::action)?;
        self.approved.lock().unwrap().clear();
        self.transition(State::ActionConfirmed {
            kind: plan.kind,
            tx,
        });

        Ok(Confirmed {
            kind: plan.kind,
            approvals: approval_txs,
            tx,
        })
    }

    /// Moves from an idle or failed state into `next`. Returns `false` if
    /// another submission got there first.
    fn claim(&self, next: State) -> bool {
        let mut claimed = false;
        self.state.send_if_modified(|state| {
            if state.is_busy() {
                return false;
            }
            observe::transition(state, &next);
            *state = next;
            claimed = true;
            true
        });
        claimed
    }

    fn transition(&self, next: State) {
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            observe::transition(state, &next);
            *state = next;
            true
        });
    }
}

fn required(router: eth::Address, token: &Token, amount: eth::U256) -> eth::Required {
    eth::Required(eth::Allowance {
        spender: eth::Spender {
            address: router,
            token: token.address,
        },
        amount,
    })
}

/// A validated submission.
#[derive(Debug)]
struct Plan {
    kind: Kind,
    required: Vec<eth::Required>,
    action: Action,
}

#[derive(Debug)]
enum Action {
    Swap {
        sell: eth::Asset,
        min_out: eth::Asset,
    },
    AddLiquidity {
        a: action::Deposit,
        b: action::Deposit,
    },
}

impl Action {
    fn call(
        &self,
        router: eth::ContractAddress,
        recipient: eth::Address,
        deadline: Deadline,
    ) -> Call {
        match *self {
            Action::Swap { sell, min_out } => Call::Swap(action::Swap {
                router,
                sell,
                min_out,
                recipient,
                deadline,
            }),
            Action::AddLiquidity { a, b } => Call::AddLiquidity(action::AddLiquidity {
                router,
                a,
                b,
                recipient,
                deadline,
            }),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] eth::InvalidAmount),
    #[error("cannot trade a token against itself")]
    IdenticalTokens,
    #[error("pool has no liquidity")]
    NoLiquidity,
    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),
    #[error("another action is in flight")]
    Busy,
    #[error(transparent)]
    Failed(#[from] Failure),
}

impl From<quote::Error> for Error {
    fn from(err: quote::Error) -> Self {
        match err {
            quote::Error::NoLiquidity => Self::NoLiquidity,
            quote::Error::Unavailable(err) => Self::QuoteUnavailable(err.to_string()),
        }
    }
}
