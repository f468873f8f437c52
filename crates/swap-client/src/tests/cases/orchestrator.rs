use {
    crate::{
        domain::{
            action::Call,
            eth,
            orchestrator::{Error, Failure, Intent, Kind, State},
            slippage::Tolerance,
            time::{self, Deadline},
        },
        infra::blockchain,
        tests::setup::{self, Gate, Gated, cat, ether, mew, tx},
    },
    mockall::{Sequence, predicate::eq},
    std::sync::Arc,
};

/// Allowance 0 and a spend of 10: the approval is sent and confirmed before
/// the swap is sent.
#[tokio::test]
async fn approves_before_swapping() {
    let mut chain = setup::chain();
    setup::allowances(&mut chain, eth::U256::ZERO);
    setup::doubling_router(&mut chain);

    let mut seq = Sequence::new();
    chain
        .expect_submit()
        .withf(setup::is_approval(&mew(), ether(10)))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(tx(1)));
    chain
        .expect_confirm()
        .with(eq(tx(1)))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    chain
        .expect_submit()
        .withf(|call| {
            matches!(
                call,
                Call::Swap(swap)
                    if swap.sell == mew().asset(ether(10))
                        // 20 quoted, at most 0.5% less accepted
                        && swap.min_out == cat().asset(ether(199) / eth::U256::from(10))
                        && swap.recipient == setup::ACCOUNT
                        && swap.router.0 == setup::ROUTER
            )
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(tx(2)));
    chain
        .expect_confirm()
        .with(eq(tx(2)))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let orchestrator = setup::orchestrator(Arc::new(chain), eth::ApprovalPolicy::Exact);
    let confirmed = orchestrator
        .submit(&setup::swap("10"), Tolerance::default())
        .await
        .unwrap();

    assert_eq!(confirmed.kind, Kind::Swap);
    assert_eq!(confirmed.approvals, vec![tx(1)]);
    assert_eq!(confirmed.tx, tx(2));
    assert_eq!(orchestrator.state(), State::Idle);
}

/// The deadline is taken when the swap is sent, 20 minutes ahead.
#[tokio::test]
async fn swap_deadline_is_set_at_submission() {
    let mut chain = setup::chain();
    setup::allowances(&mut chain, ether(10));
    setup::doubling_router(&mut chain);
    let deadline = Deadline::from(time::now() + chrono::Duration::minutes(20));
    chain
        .expect_submit()
        .withf(move |call| matches!(call, Call::Swap(swap) if swap.deadline == deadline))
        .times(1)
        .returning(|_| Ok(tx(1)));
    chain.expect_confirm().times(1).returning(|_| Ok(()));

    let orchestrator = setup::orchestrator(Arc::new(chain), eth::ApprovalPolicy::Exact);
    orchestrator
        .submit(&setup::swap("10"), Tolerance::default())
        .await
        .unwrap();
}

/// The router can't be asked: nothing is approved or sent.
#[tokio::test]
async fn unavailable_quote_blocks_submission() {
    let mut chain = setup::chain();
    chain
        .expect_amounts_out()
        .times(1)
        .returning(|_, _, _| Err(blockchain::Error::Node("timeout".to_owned())));

    let orchestrator = setup::orchestrator(Arc::new(chain), eth::ApprovalPolicy::Exact);
    let err = orchestrator
        .submit(&setup::swap("10"), Tolerance::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::QuoteUnavailable(_)));
    assert_eq!(orchestrator.state(), State::Idle);
}

#[tokio::test]
async fn skips_approval_when_allowance_covers_spend() {
    let mut chain = setup::chain();
    setup::allowances(&mut chain, ether(10));
    setup::doubling_router(&mut chain);
    chain
        .expect_submit()
        .withf(|call| matches!(call, Call::Swap(_)))
        .times(1)
        .returning(|_| Ok(tx(1)));
    chain.expect_confirm().times(1).returning(|_| Ok(()));

    let orchestrator = setup::orchestrator(Arc::new(chain), eth::ApprovalPolicy::Exact);
    let confirmed = orchestrator
        .submit(&setup::swap("10"), Tolerance::default())
        .await
        .unwrap();

    assert!(confirmed.approvals.is_empty());
}

#[tokio::test]
async fn unreadable_allowance_requires_approval() {
    let mut chain = setup::chain();
    chain
        .expect_allowance()
        .returning(|_, _| Err(blockchain::Error::Node("timeout".to_owned())));
    setup::doubling_router(&mut chain);
    let mut seq = Sequence::new();
    chain
        .expect_submit()
        .withf(setup::is_approval(&mew(), ether(1)))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(tx(1)));
    chain
        .expect_confirm()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    chain
        .expect_submit()
        .withf(|call| matches!(call, Call::Swap(_)))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(tx(2)));
    chain
        .expect_confirm()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let orchestrator = setup::orchestrator(Arc::new(chain), eth::ApprovalPolicy::Exact);
    orchestrator
        .submit(&setup::swap("1"), Tolerance::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn unlimited_policy_approves_max() {
    let mut chain = setup::chain();
    setup::allowances(&mut chain, eth::U256::ZERO);
    setup::doubling_router(&mut chain);
    chain
        .expect_submit()
        .withf(setup::is_approval(&mew(), eth::U256::MAX))
        .times(1)
        .returning(|_| Ok(tx(1)));
    chain
        .expect_submit()
        .withf(|call| matches!(call, Call::Swap(_)))
        .times(1)
        .returning(|_| Ok(tx(2)));
    chain.expect_confirm().times(2).returning(|_| Ok(()));

    let orchestrator = setup::orchestrator(Arc::new(chain), eth::ApprovalPolicy::Unlimited);
    orchestrator
        .submit(&setup::swap("1"), Tolerance::default())
        .await
        .unwrap();
}

/// Both tokens of a deposit need an approval. They are sent one after the
/// other, each confirmed before the next, and the deposit goes last.
#[tokio::test]
async fn deposit_approves_both_tokens_in_order() {
    let mut chain = setup::chain();
    setup::allowances(&mut chain, eth::U256::ZERO);

    let mut seq = Sequence::new();
    for (token, amount, n) in [(mew(), ether(100), 1), (cat(), ether(50), 2)] {
        chain
            .expect_submit()
            .withf(setup::is_approval(&token, amount))
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(tx(n)));
        chain
            .expect_confirm()
            .with(eq(tx(n)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
    }
    chain
        .expect_submit()
        .withf(|call| {
            matches!(
                call,
                Call::AddLiquidity(add)
                    if add.a.token == mew().address
                        && add.a.desired == ether(100)
                        && add.a.min == ether(995) / eth::U256::from(10)
                        && add.b.token == cat().address
                        && add.b.desired == ether(50)
                        && add.b.min == ether(4975) / eth::U256::from(100)
            )
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(tx(3)));
    chain
        .expect_confirm()
        .with(eq(tx(3)))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let orchestrator = setup::orchestrator(Arc::new(chain), eth::ApprovalPolicy::Exact);
    let confirmed = orchestrator
        .submit(
            &Intent::AddLiquidity {
                a: mew(),
                b: cat(),
                amount_a: "100".to_owned(),
                amount_b: "50".to_owned(),
            },
            Tolerance::default(),
        )
        .await
        .unwrap();

    assert_eq!(confirmed.kind, Kind::AddLiquidity);
    assert_eq!(confirmed.approvals, vec![tx(1), tx(2)]);
    assert_eq!(confirmed.tx, tx(3));
}

/// The node keeps reporting the old allowance after the approval confirmed.
/// Retrying the reverted swap must not approve a second time.
#[tokio::test]
async fn retry_after_revert_does_not_approve_again() {
    let mut chain = setup::chain();
    setup::allowances(&mut chain, eth::U256::ZERO);
    setup::doubling_router(&mut chain);
    chain
        .expect_submit()
        .withf(setup::is_approval(&mew(), ether(10)))
        .times(1)
        .returning(|_| Ok(tx(1)));
    chain
        .expect_submit()
        .withf(|call| matches!(call, Call::Swap(_)))
        .times(2)
        .returning({
            let mut n = 1;
            move |_| {
                n += 1;
                Ok(tx(n))
            }
        });
    chain
        .expect_confirm()
        .with(eq(tx(1)))
        .times(1)
        .returning(|_| Ok(()));
    chain
        .expect_confirm()
        .with(eq(tx(2)))
        .times(1)
        .returning(|tx| Err(blockchain::Error::Reverted(tx)));
    chain
        .expect_confirm()
        .with(eq(tx(3)))
        .times(1)
        .returning(|_| Ok(()));

    let orchestrator = setup::orchestrator(Arc::new(chain), eth::ApprovalPolicy::Exact);
    let err = orchestrator
        .submit(&setup::swap("10"), Tolerance::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Failed(Failure::ActionReverted(_))));
    assert!(matches!(
        orchestrator.state(),
        State::Failed(Failure::ActionReverted(_))
    ));

    let confirmed = orchestrator
        .submit(&setup::swap("10"), Tolerance::default())
        .await
        .unwrap();
    assert!(confirmed.approvals.is_empty());
    assert_eq!(confirmed.tx, tx(3));
    assert_eq!(orchestrator.state(), State::Idle);
}

#[tokio::test]
async fn rejected_approval_fails_and_can_be_reset() {
    let mut chain = setup::chain();
    setup::allowances(&mut chain, eth::U256::ZERO);
    setup::doubling_router(&mut chain);
    chain
        .expect_submit()
        .times(1)
        .returning(|_| Err(blockchain::Error::Rejected("user denied".to_owned())));

    let orchestrator = setup::orchestrator(Arc::new(chain), eth::ApprovalPolicy::Exact);
    let err = orchestrator
        .submit(&setup::swap("10"), Tolerance::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Failed(Failure::UserRejected)));
    assert_eq!(orchestrator.state(), State::Failed(Failure::UserRejected));
    orchestrator.reset();
    assert_eq!(orchestrator.state(), State::Idle);
}

#[tokio::test]
async fn failed_approval_never_sends_the_action() {
    let mut chain = setup::chain();
    setup::allowances(&mut chain, eth::U256::ZERO);
    setup::doubling_router(&mut chain);
    chain
        .expect_submit()
        .withf(|call| matches!(call, Call::Approve(_)))
        .times(1)
        .returning(|_| Ok(tx(1)));
    chain
        .expect_confirm()
        .times(1)
        .returning(|tx| Err(blockchain::Error::Reverted(tx)));

    let orchestrator = setup::orchestrator(Arc::new(chain), eth::ApprovalPolicy::Exact);
    let err = orchestrator
        .submit(&setup::swap("10"), Tolerance::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Failed(Failure::ApprovalFailed(_))));
}

#[tokio::test]
async fn rejects_submission_while_one_is_in_flight() {
    let mut chain = setup::chain();
    setup::allowances(&mut chain, ether(10));
    chain
        .expect_amounts_out()
        .times(1)
        .returning(|_, amount_in, _| Ok(vec![amount_in, amount_in]));
    chain.expect_submit().times(1).returning(|_| Ok(tx(1)));
    chain.expect_confirm().times(1).returning(|_| Ok(()));
    let chain = Gated::new(chain, Gate::Confirm);

    let orchestrator = Arc::new(setup::orchestrator(
        chain.clone(),
        eth::ApprovalPolicy::Exact,
    ));
    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move {
            orchestrator
                .submit(&setup::swap("1"), Tolerance::default())
                .await
        }
    });
    chain.entered.notified().await;

    assert_eq!(
        orchestrator.state(),
        State::ActionSubmitted {
            kind: Kind::Swap,
            tx: tx(1)
        }
    );
    let err = orchestrator
        .submit(&setup::swap("1"), Tolerance::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Busy));
    // A failure can't be acknowledged while the action is in flight.
    orchestrator.reset();
    assert!(orchestrator.state().is_busy());

    chain.release.notify_one();
    first.await.unwrap().unwrap();
    assert_eq!(orchestrator.state(), State::Idle);
}

#[tokio::test]
async fn invalid_inputs_leave_state_untouched() {
    let mut chain = setup::chain();
    chain
        .expect_amounts_out()
        .returning(|_, amount_in, _| Ok(vec![amount_in, eth::U256::ZERO]));
    chain.expect_submit().never();
    let orchestrator = setup::orchestrator(Arc::new(chain), eth::ApprovalPolicy::Exact);

    for amount in ["", "abc", "-1", "1e18", "0.0000000000000000001"] {
        let err = orchestrator
            .submit(&setup::swap(amount), Tolerance::default())
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::InvalidAmount(eth::InvalidAmount::Malformed(_))),
            "{amount}: {err:?}"
        );
    }
    assert!(matches!(
        orchestrator
            .submit(&setup::swap("0.0"), Tolerance::default())
            .await,
        Err(Error::InvalidAmount(eth::InvalidAmount::Zero))
    ));
    assert!(matches!(
        orchestrator
            .submit(
                &Intent::Swap {
                    sell: mew(),
                    buy: mew(),
                    amount: "1".to_owned(),
                },
                Tolerance::default()
            )
            .await,
        Err(Error::IdenticalTokens)
    ));
    assert!(matches!(
        orchestrator
            .submit(&setup::swap("1"), Tolerance::default())
            .await,
        Err(Error::NoLiquidity)
    ));
    assert_eq!(orchestrator.state(), State::Idle);
}
