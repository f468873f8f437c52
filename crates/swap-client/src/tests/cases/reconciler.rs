use {
    crate::{
        domain::{
            action::{self, Call},
            eth,
            liquidity::uniswap_v2,
            orchestrator::{Error, Failure},
            reconciler::{Mode, Quote},
            time::{self, Deadline},
        },
        infra::blockchain,
        tests::setup::{self, Gate, Gated, cat, ether, mew, tx, weth},
    },
    maplit::hashmap,
    std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    },
};

fn swap_quote(amount_out: eth::U256, min_out: eth::U256) -> Option<Quote> {
    Some(Quote::Swap {
        amount_out: cat().amount(amount_out),
        min_out: cat().amount(min_out),
    })
}

/// A quote requested for "1" arrives after the amount changed to "2". Only
/// the quote for "2" may ever be shown.
#[tokio::test]
async fn late_quote_for_old_input_is_discarded() {
    let mut chain = setup::chain();
    setup::doubling_router(&mut chain);
    let chain = Gated::new(chain, Gate::Quote);
    let reconciler = Arc::new(setup::reconciler(chain.clone(), Mode::Swap));

    let first = tokio::spawn({
        let reconciler = reconciler.clone();
        async move { reconciler.set_amount("1").await }
    });
    chain.entered.notified().await;
    reconciler.set_amount("2").await;
    assert_eq!(
        reconciler.view().quote,
        swap_quote(ether(4), ether(398) / eth::U256::from(100))
    );

    chain.release.notify_one();
    first.await.unwrap();

    let view = reconciler.view();
    assert_eq!(view.inputs.amount_a, "2");
    assert_eq!(
        view.quote,
        swap_quote(ether(4), ether(398) / eth::U256::from(100))
    );
}

/// The tolerance changes to 3% while the router is asked. The published
/// minimum follows the new tolerance.
#[tokio::test]
async fn tolerance_change_during_quote_applies_to_minimum() {
    let mut chain = setup::chain();
    setup::doubling_router(&mut chain);
    let chain = Gated::new(chain, Gate::Quote);
    let reconciler = Arc::new(setup::reconciler(chain.clone(), Mode::Swap));

    let quote = tokio::spawn({
        let reconciler = reconciler.clone();
        async move { reconciler.set_amount("1").await }
    });
    chain.entered.notified().await;
    reconciler.set_tolerance("3").unwrap();
    chain.release.notify_one();
    quote.await.unwrap();

    let view = reconciler.view();
    assert_eq!(view.inputs.tolerance.bps(), 300);
    assert_eq!(
        view.quote,
        swap_quote(ether(2), ether(194) / eth::U256::from(100))
    );
}

#[tokio::test]
async fn empty_or_zero_amount_clears_quote() {
    let mut chain = setup::chain();
    setup::doubling_router(&mut chain);
    let reconciler = setup::reconciler(Arc::new(chain), Mode::Swap);

    reconciler.set_amount("1").await;
    assert!(reconciler.view().quote.is_some());
    reconciler.set_amount("").await;
    assert_eq!(reconciler.view().quote, None);
    assert_eq!(reconciler.view().error, None);

    reconciler.set_amount("1").await;
    reconciler.set_amount("0.00").await;
    assert_eq!(reconciler.view().quote, None);
    assert_eq!(reconciler.view().error, None);

    reconciler.set_amount("1.2.3").await;
    assert_eq!(reconciler.view().quote, None);
    assert!(reconciler.view().error.is_some());
}

#[tokio::test]
async fn tolerance_change_updates_minimum_in_place() {
    let mut chain = setup::chain();
    chain
        .expect_amounts_out()
        .times(1)
        .returning(|_, amount_in, _| Ok(vec![amount_in, ether(10)]));
    let reconciler = setup::reconciler(Arc::new(chain), Mode::Swap);

    reconciler.set_amount("1").await;
    assert_eq!(
        reconciler.view().quote,
        swap_quote(ether(10), ether(995) / eth::U256::from(100))
    );
    reconciler.set_tolerance("1%").unwrap();
    assert_eq!(
        reconciler.view().quote,
        swap_quote(ether(10), ether(99) / eth::U256::from(10))
    );
    assert!(reconciler.set_tolerance("0").is_err());
    assert!(reconciler.set_tolerance("100").is_err());
    assert_eq!(reconciler.view().inputs.tolerance.bps(), 100);
}

/// Reserves of 1000 MEW and 500 CAT suggest 50 CAT for 100 MEW, until the
/// user types an amount of their own.
#[tokio::test]
async fn deposit_suggests_counter_amount_from_reserves() {
    let mut chain = setup::chain();
    setup::pool(&mut chain);
    setup::allowances(&mut chain, eth::U256::ZERO);
    let reconciler = setup::reconciler(Arc::new(chain), Mode::Liquidity);
    reconciler.refresh().await.unwrap();

    reconciler.set_amount("100").await;
    let view = reconciler.view();
    let Some(Quote::Liquidity { suggested_b }) = view.quote else {
        panic!("expected a suggestion, got {:?}", view.quote);
    };
    assert_eq!(suggested_b.display(6), "50.000000");
    assert_eq!(view.inputs.amount_b, "50");

    reconciler.set_counter_amount("60").await;
    reconciler.set_amount("200").await;
    let view = reconciler.view();
    assert_eq!(view.inputs.amount_b, "60");
    assert_eq!(
        view.quote,
        Some(Quote::Liquidity {
            suggested_b: cat().amount(ether(100))
        })
    );

    // Clearing the counter amount lets the pool ratio fill it again.
    reconciler.set_counter_amount("").await;
    assert_eq!(reconciler.view().inputs.amount_b, "100");
}

#[tokio::test]
async fn arriving_reserves_trigger_a_requote() {
    let mut chain = setup::chain();
    setup::pool(&mut chain);
    setup::allowances(&mut chain, eth::U256::ZERO);
    let reconciler = setup::reconciler(Arc::new(chain), Mode::Liquidity);

    // Nothing to suggest before the pool is known.
    reconciler.set_amount("100").await;
    assert_eq!(reconciler.view().quote, None);
    assert_eq!(reconciler.view().inputs.amount_b, "");

    reconciler.refresh().await.unwrap();
    let view = reconciler.view();
    assert_eq!(
        view.quote,
        Some(Quote::Liquidity {
            suggested_b: cat().amount(ether(50))
        })
    );
    assert_eq!(view.inputs.amount_b, "50");
}

/// The pool moves from 1000 MEW / 500 CAT to 1:1 after 50 CAT were
/// suggested. The deposit is sized against the reserves read when
/// submitting, otherwise the router would revert on its minimums.
#[tokio::test]
async fn deposit_uses_reserves_read_at_submission() {
    let mut chain = setup::chain();
    setup::allowances(&mut chain, ether(1000));
    chain.expect_balance().returning(|_, _| Ok(ether(42)));
    let reads = AtomicUsize::new(0);
    chain.expect_pool().returning(move |pair| {
        let reserve_cat = match reads.fetch_add(1, Ordering::SeqCst) {
            0 => ether(500),
            _ => ether(1000),
        };
        Ok(uniswap_v2::Pool {
            address: pair,
            token0: cat().address,
            token1: mew().address,
            reserve0: reserve_cat,
            reserve1: ether(1000),
            timestamp: 0,
        })
    });
    let deposit = |token: &eth::Token| action::Deposit {
        token: token.address,
        desired: ether(100),
        min: ether(995) / eth::U256::from(10),
    };
    let expected = action::AddLiquidity {
        router: setup::ROUTER.into(),
        a: deposit(&mew()),
        b: deposit(&cat()),
        recipient: setup::ACCOUNT,
        deadline: Deadline::from(time::now() + chrono::Duration::minutes(20)),
    };
    chain
        .expect_submit()
        .withf(move |call| matches!(call, Call::AddLiquidity(add) if *add == expected))
        .times(1)
        .returning(|_| Ok(tx(1)));
    chain.expect_confirm().times(1).returning(|_| Ok(()));
    let chain = Arc::new(chain);

    let reconciler = setup::reconciler(chain.clone(), Mode::Liquidity);
    let orchestrator = setup::orchestrator(chain, eth::ApprovalPolicy::Exact);
    reconciler.refresh().await.unwrap();
    reconciler.set_amount("100").await;
    assert_eq!(reconciler.view().inputs.amount_b, "50");

    reconciler.submit(&orchestrator).await.unwrap();
    assert_eq!(reconciler.view().inputs.amount_b, "");
}

/// A refresh for MEW/CAT still in flight when WETH gets selected must not
/// overwrite the state of the new pair.
#[tokio::test]
async fn selecting_a_pair_discards_state_of_the_previous_one() {
    let mut chain = setup::chain();
    setup::allowances(&mut chain, eth::U256::ZERO);
    chain.expect_balance().returning(|_, _| Ok(ether(42)));
    chain
        .expect_pair()
        .times(1)
        .returning(|_, _, _| Ok(Some(setup::WETH_PAIR.into())));
    chain.expect_pool().returning(|pair| {
        let other = if pair.0 == setup::PAIR { cat() } else { weth() };
        Ok(uniswap_v2::Pool {
            address: pair,
            token0: other.address,
            token1: mew().address,
            reserve0: ether(500),
            reserve1: ether(1000),
            timestamp: 0,
        })
    });
    let chain = Gated::new(chain, Gate::Pool);
    let reconciler = Arc::new(setup::reconciler(chain.clone(), Mode::Liquidity));

    let stale = tokio::spawn({
        let reconciler = reconciler.clone();
        async move { reconciler.refresh().await }
    });
    chain.entered.notified().await;
    reconciler.select(mew(), weth()).await;
    let weth_pair = eth::ContractAddress::from(setup::WETH_PAIR);
    assert_eq!(
        reconciler.view().snapshot.pool.map(|pool| pool.address),
        Some(weth_pair)
    );

    chain.release.notify_one();
    stale.await.unwrap().unwrap();
    let view = reconciler.view();
    assert_eq!(view.inputs.b, weth());
    assert_eq!(view.snapshot.pool.map(|pool| pool.address), Some(weth_pair));
}

#[tokio::test]
async fn unreadable_allowance_is_left_unknown() {
    let mut chain = setup::chain();
    setup::pool(&mut chain);
    chain.expect_allowance().returning(|_, spender| {
        if spender.token == mew().address {
            Err(blockchain::Error::Node("timeout".to_owned()))
        } else {
            Ok(eth::Allowance {
                spender,
                amount: ether(7),
            }
            .into())
        }
    });
    let reconciler = setup::reconciler(Arc::new(chain), Mode::Liquidity);
    reconciler.refresh().await.unwrap();

    let snapshot = reconciler.view().snapshot;
    assert_eq!(snapshot.allowances, hashmap! { cat().address => ether(7) });
    assert_eq!(snapshot.balances.len(), 2);
    assert_eq!(snapshot.liquidity, Some(ether(42)));
    assert!(snapshot.pool.is_some());
}

#[tokio::test]
async fn switching_tokens_clears_amounts() {
    let mut chain = setup::chain();
    setup::doubling_router(&mut chain);
    let reconciler = setup::reconciler(Arc::new(chain), Mode::Swap);

    reconciler.set_amount("3").await;
    let before = reconciler.view().generation;
    reconciler.switch_tokens().await;

    let view = reconciler.view();
    assert_eq!(view.inputs.a, cat());
    assert_eq!(view.inputs.b, mew());
    assert_eq!(view.inputs.amount_a, "");
    assert_eq!(view.quote, None);
    assert!(view.generation > before);
}

/// Before the router answers, the constant product estimate from the known
/// reserves is shown.
#[tokio::test]
async fn estimate_is_shown_until_router_answers() {
    let mut chain = setup::chain();
    setup::pool(&mut chain);
    setup::allowances(&mut chain, eth::U256::ZERO);
    chain
        .expect_amounts_out()
        .returning(|_, amount_in, _| Ok(vec![amount_in, ether(49)]));
    let chain = Gated::new(chain, Gate::Quote);
    let reconciler = Arc::new(setup::reconciler(chain.clone(), Mode::Swap));
    reconciler.refresh().await.unwrap();

    let quote = tokio::spawn({
        let reconciler = reconciler.clone();
        async move { reconciler.set_amount("100").await }
    });
    chain.entered.notified().await;
    let Some(Quote::Estimate { amount_out }) = reconciler.view().quote else {
        panic!("expected an estimate");
    };
    // 100 MEW into 1000 MEW / 500 CAT with the 0.3% fee.
    assert_eq!(amount_out.display(4), "45.3305");

    chain.release.notify_one();
    quote.await.unwrap();
    assert!(matches!(
        reconciler.view().quote,
        Some(Quote::Swap { amount_out, .. }) if amount_out.value == ether(49)
    ));
}

#[tokio::test]
async fn confirmed_submission_clears_amounts_and_refreshes() {
    let mut chain = setup::chain();
    setup::doubling_router(&mut chain);
    setup::allowances(&mut chain, ether(100));
    chain.expect_pool().returning(|pair| {
        Ok(uniswap_v2::Pool {
            address: pair,
            token0: cat().address,
            token1: mew().address,
            reserve0: ether(500),
            reserve1: ether(1000),
            timestamp: 0,
        })
    });
    // Every read returns a new balance: 0 and 1 for the tokens, 2 for the
    // LP token.
    chain.expect_balance().returning({
        let mut reads = 0u64..;
        move |_, _| Ok(eth::U256::from(reads.next().unwrap()))
    });
    chain
        .expect_submit()
        .withf(|call| matches!(call, Call::Swap(_)))
        .times(1)
        .returning(|_| Ok(tx(1)));
    chain.expect_confirm().times(1).returning(|_| Ok(()));
    let chain = Arc::new(chain);

    let reconciler = setup::reconciler(chain.clone(), Mode::Swap);
    let orchestrator = setup::orchestrator(chain, eth::ApprovalPolicy::Exact);
    reconciler.set_amount("1").await;
    reconciler.submit(&orchestrator).await.unwrap();

    let view = reconciler.view();
    assert_eq!(view.inputs.amount_a, "");
    assert_eq!(view.quote, None);
    assert!(!view.snapshot.stale);
    assert_eq!(
        view.snapshot.balances,
        hashmap! {
            mew().address => eth::U256::from(0),
            cat().address => eth::U256::from(1),
        }
    );
    assert_eq!(view.snapshot.liquidity, Some(eth::U256::from(2)));
}

#[tokio::test]
async fn failed_submission_keeps_amounts() {
    let mut chain = setup::chain();
    setup::doubling_router(&mut chain);
    setup::allowances(&mut chain, ether(100));
    chain
        .expect_submit()
        .times(1)
        .returning(|_| Err(blockchain::Error::Rejected("user denied".to_owned())));
    let chain = Arc::new(chain);

    let reconciler = setup::reconciler(chain.clone(), Mode::Swap);
    let orchestrator = setup::orchestrator(chain, eth::ApprovalPolicy::Exact);
    reconciler.set_amount("1").await;
    let err = reconciler.submit(&orchestrator).await.unwrap_err();

    assert!(matches!(err, Error::Failed(Failure::UserRejected)));
    assert_eq!(reconciler.view().inputs.amount_a, "1");
    assert!(reconciler.view().quote.is_some());
}

#[tokio::test(start_paused = true)]
async fn polling_stops_when_unsubscribed() {
    let mut chain = setup::chain();
    setup::allowances(&mut chain, eth::U256::ZERO);
    chain.expect_balance().returning(|_, _| Ok(eth::U256::ZERO));
    let refreshes = Arc::new(AtomicUsize::new(0));
    chain.expect_pool().returning({
        let refreshes = refreshes.clone();
        move |pair| {
            refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(uniswap_v2::Pool {
                address: pair,
                token0: cat().address,
                token1: mew().address,
                reserve0: ether(1),
                reserve1: ether(1),
                timestamp: 0,
            })
        }
    });
    let reconciler = Arc::new(setup::reconciler(Arc::new(chain), Mode::Liquidity));

    let subscription = reconciler.poll(Duration::from_secs(15));
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(refreshes.load(Ordering::SeqCst), 3);

    subscription.unsubscribe();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(refreshes.load(Ordering::SeqCst), 3);
}
