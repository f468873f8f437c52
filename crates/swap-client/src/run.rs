use {
    crate::{
        domain::{
            eth::Token,
            orchestrator::Orchestrator,
            reconciler::{Inputs, Mode, Quote, Reconciler, View},
        },
        infra::{
            self,
            blockchain::{Chain, Ethereum},
            cli,
            config,
            observe,
        },
    },
    anyhow::{Context, Result, anyhow},
    clap::Parser,
    futures::future::join_all,
    std::sync::Arc,
};

pub async fn main() {
    if let Err(err) = run(std::env::args()).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

/// Parses the arguments, connects to the node and runs the requested command.
pub async fn run(args: impl Iterator<Item = String>) -> Result<()> {
    let args = cli::Args::parse_from(args);
    observe::init(&::observe::Config::new(
        &args.log,
        args.stderr_threshold,
        args.use_json_logs,
    ));

    let eth = Ethereum::new(&args.node_url, args.private_key)
        .await
        .context("failed to connect to the node")?;
    let config = config::file::load(eth.chain(), &args.config).await;
    let eth = eth.with_confirmations(config.confirmations);
    check_decimals(&eth, &config).await;
    tracing::info!(?eth, "connected");
    let chain: Arc<dyn Chain> = Arc::new(eth);

    let result = command(args.command, chain, &config).await;
    if args.print_metrics {
        eprint!("{}", observe::encode_metrics());
    }
    result
}

async fn command(
    command: cli::Command,
    chain: Arc<dyn Chain>,
    config: &infra::Config,
) -> Result<()> {
    match command {
        cli::Command::Balances => balances(&*chain, config).await,
        cli::Command::Pool { a, b } => {
            pool(chain, config, token(config, &a)?, token(config, &b)?).await
        }
        cli::Command::Quote {
            sell,
            buy,
            amount,
            slippage,
        } => {
            let inputs = Inputs::new(
                Mode::Swap,
                token(config, &sell)?.clone(),
                token(config, &buy)?.clone(),
                slippage.unwrap_or(config.slippage),
            );
            let reconciler = Reconciler::new(chain, config.reconciler(), inputs);
            reconciler.set_amount(&amount).await;
            print_quote(&reconciler.view())
        }
        cli::Command::Swap {
            sell,
            buy,
            amount,
            slippage,
        } => {
            let inputs = Inputs::new(
                Mode::Swap,
                token(config, &sell)?.clone(),
                token(config, &buy)?.clone(),
                slippage.unwrap_or(config.slippage),
            );
            submit(chain, config, inputs, &amount, None).await
        }
        cli::Command::AddLiquidity {
            a,
            b,
            amount_a,
            amount_b,
            slippage,
        } => {
            let inputs = Inputs::new(
                Mode::Liquidity,
                token(config, &a)?.clone(),
                token(config, &b)?.clone(),
                slippage.unwrap_or(config.slippage),
            );
            submit(chain, config, inputs, &amount_a, amount_b.as_deref()).await
        }
        cli::Command::Watch {
            sell,
            buy,
            amount,
            slippage,
        } => {
            let inputs = Inputs::new(
                Mode::Swap,
                token(config, &sell)?.clone(),
                token(config, &buy)?.clone(),
                slippage.unwrap_or(config.slippage),
            );
            watch(chain, config, inputs, &amount).await
        }
    }
}

fn token<'a>(config: &'a infra::Config, token: &str) -> Result<&'a Token> {
    config
        .token(token)
        .ok_or_else(|| anyhow!("unknown token {token}"))
}

/// Warns about tokens whose configured precision differs from what the
/// contract declares. Amounts of such tokens would be off by orders of
/// magnitude.
async fn check_decimals(eth: &Ethereum, config: &infra::Config) {
    let decimals = join_all(config.tokens.iter().map(|token| eth.decimals(token.address))).await;
    for (token, decimals) in config.tokens.iter().zip(decimals) {
        match decimals {
            Ok(decimals) if decimals != token.decimals => {
                observe::decimals_mismatch(token, decimals)
            }
            Ok(_) => (),
            Err(err) => observe::decimals_unknown(token, &err),
        }
    }
}

async fn balances(chain: &dyn Chain, config: &infra::Config) -> Result<()> {
    let account = chain.account();
    let balances = join_all(
        config
            .tokens
            .iter()
            .map(|token| chain.balance(token.address, account)),
    )
    .await;
    println!("account {account}");
    for (token, balance) in config.tokens.iter().zip(balances) {
        let balance = balance.with_context(|| format!("failed to read {token} balance"))?;
        println!("{:>10} {}", token.symbol, token.amount(balance).display(4));
    }
    Ok(())
}

async fn pool(
    chain: Arc<dyn Chain>,
    config: &infra::Config,
    a: &Token,
    b: &Token,
) -> Result<()> {
    let inputs = Inputs::new(Mode::Liquidity, a.clone(), b.clone(), config.slippage);
    let reconciler = Reconciler::new(chain, config.reconciler(), inputs);
    reconciler.refresh().await?;

    let View {
        inputs, snapshot, ..
    } = reconciler.view();
    let (Some(pool), Some(reserves)) = (snapshot.pool, snapshot.reserves(&inputs)) else {
        println!("no {a}/{b} pair, the first deposit sets the price");
        return Ok(());
    };
    println!("pair {}", pool.address);
    println!("{:>10} {}", a.symbol, a.amount(reserves.a).display(4));
    println!("{:>10} {}", b.symbol, b.amount(reserves.b).display(4));
    let one = number::to_fixed_point("1", a.decimals)?;
    if let Ok(price) = reserves.counter_amount(one) {
        println!("1 {a} = {} {b}", b.amount(price).display(6));
    }
    if let Some(liquidity) = snapshot.liquidity {
        println!("{:>10} {}", "LP", number::format_units(liquidity, 18, 4));
    }
    Ok(())
}

/// Fills in the inputs, shows what is about to be submitted and submits it
/// while reporting progress.
async fn submit(
    chain: Arc<dyn Chain>,
    config: &infra::Config,
    inputs: Inputs,
    amount_a: &str,
    amount_b: Option<&str>,
) -> Result<()> {
    let reconciler = Reconciler::new(chain.clone(), config.reconciler(), inputs);
    reconciler.refresh().await?;
    reconciler.set_amount(amount_a).await;
    if let Some(amount_b) = amount_b {
        reconciler.set_counter_amount(amount_b).await;
    }
    let view = reconciler.view();
    if let Some(error) = view.error {
        return Err(anyhow!(error));
    }
    match view.inputs.mode {
        Mode::Swap => print_quote(&reconciler.view())?,
        Mode::Liquidity if view.inputs.amount_b.is_empty() => {
            return Err(anyhow!(
                "no {}/{} pool yet, the amount of {} is required",
                view.inputs.a,
                view.inputs.b,
                view.inputs.b
            ));
        }
        Mode::Liquidity => println!(
            "depositing {} {} and {} {}",
            view.inputs.amount_a, view.inputs.a, view.inputs.amount_b, view.inputs.b
        ),
    }

    let orchestrator = Orchestrator::new(chain, config.orchestrator());
    let mut states = orchestrator.subscribe();
    let progress = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            println!("{}", *states.borrow_and_update());
        }
    });
    let result = reconciler.submit(&orchestrator).await;
    progress.abort();

    let confirmed = result?;
    println!("confirmed {}", confirmed.tx);
    for token in [&view.inputs.a, &view.inputs.b] {
        if let Some(balance) = reconciler.view().snapshot.balances.get(&token.address) {
            println!("{:>10} {}", token.symbol, token.amount(*balance).display(4));
        }
    }
    Ok(())
}

async fn watch(
    chain: Arc<dyn Chain>,
    config: &infra::Config,
    inputs: Inputs,
    amount: &str,
) -> Result<()> {
    let reconciler = Arc::new(Reconciler::new(chain, config.reconciler(), inputs));
    let mut views = reconciler.subscribe();
    reconciler.set_amount(amount).await;
    let subscription = reconciler.poll(config.refresh_interval);

    let mut last = None;
    loop {
        let quote = {
            let view = views.borrow_and_update();
            (view.quote.clone(), view.error.clone())
        };
        if last.as_ref() != Some(&quote) {
            if let Err(err) = print_quote(&reconciler.view()) {
                println!("{err}");
            }
            last = Some(quote);
        }
        tokio::select! {
            changed = views.changed() => changed?,
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    subscription.unsubscribe();
    Ok(())
}

fn print_quote(view: &View) -> Result<()> {
    let inputs = &view.inputs;
    match (&view.quote, &view.error) {
        (Some(Quote::Swap { amount_out, min_out }), _) => {
            println!(
                "{} {} -> {} {} (minimum {} at {} slippage)",
                inputs.amount_a,
                inputs.a,
                amount_out.display(6),
                inputs.b,
                min_out.display(6),
                inputs.tolerance,
            );
            Ok(())
        }
        (Some(Quote::Estimate { amount_out }), _) => {
            println!(
                "{} {} -> ~{} {} (estimate)",
                inputs.amount_a,
                inputs.a,
                amount_out.display(6),
                inputs.b,
            );
            Ok(())
        }
        (Some(Quote::Liquidity { suggested_b }), _) => {
            println!(
                "{} {} matches {} {}",
                inputs.amount_a,
                inputs.a,
                suggested_b.display(6),
                inputs.b
            );
            Ok(())
        }
        (None, Some(error)) => Err(anyhow!("no quote: {error}")),
        (None, None) => Err(anyhow!("no quote: enter a positive amount")),
    }
}
