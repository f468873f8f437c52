//! This module implements the observability for the swap client. It exposes
//! functions which represent events that are meaningful to the system. These
//! functions are called when the corresponding events occur. They log the event
//! and update the metrics, if the event is worth measuring.

use {
    crate::{
        domain::{
            action::Call,
            eth::{self, Token},
            orchestrator::{Confirmed, Failure, Kind, State},
            quote,
            reconciler::Snapshot,
        },
        infra::blockchain,
    },
    alloy::transports::TransportError,
    std::time::Duration,
};

mod metrics;

/// Setup the observability.
pub fn init(config: &observe::Config) {
    observe::tracing::initialize(config);
    metrics::init();
}

/// Renders all collected metrics in the prometheus text format.
pub fn encode_metrics() -> String {
    observe::metrics::encode(observe::metrics::get_registry())
}

/// Observe that a configured token declares a different precision than
/// configured.
pub fn decimals_mismatch(token: &Token, actual: u8) {
    tracing::warn!(
        %token,
        address = %token.address,
        configured = token.decimals,
        actual,
        "configured decimals do not match the token contract"
    );
}

/// Observe that the precision of a configured token could not be verified.
pub fn decimals_unknown(token: &Token, err: &blockchain::Error) {
    tracing::warn!(%token, address = %token.address, ?err, "failed to read token decimals");
}

/// Observe RPC requests about to be sent, one entry per request of a batch.
pub fn rpc_request(methods: &[String]) {
    tracing::trace!(?methods, "executing request");
    for method in methods {
        metrics::get()
            .rpc_requests
            .with_label_values(&[method.as_str()])
            .inc();
    }
}

/// Observe the response to RPC requests.
pub fn rpc_response(methods: &[String], elapsed: Duration, err: Option<&TransportError>) {
    let result = match err {
        None => {
            tracing::trace!(?methods, ?elapsed, "received response");
            "success"
        }
        Some(err) => {
            tracing::debug!(?methods, ?elapsed, ?err, "request failed");
            "error"
        }
    };
    metrics::get()
        .rpc_request_duration
        .with_label_values(&[result])
        .observe(elapsed.as_secs_f64());
}

/// Observe a router quote used for a submission.
pub fn quoted(
    sell: &Token,
    buy: &Token,
    amount_in: eth::U256,
    quoted: eth::U256,
    min_out: eth::U256,
) {
    tracing::info!(
        %sell,
        %buy,
        amount_in = %sell.amount(amount_in),
        quoted = %buy.amount(quoted),
        min_out = %buy.amount(min_out),
        "quoted swap"
    );
    metrics::get().quotes.with_label_values(&["success"]).inc();
}

/// Observe that a quote could not be obtained.
pub fn quote_failed(err: &quote::Error) {
    tracing::warn!(?err, "failed to quote");
    let label = match err {
        quote::Error::NoLiquidity => "no_liquidity",
        quote::Error::Unavailable(_) => "unavailable",
    };
    metrics::get().quotes.with_label_values(&[label]).inc();
}

/// Observe that a quote arrived after its inputs changed and was dropped.
pub fn quote_discarded(generation: u64, current: u64) {
    tracing::debug!(generation, current, "discarded stale quote");
    metrics::get().discarded_quotes.inc();
}

/// Observe that chain state was fetched for a token pair that is no longer
/// selected.
pub fn snapshot_discarded(generation: u64, current: u64) {
    tracing::debug!(generation, current, "discarded stale snapshot");
}

/// Observe freshly fetched chain state.
pub fn refreshed(snapshot: &Snapshot) {
    tracing::debug!(?snapshot, "refreshed chain state");
}

/// Observe that reading chain state failed. Without a pool the previous
/// snapshot stays in place, other reads are left out as unknown.
pub fn refresh_failed(err: &blockchain::Error) {
    tracing::warn!(?err, "failed to refresh chain state");
}

/// Observe that an allowance could not be read and is treated as missing.
pub fn allowance_unknown(spender: &eth::Spender, err: &blockchain::Error) {
    tracing::warn!(?spender, ?err, "failed to read allowance, approval required");
}

/// Observe that a submission was rejected because another one is in flight.
pub fn busy() {
    tracing::info!("rejected submission: another action is in flight");
    metrics::get().busy.inc();
}

/// Observe an orchestrator state transition.
pub fn transition(from: &State, to: &State) {
    tracing::debug!(from = from.label(), to = to.label(), "{to}");
    metrics::get()
        .transitions
        .with_label_values(&[to.label()])
        .inc();
}

/// Observe that a transaction was broadcast.
pub fn broadcast(call: &Call, tx: eth::TxId) {
    tracing::info!(?tx, ?call, "broadcast transaction");
    metrics::get()
        .transactions
        .with_label_values(&[call.kind()])
        .inc();
}

/// Observe a confirmed submission.
pub fn confirmed(confirmed: &Confirmed) {
    tracing::info!(
        kind = confirmed.kind.as_str(),
        tx = ?confirmed.tx,
        approvals = ?confirmed.approvals,
        "confirmed"
    );
    metrics::get()
        .submissions
        .with_label_values(&[confirmed.kind.as_str(), "success"])
        .inc();
}

/// Observe a failed submission.
pub fn failed(kind: Kind, failure: &Failure) {
    tracing::warn!(kind = kind.as_str(), ?failure, "submission failed");
    metrics::get()
        .submissions
        .with_label_values(&[kind.as_str(), failure.label()])
        .inc();
}
