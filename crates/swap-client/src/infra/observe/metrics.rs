/// Metrics for the swap client.
#[derive(Debug, Clone, prometheus_metric_storage::MetricStorage)]
pub struct Metrics {
    /// RPC requests sent to the node.
    #[metric(labels("method"))]
    pub rpc_requests: prometheus::IntCounterVec,
    /// Time spent waiting for RPC responses.
    #[metric(
        labels("result"),
        buckets(0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0)
    )]
    pub rpc_request_duration: prometheus::HistogramVec,
    /// The results of swap quotes.
    #[metric(labels("result"))]
    pub quotes: prometheus::IntCounterVec,
    /// Quotes computed for inputs that changed before they arrived.
    pub discarded_quotes: prometheus::IntCounter,
    /// Transactions broadcast, by call.
    #[metric(labels("call"))]
    pub transactions: prometheus::IntCounterVec,
    /// The results of submissions.
    #[metric(labels("kind", "result"))]
    pub submissions: prometheus::IntCounterVec,
    /// Submissions rejected because another one was in flight.
    pub busy: prometheus::IntCounter,
    /// Orchestrator state transitions.
    #[metric(labels("state"))]
    pub transitions: prometheus::IntCounterVec,
}

/// Setup the metrics registry.
pub fn init() {
    observe::metrics::setup_registry(Some("swap_client".to_owned()), None);
}

/// Get the metrics instance.
pub fn get() -> &'static Metrics {
    Metrics::instance(observe::metrics::get_storage_registry())
        .expect("unexpected error getting metrics instance")
}
