//! Scenarios that drive the orchestrator and the reconciler against a mocked
//! chain.

mod orchestrator;
mod reconciler;
