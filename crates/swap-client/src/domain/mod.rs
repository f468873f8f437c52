pub mod action;
pub mod eth;
pub mod liquidity;
pub mod orchestrator;
pub mod quote;
pub mod reconciler;
pub mod slippage;
pub mod time;

pub use {
    orchestrator::Orchestrator,
    reconciler::Reconciler,
    slippage::Tolerance,
};
