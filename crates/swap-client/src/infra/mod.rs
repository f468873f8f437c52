pub mod blockchain;
pub mod cli;
pub mod config;
pub mod observe;

pub use {
    blockchain::{Chain, Ethereum},
    config::Config,
};
