//! Fixed point number handling for ERC-20 token amounts.

pub mod u256_ext;
pub mod units;

pub use units::{ParseError, format_units, from_fixed_point, to_fixed_point};
