//! Extension trait for U256 arithmetic operations.

use alloy::primitives::{U256, U512};

/// Extension trait for U256 to add utility methods.
pub trait U256Ext: Sized {
    /// Computes `self * numerator / denominator` rounding down.
    ///
    /// The intermediate product is computed with 512 bits, so this only fails
    /// if `denominator` is `0` or the final result overflows 256 bits.
    fn checked_mul_div(&self, numerator: &Self, denominator: &Self) -> Option<Self>;
}

impl U256Ext for U256 {
    fn checked_mul_div(&self, numerator: &Self, denominator: &Self) -> Option<Self> {
        if denominator.is_zero() {
            return None;
        }

        // fast path when math in U256 doesn't overflow
        if let Some(product) = self.checked_mul(*numerator) {
            return Some(product / *denominator);
        }

        let div = (U512::from(*self) * U512::from(*numerator)) / U512::from(*denominator);

        let limbs = div.into_limbs();
        if limbs[4..].iter().any(|limb| *limb != 0) {
            return None;
        }

        Some(U256::from_limbs_slice(&limbs[..4]))
    }
}
