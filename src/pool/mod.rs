/*
 * Uniswap V4 pool identity: pool keys, pool ids, ticks and hook permission flags
 */

mod permissions;
mod types;

pub use permissions::{HookPermissions, PERMISSION_NAMES};
pub use types::{derive_pool_id, validate_tick, OrderDirection, PoolId, PoolKey};

use ethers::types::U256;

pub const MIN_TICK: i32 = -887_272;
pub const MAX_TICK: i32 = 887_272;

pub const MIN_SQRT_PRICE: u64 = 4_295_128_739;
pub const MAX_SQRT_PRICE: &str = "1461446703485210103287273052203988822378723970342";

/// Ticks scanned by `check_positions` when the caller names none.
pub const DEFAULT_SCAN_TICKS: [i32; 5] = [-60, -1, 0, 1, 60];

/// Most permissive price limit for a swap in the given direction.
#[must_use]
pub fn sqrt_price_limit(direction: OrderDirection) -> U256 {
    match direction {
        OrderDirection::ZeroForOne => U256::from(MIN_SQRT_PRICE) + 1,
        OrderDirection::OneForZero => {
            U256::from_dec_str(MAX_SQRT_PRICE).unwrap_or_else(|_| U256::MAX) - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_limits_are_direction_specific() {
        let down = sqrt_price_limit(OrderDirection::ZeroForOne);
        let up = sqrt_price_limit(OrderDirection::OneForZero);

        assert_eq!(down, U256::from(4_295_128_740u64));
        assert_eq!(
            up,
            U256::from_dec_str("1461446703485210103287273052203988822378723970341").unwrap()
        );
        assert_ne!(down, up);
    }
}
