/*
 * Pool key, pool id and order direction
 */

use ethers::{
    abi::{encode, Token},
    types::{Address, H256, I256, U256},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MAX_TICK, MIN_TICK};
use crate::models::{GridHookError, Result};
use crate::utils::parse_address;

const MAX_UINT24: u32 = 0x00FF_FFFF;
const MAX_TICK_SPACING: i32 = 32_767;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub currency0: Address,
    pub currency1: Address,
    pub fee: u32,
    pub tick_spacing: i32,
    pub hooks: Address,
}

impl PoolKey {
    pub fn new(
        currency0: Address,
        currency1: Address,
        fee: u32,
        tick_spacing: i32,
        hooks: Address,
    ) -> Result<Self> {
        if currency0 == currency1 {
            return Err(GridHookError::ValidationError(format!(
                "currency0 and currency1 must differ, both are {currency0:?}"
            )));
        }
        if currency0 > currency1 {
            return Err(GridHookError::ValidationError(format!(
                "currencies must be sorted: {currency0:?} is not below {currency1:?}"
            )));
        }
        if fee > MAX_UINT24 {
            return Err(GridHookError::ValidationError(format!(
                "fee {fee} does not fit in uint24"
            )));
        }
        if !(1..=MAX_TICK_SPACING).contains(&tick_spacing) {
            return Err(GridHookError::ValidationError(format!(
                "tick spacing must be within 1..={MAX_TICK_SPACING}, got {tick_spacing}"
            )));
        }

        Ok(Self {
            currency0,
            currency1,
            fee,
            tick_spacing,
            hooks,
        })
    }

    pub fn from_strs(
        currency0: &str,
        currency1: &str,
        fee: u32,
        tick_spacing: i32,
        hooks: &str,
    ) -> Result<Self> {
        Self::new(
            parse_address(currency0)?,
            parse_address(currency1)?,
            fee,
            tick_spacing,
            parse_address(hooks)?,
        )
    }

    /// ABI tuple `(address,address,uint24,int24,address)`.
    #[must_use]
    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Address(self.currency0),
            Token::Address(self.currency1),
            Token::Uint(U256::from(self.fee)),
            Token::Int(I256::from(self.tick_spacing).into_raw()),
            Token::Address(self.hooks),
        ])
    }

    #[must_use]
    pub fn to_id(&self) -> PoolId {
        derive_pool_id(self)
    }

    #[must_use]
    pub fn input_currency(&self, direction: OrderDirection) -> Address {
        match direction {
            OrderDirection::ZeroForOne => self.currency0,
            OrderDirection::OneForZero => self.currency1,
        }
    }
}

/// keccak256(abi.encode(poolKey)), the same derivation PoolIdLibrary uses on chain.
#[must_use]
pub fn derive_pool_id(key: &PoolKey) -> PoolId {
    let encoded = encode(&[
        Token::Address(key.currency0),
        Token::Address(key.currency1),
        Token::Uint(U256::from(key.fee)),
        Token::Int(I256::from(key.tick_spacing).into_raw()),
        Token::Address(key.hooks),
    ]);

    PoolId(keccak256(encoded))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolId(pub [u8; 32]);

impl PoolId {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn to_token(&self) -> Token {
        Token::FixedBytes(self.0.to_vec())
    }
}

impl From<PoolId> for H256 {
    fn from(id: PoolId) -> Self {
        H256::from(id.0)
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// `true` on the wire means selling token0 for token1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    ZeroForOne,
    OneForZero,
}

impl OrderDirection {
    pub const BOTH: [OrderDirection; 2] = [OrderDirection::ZeroForOne, OrderDirection::OneForZero];

    #[must_use]
    pub fn from_zero_for_one(zero_for_one: bool) -> Self {
        if zero_for_one {
            OrderDirection::ZeroForOne
        } else {
            OrderDirection::OneForZero
        }
    }

    #[must_use]
    pub fn zero_for_one(self) -> bool {
        matches!(self, OrderDirection::ZeroForOne)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            OrderDirection::ZeroForOne => "sell token0",
            OrderDirection::OneForZero => "sell token1",
        }
    }
}

/// Rejects ticks outside the representable price range. Alignment to the
/// pool's tick spacing is left to the hook.
pub fn validate_tick(tick: i64) -> Result<i32> {
    if tick < i64::from(MIN_TICK) || tick > i64::from(MAX_TICK) {
        return Err(GridHookError::ValidationError(format!(
            "tick {tick} is outside [{MIN_TICK}, {MAX_TICK}]"
        )));
    }
    i32::try_from(tick)
        .map_err(|e| GridHookError::ValidationError(format!("tick {tick} out of range: {e}")))
}
