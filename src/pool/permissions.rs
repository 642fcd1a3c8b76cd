/*
 * Hook permission flags as returned by getHookPermissions()
 */

use ethers::types::Address;

/// Field order of `Hooks.Permissions`.
pub const PERMISSION_NAMES: [&str; 14] = [
    "beforeInitialize",
    "afterInitialize",
    "beforeAddLiquidity",
    "afterAddLiquidity",
    "beforeRemoveLiquidity",
    "afterRemoveLiquidity",
    "beforeSwap",
    "afterSwap",
    "beforeDonate",
    "afterDonate",
    "beforeSwapReturnDelta",
    "afterSwapReturnDelta",
    "afterAddLiquidityReturnDelta",
    "afterRemoveLiquidityReturnDelta",
];

const FLAG_MASK: u16 = 0x3FFF;

/// 14-bit set laid out like the v4 hook address flags: `beforeInitialize` is
/// bit 13, `afterRemoveLiquidityReturnDelta` is bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HookPermissions(u16);

impl HookPermissions {
    #[must_use]
    pub fn from_flags(flags: [bool; 14]) -> Self {
        let bits = flags
            .iter()
            .enumerate()
            .filter(|(_, enabled)| **enabled)
            .fold(0u16, |acc, (index, _)| acc | Self::bit(index));
        Self(bits)
    }

    /// Permissions implied by the low bits of a deployed hook address.
    #[must_use]
    pub fn from_address(hook: &Address) -> Self {
        let bytes = hook.as_bytes();
        let low = u16::from_be_bytes([bytes[18], bytes[19]]);
        Self(low & FLAG_MASK)
    }

    #[must_use]
    pub fn bits(&self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn is_enabled(&self, index: usize) -> bool {
        index < PERMISSION_NAMES.len() && self.0 & Self::bit(index) != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        PERMISSION_NAMES
            .iter()
            .enumerate()
            .map(move |(index, name)| (*name, self.is_enabled(index)))
    }

    fn bit(index: usize) -> u16 {
        1 << (PERMISSION_NAMES.len() - 1 - index)
    }
}
