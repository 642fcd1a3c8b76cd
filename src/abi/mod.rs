/*
 * Calldata encoding and return-data decoding for the grid hook, the swap
 * router and standard ERC-20 tokens
 */

use ethers::{
    abi::{decode, encode, ParamType, Token},
    types::{Address, Bytes, I256, U256},
    utils::keccak256,
};

use crate::models::{GridHookError, Result};
use crate::pool::{HookPermissions, OrderDirection, PoolId, PoolKey, PERMISSION_NAMES};

pub const PLACE_ORDER: &str = "placeOrder((address,address,uint24,int24,address),int24,bool,uint256)";
pub const SWAP: &str =
    "swap((address,address,uint24,int24,address),(bool,int256,uint160),(bool,bool),bytes)";
pub const GET_POSITION_ID: &str = "getPositionId((address,address,uint24,int24,address),int24,bool)";
pub const PENDING_ORDERS: &str = "pendingOrders(bytes32,int24,bool)";
pub const CLAIMABLE_OUTPUT_TOKENS: &str = "claimableOutputTokens(uint256)";
pub const CLAIM_TOKENS_SUPPLY: &str = "claimTokensSupply(uint256)";
pub const GET_HOOK_PERMISSIONS: &str = "getHookPermissions()";
pub const BALANCE_OF: &str = "balanceOf(address)";
pub const NAME: &str = "name()";
pub const SYMBOL: &str = "symbol()";
pub const ALLOWANCE: &str = "allowance(address,address)";
pub const APPROVE: &str = "approve(address,uint256)";

#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn call_data(signature: &str, params: &[Token]) -> Bytes {
    let mut data = Vec::from(selector(signature));
    data.extend_from_slice(&encode(params));
    Bytes::from(data)
}

fn int24(value: i32) -> Token {
    Token::Int(I256::from(value).into_raw())
}

#[must_use]
pub fn place_order(key: &PoolKey, tick: i32, direction: OrderDirection, amount: U256) -> Bytes {
    call_data(
        PLACE_ORDER,
        &[
            key.to_token(),
            int24(tick),
            Token::Bool(direction.zero_for_one()),
            Token::Uint(amount),
        ],
    )
}

/// PoolSwapTest.swap with default test settings and empty hook data.
#[must_use]
pub fn swap(
    key: &PoolKey,
    direction: OrderDirection,
    amount_specified: I256,
    sqrt_price_limit_x96: U256,
) -> Bytes {
    let params = Token::Tuple(vec![
        Token::Bool(direction.zero_for_one()),
        Token::Int(amount_specified.into_raw()),
        Token::Uint(sqrt_price_limit_x96),
    ]);
    let test_settings = Token::Tuple(vec![Token::Bool(false), Token::Bool(false)]);

    call_data(
        SWAP,
        &[key.to_token(), params, test_settings, Token::Bytes(Vec::new())],
    )
}

#[must_use]
pub fn get_position_id(key: &PoolKey, tick: i32, direction: OrderDirection) -> Bytes {
    call_data(
        GET_POSITION_ID,
        &[key.to_token(), int24(tick), Token::Bool(direction.zero_for_one())],
    )
}

#[must_use]
pub fn pending_orders(pool_id: &PoolId, tick: i32, direction: OrderDirection) -> Bytes {
    call_data(
        PENDING_ORDERS,
        &[pool_id.to_token(), int24(tick), Token::Bool(direction.zero_for_one())],
    )
}

#[must_use]
pub fn claimable_output_tokens(position_id: U256) -> Bytes {
    call_data(CLAIMABLE_OUTPUT_TOKENS, &[Token::Uint(position_id)])
}

#[must_use]
pub fn claim_tokens_supply(position_id: U256) -> Bytes {
    call_data(CLAIM_TOKENS_SUPPLY, &[Token::Uint(position_id)])
}

#[must_use]
pub fn get_hook_permissions() -> Bytes {
    call_data(GET_HOOK_PERMISSIONS, &[])
}

#[must_use]
pub fn balance_of(owner: Address) -> Bytes {
    call_data(BALANCE_OF, &[Token::Address(owner)])
}

#[must_use]
pub fn name() -> Bytes {
    call_data(NAME, &[])
}

#[must_use]
pub fn symbol() -> Bytes {
    call_data(SYMBOL, &[])
}

#[must_use]
pub fn allowance(owner: Address, spender: Address) -> Bytes {
    call_data(ALLOWANCE, &[Token::Address(owner), Token::Address(spender)])
}

#[must_use]
pub fn approve(spender: Address, amount: U256) -> Bytes {
    call_data(APPROVE, &[Token::Address(spender), Token::Uint(amount)])
}

fn decode_single(kind: ParamType, data: &[u8], what: &str) -> Result<Token> {
    decode(&[kind], data)
        .map_err(|e| GridHookError::ContractError(format!("Failed to decode {what}: {e}")))?
        .into_iter()
        .next()
        .ok_or_else(|| GridHookError::ContractError(format!("Empty {what} response")))
}

pub fn decode_uint(data: &[u8], what: &str) -> Result<U256> {
    decode_single(ParamType::Uint(256), data, what)?
        .into_uint()
        .ok_or_else(|| GridHookError::ContractError(format!("Invalid {what} response")))
}

pub fn decode_string(data: &[u8], what: &str) -> Result<String> {
    decode_single(ParamType::String, data, what)?
        .into_string()
        .ok_or_else(|| GridHookError::ContractError(format!("Invalid {what} response")))
}

/// `Hooks.Permissions` is a static struct of bools, encoded as consecutive words.
pub fn decode_permissions(data: &[u8]) -> Result<HookPermissions> {
    let kinds = vec![ParamType::Bool; PERMISSION_NAMES.len()];
    let tokens = decode(&kinds, data)
        .map_err(|e| GridHookError::ContractError(format!("Failed to decode permissions: {e}")))?;

    let mut flags = [false; 14];
    for (slot, token) in flags.iter_mut().zip(tokens) {
        *slot = token.into_bool().ok_or_else(|| {
            GridHookError::ContractError("Invalid permissions response".to_string())
        })?;
    }
    Ok(HookPermissions::from_flags(flags))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PoolKey {
        PoolKey::from_strs(
            "0x0165878A594ca255338adfa4d48449f69242Eb8F",
            "0xa513E6E4b8f2a923D98304ec87F64353C4D5C853",
            3000,
            60,
            "0x9D71E6f99da38505b3c50cb0ec2ed754Ea13D040",
        )
        .unwrap()
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn selectors_match_deployed_contracts() {
        assert_eq!(hex(&selector(PLACE_ORDER)), "7e8941af");
        assert_eq!(hex(&selector(SWAP)), "2229d0b4");
        assert_eq!(hex(&selector(GET_POSITION_ID)), "fa59cb0c");
        assert_eq!(hex(&selector(PENDING_ORDERS)), "a2dc31b2");
        assert_eq!(hex(&selector(CLAIMABLE_OUTPUT_TOKENS)), "3bb76cc1");
        assert_eq!(hex(&selector(CLAIM_TOKENS_SUPPLY)), "b5a33914");
        assert_eq!(hex(&selector(GET_HOOK_PERMISSIONS)), "c4e833ce");
        assert_eq!(hex(&selector(BALANCE_OF)), "70a08231");
        assert_eq!(hex(&selector(ALLOWANCE)), "dd62ed3e");
        assert_eq!(hex(&selector(APPROVE)), "095ea7b3");
    }

    #[test]
    fn place_order_layout() {
        let amount = U256::exp10(18);
        let data = place_order(&key(), -60, OrderDirection::ZeroForOne, amount);

        // selector + five pool key words + tick + direction + amount
        assert_eq!(data.len(), 4 + 8 * 32);
        let words = &data[4..];
        assert_eq!(U256::from_big_endian(&words[2 * 32..3 * 32]), U256::from(3000));
        // int24 is sign-extended to a full word
        assert_eq!(words[5 * 32], 0xff);
        assert_eq!(
            I256::from_raw(U256::from_big_endian(&words[5 * 32..6 * 32])),
            I256::from(-60)
        );
        assert_eq!(U256::from_big_endian(&words[6 * 32..7 * 32]), U256::one());
        assert_eq!(U256::from_big_endian(&words[7 * 32..8 * 32]), amount);
    }

    #[test]
    fn swap_carries_negative_exact_input() {
        let amount = -I256::from(2_000_000_000_000_000_000i128);
        let data = swap(&key(), OrderDirection::OneForZero, amount, U256::from(7));

        assert_eq!(&data[..4], &selector(SWAP));
        let words = &data[4..];
        assert_eq!(U256::from_big_endian(&words[5 * 32..6 * 32]), U256::zero());
        assert_eq!(
            I256::from_raw(U256::from_big_endian(&words[6 * 32..7 * 32])),
            amount
        );
        assert_eq!(U256::from_big_endian(&words[7 * 32..8 * 32]), U256::from(7));
    }

    #[test]
    fn decodes_words() {
        let word = encode(&[Token::Uint(U256::from(42))]);
        assert_eq!(decode_uint(&word, "balance").unwrap(), U256::from(42));
        assert!(decode_uint(&[0u8; 3], "balance").is_err());

        let text = encode(&[Token::String("Mock Token".to_string())]);
        assert_eq!(decode_string(&text, "name").unwrap(), "Mock Token");
    }

    #[test]
    fn decodes_permission_struct() {
        let mut tokens = vec![Token::Bool(false); 14];
        tokens[1] = Token::Bool(true);
        tokens[7] = Token::Bool(true);
        let permissions = decode_permissions(&encode(&tokens)).unwrap();

        let hook: Address = "0x9D71E6f99da38505b3c50cb0ec2ed754Ea13D040".parse().unwrap();
        assert_eq!(permissions, HookPermissions::from_address(&hook));
    }
}
