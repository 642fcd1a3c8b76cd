#![allow(dead_code)]

use async_trait::async_trait;
use ethers::abi::{decode, encode, ParamType, Token};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, H256, I256, U256, U64};
use ethers::utils::keccak256;
use gridhook_agent::abi;
use gridhook_agent::config::Config;
use gridhook_agent::models::{GridHookError, Result};
use gridhook_agent::pool::HookPermissions;
use gridhook_agent::rpc::ChainClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const SIGNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const GRID_HOOK: &str = "0x9D71E6f99da38505b3c50cb0ec2ed754Ea13D040";
pub const SWAP_ROUTER: &str = "0xDc64a140Aa3E981100a9becA4E685f962f0cF6C9";
pub const TOKEN0: &str = "0x0165878A594ca255338adfa4d48449f69242Eb8F";

pub type CallHandler = dyn Fn(Address, &[u8]) -> std::result::Result<Bytes, String> + Send + Sync;

/// In-memory node that answers reads from a handler and mines every
/// submitted transaction with a fixed receipt status.
pub struct FakeChain {
    on_call: Box<CallHandler>,
    pub estimate_error: Option<String>,
    /// Rejects every raw transaction with this message.
    pub send_error: Option<String>,
    /// `None` never produces a receipt.
    pub receipt_status: Option<u64>,
    /// Transactions whose calldata starts with one of these selectors revert.
    pub reverting_selectors: Vec<[u8; 4]>,
    pub estimated: Mutex<Vec<TypedTransaction>>,
    pub sent: Mutex<Vec<Bytes>>,
    pub sent_selectors: Mutex<HashMap<H256, [u8; 4]>>,
    pub receipt_polls: Mutex<usize>,
    pub calls: Mutex<Vec<(Address, Bytes)>>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            on_call: Box::new(default_reads),
            estimate_error: None,
            send_error: None,
            receipt_status: Some(1),
            reverting_selectors: Vec::new(),
            estimated: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            sent_selectors: Mutex::new(HashMap::new()),
            receipt_polls: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reads(
        mut self,
        handler: impl Fn(Address, &[u8]) -> std::result::Result<Bytes, String> + Send + Sync + 'static,
    ) -> Self {
        self.on_call = Box::new(handler);
        self
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn receipt_poll_count(&self) -> usize {
        *self.receipt_polls.lock().unwrap()
    }

    /// Calldata of every transaction that reached gas estimation, in order.
    pub fn estimated_calls(&self) -> Vec<(Address, Bytes)> {
        self.estimated
            .lock()
            .unwrap()
            .iter()
            .map(|tx| {
                (
                    tx.to_addr().copied().unwrap_or_default(),
                    tx.data().cloned().unwrap_or_default(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    fn chain_id(&self) -> u64 {
        31337
    }

    async fn get_transaction_count(&self, _address: Address) -> Result<U256> {
        Ok(U256::from(self.sent_count()))
    }

    async fn get_gas_price(&self) -> Result<U256> {
        Ok(U256::from(1_000_000_000u64))
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256> {
        self.estimated.lock().unwrap().push(tx.clone());
        match &self.estimate_error {
            Some(reason) => Err(GridHookError::RpcError(reason.clone())),
            None => Ok(U256::from(100_000)),
        }
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256> {
        if let Some(reason) = &self.send_error {
            return Err(GridHookError::RpcError(reason.clone()));
        }
        let hash = H256::from(keccak256(&raw));
        // the pipeline always estimates the transaction it is about to send
        let selector = self
            .estimated
            .lock()
            .unwrap()
            .last()
            .and_then(|tx| tx.data().filter(|d| d.len() >= 4).map(|d| selector_of(d)))
            .unwrap_or_default();
        self.sent_selectors.lock().unwrap().insert(hash, selector);
        self.sent.lock().unwrap().push(raw);
        Ok(hash)
    }

    async fn get_transaction_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>> {
        *self.receipt_polls.lock().unwrap() += 1;
        let reverts = self
            .sent_selectors
            .lock()
            .unwrap()
            .get(&tx_hash)
            .is_some_and(|selector| self.reverting_selectors.contains(selector));
        let status = if reverts { Some(0) } else { self.receipt_status };
        Ok(status.map(|status| TransactionReceipt {
            transaction_hash: tx_hash,
            status: Some(U64::from(status)),
            gas_used: Some(U256::from(90_000)),
            block_number: Some(U64::from(7)),
            ..Default::default()
        }))
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes> {
        let to = tx.to_addr().copied().unwrap_or_default();
        let data = tx.data().cloned().unwrap_or_default();
        self.calls.lock().unwrap().push((to, data.clone()));
        (self.on_call)(to, &data).map_err(GridHookError::RpcError)
    }

    async fn get_balance(&self, _address: Address) -> Result<U256> {
        Ok(U256::exp10(18) * 3)
    }
}

pub fn selector_of(data: &[u8]) -> [u8; 4] {
    [data[0], data[1], data[2], data[3]]
}

pub fn uint(value: U256) -> Bytes {
    Bytes::from(encode(&[Token::Uint(value)]))
}

/// (tick, zero_for_one) arguments of a getPositionId or pendingOrders call.
pub fn tick_and_direction(data: &[u8]) -> (i32, bool) {
    let first = if selector_of(data) == abi::selector(abi::PENDING_ORDERS) {
        ParamType::FixedBytes(32)
    } else {
        ParamType::Tuple(vec![
            ParamType::Address,
            ParamType::Address,
            ParamType::Uint(24),
            ParamType::Int(24),
            ParamType::Address,
        ])
    };
    let tokens = decode(&[first, ParamType::Int(24), ParamType::Bool], &data[4..]).unwrap();
    let tick = I256::from_raw(tokens[1].clone().into_int().unwrap()).as_i32();
    (tick, tokens[2].clone().into_bool().unwrap())
}

/// Answers every read the pipelines make with a quiet, empty pool.
pub fn default_reads(to: Address, data: &[u8]) -> std::result::Result<Bytes, String> {
    let selector = selector_of(data);
    let is = |signature: &str| selector == abi::selector(signature);

    if is(abi::ALLOWANCE) {
        Ok(uint(U256::MAX))
    } else if is(abi::GET_POSITION_ID) {
        let (tick, zero_for_one) = tick_and_direction(data);
        Ok(uint(U256::from((tick + 1000) as u64 * 2 + u64::from(zero_for_one))))
    } else if is(abi::PENDING_ORDERS) || is(abi::CLAIMABLE_OUTPUT_TOKENS) || is(abi::CLAIM_TOKENS_SUPPLY) {
        Ok(uint(U256::zero()))
    } else if is(abi::NAME) {
        Ok(Bytes::from(encode(&[Token::String("Mock Token".to_string())])))
    } else if is(abi::SYMBOL) {
        Ok(Bytes::from(encode(&[Token::String("MT".to_string())])))
    } else if is(abi::BALANCE_OF) {
        Ok(uint(U256::exp10(18) * 5))
    } else if is(abi::GET_HOOK_PERMISSIONS) {
        let permissions = HookPermissions::from_address(&to);
        let flags: Vec<Token> = permissions.iter().map(|(_, on)| Token::Bool(on)).collect();
        Ok(Bytes::from(encode(&flags)))
    } else {
        Err(format!("unexpected call to {to:?}"))
    }
}

pub fn config(vars: &[(&str, &str)]) -> Config {
    let mut map: HashMap<String, String> = HashMap::new();
    map.insert("PRIVATE_KEY".to_string(), ANVIL_KEY.to_string());
    for (key, value) in vars {
        map.insert((*key).to_string(), (*value).to_string());
    }
    Config::from_lookup(move |key| map.get(key).cloned()).unwrap()
}

pub fn service(chain: Arc<FakeChain>, vars: &[(&str, &str)]) -> gridhook_agent::GridService {
    gridhook_agent::GridService::with_chain(&config(vars), chain).unwrap()
}

pub fn address(value: &str) -> Address {
    value.parse().unwrap()
}
