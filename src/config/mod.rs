/*
 * Configuration management for the GridHook agent
 */

use crate::models::{GridHookError, Result};
use crate::pool::PoolKey;
use crate::tx::TransactionSettings;
use crate::utils::parse_address;
use ethers::signers::LocalWallet;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// Local anvil deployment produced by the hook's deploy script
const DEFAULT_GRID_HOOK: &str = "0x9D71E6f99da38505b3c50cb0ec2ed754Ea13D040";
const DEFAULT_POOL_SWAP_TEST: &str = "0xdc64a140aa3e981100a9beca4e685f962f0cf6c9";
const DEFAULT_POOL_MANAGER: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
const DEFAULT_TOKEN0: &str = "0x0165878A594ca255338adfa4d48449f69242Eb8F";
const DEFAULT_TOKEN1: &str = "0xa513E6E4b8f2a923D98304ec87F64353C4D5C853";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub chain: ChainConfig,
    #[serde(skip_serializing)]
    pub signer: SignerConfig,
    pub contracts: ContractsConfig,
    pub pool: PoolConfig,
    pub transactions: TransactionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub gas_buffer_percent: u64,
}

#[derive(Clone, Deserialize)]
pub struct SignerConfig {
    pub private_key: String,
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractsConfig {
    pub grid_hook: String,
    pub pool_swap_test: String,
    pub pool_manager: String,
    pub token0: String,
    pub token1: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    pub fee: u32,
    pub tick_spacing: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransactionConfig {
    pub receipt_timeout_secs: u64,
    pub receipt_poll_interval_ms: u64,
    pub auto_approve: bool,
}

/// Resolved contract addresses and the pool the hook is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    pub grid_hook: Address,
    pub swap_router: Address,
    pub pool_manager: Address,
    pub pool_key: PoolKey,
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| GridHookError::ConfigError(format!("Invalid {key} '{raw}': {e}")))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            server: ServerConfig {
                host: var("SERVER_HOST", "0.0.0.0"),
                port: parse_var(&lookup, "SERVER_PORT", "8080")?,
            },
            chain: ChainConfig {
                rpc_url: var("RPC_URL", "http://localhost:8545"),
                chain_id: parse_var(&lookup, "CHAIN_ID", "31337")?,
                gas_buffer_percent: parse_var(&lookup, "GAS_BUFFER_PERCENT", "110")?,
            },
            signer: SignerConfig {
                private_key: lookup("PRIVATE_KEY")
                    .ok_or_else(|| GridHookError::ConfigError("PRIVATE_KEY not set".to_string()))?,
            },
            contracts: ContractsConfig {
                grid_hook: var("GRID_HOOK_ADDRESS", DEFAULT_GRID_HOOK),
                pool_swap_test: var("POOL_SWAP_TEST_ADDRESS", DEFAULT_POOL_SWAP_TEST),
                pool_manager: var("POOL_MANAGER_ADDRESS", DEFAULT_POOL_MANAGER),
                token0: var("TOKEN0_ADDRESS", DEFAULT_TOKEN0),
                token1: var("TOKEN1_ADDRESS", DEFAULT_TOKEN1),
            },
            pool: PoolConfig {
                fee: parse_var(&lookup, "POOL_FEE", "3000")?,
                tick_spacing: parse_var(&lookup, "POOL_TICK_SPACING", "60")?,
            },
            transactions: TransactionConfig {
                receipt_timeout_secs: parse_var(&lookup, "RECEIPT_TIMEOUT_SECS", "120")?,
                receipt_poll_interval_ms: parse_var(&lookup, "RECEIPT_POLL_INTERVAL_MS", "1000")?,
                auto_approve: parse_var(&lookup, "AUTO_APPROVE", "true")?,
            },
        };

        if config.transactions.receipt_timeout_secs == 0 {
            return Err(GridHookError::ConfigError(
                "RECEIPT_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if config.transactions.receipt_poll_interval_ms == 0 {
            return Err(GridHookError::ConfigError(
                "RECEIPT_POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }
        if config.chain.gas_buffer_percent < 100 {
            return Err(GridHookError::ConfigError(format!(
                "GAS_BUFFER_PERCENT must be at least 100, got {}",
                config.chain.gas_buffer_percent
            )));
        }

        Ok(config)
    }

    pub fn deployment(&self) -> Result<Deployment> {
        let address = |name: &str, value: &str| {
            parse_address(value)
                .map_err(|e| GridHookError::ConfigError(format!("{name}: {e}")))
        };

        let grid_hook = address("GRID_HOOK_ADDRESS", &self.contracts.grid_hook)?;
        let pool_key = PoolKey::new(
            address("TOKEN0_ADDRESS", &self.contracts.token0)?,
            address("TOKEN1_ADDRESS", &self.contracts.token1)?,
            self.pool.fee,
            self.pool.tick_spacing,
            grid_hook,
        )
        .map_err(|e| GridHookError::ConfigError(format!("Invalid pool key: {e}")))?;

        Ok(Deployment {
            grid_hook,
            swap_router: address("POOL_SWAP_TEST_ADDRESS", &self.contracts.pool_swap_test)?,
            pool_manager: address("POOL_MANAGER_ADDRESS", &self.contracts.pool_manager)?,
            pool_key,
        })
    }

    pub fn wallet(&self) -> Result<LocalWallet> {
        let key = self.signer.private_key.trim();
        key.strip_prefix("0x")
            .unwrap_or(key)
            .parse::<LocalWallet>()
            .map_err(|e| GridHookError::ConfigError(format!("Invalid PRIVATE_KEY: {e}")))
    }

    #[must_use]
    pub fn transaction_settings(&self) -> TransactionSettings {
        TransactionSettings {
            gas_buffer_percent: self.chain.gas_buffer_percent,
            receipt_timeout: Duration::from_secs(self.transactions.receipt_timeout_secs),
            poll_interval: Duration::from_millis(self.transactions.receipt_poll_interval_ms),
            auto_approve: self.transactions.auto_approve,
        }
    }
}
