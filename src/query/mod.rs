/*
 * Read-only pipeline: position scans, hook permissions and balances
 */

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use futures::future::join_all;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::abi;
use crate::amount::{format_amount, BALANCE_DISPLAY_DECIMALS, ORDER_DISPLAY_DECIMALS};
use crate::catalog::Action;
use crate::config::Deployment;
use crate::models::{GridHookError, Position, Result};
use crate::pool::{HookPermissions, OrderDirection, DEFAULT_SCAN_TICKS};
use crate::rpc::ChainClient;
use crate::utils::{checksum, parse_address};

pub const NO_ACTIVE_POSITIONS: &str = "No active positions found";

/// Outcome of reading one (tick, direction) slot.
#[derive(Debug)]
pub struct PositionScan {
    pub tick: i32,
    pub direction: OrderDirection,
    pub result: Result<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub token: Address,
    pub name: String,
    pub symbol: String,
    pub balance: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balances {
    pub address: Address,
    pub label: String,
    pub token0: TokenBalance,
    pub token1: TokenBalance,
    pub native: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionReport {
    pub reported: HookPermissions,
    pub from_address: HookPermissions,
}

impl PermissionReport {
    #[must_use]
    pub fn consistent(&self) -> bool {
        self.reported == self.from_address
    }
}

pub struct QueryPipeline {
    chain: Arc<dyn ChainClient>,
    deployment: Deployment,
    signer: Address,
}

impl QueryPipeline {
    #[must_use]
    pub fn new(chain: Arc<dyn ChainClient>, deployment: Deployment, signer: Address) -> Self {
        Self {
            chain,
            deployment,
            signer,
        }
    }

    pub async fn query(&self, action: &Action) -> Result<String> {
        match action {
            Action::CheckPositions { tick, include_empty } => {
                let ticks = match tick {
                    Some(tick) => vec![*tick],
                    None => DEFAULT_SCAN_TICKS.to_vec(),
                };
                let scans = self.scan_positions(&ticks).await;
                Ok(format_positions(&scans, *include_empty))
            }
            Action::GetHookPermissions => {
                let report = self.hook_permissions().await?;
                Ok(format_permissions(&report))
            }
            Action::GetBalances { address } => {
                let balances = self.balances(address.as_deref()).await?;
                Ok(format_balances(&balances))
            }
            other => Err(GridHookError::ValidationError(format!(
                "{} is not a read-only action",
                other.name()
            ))),
        }
    }

    /// Reads every tick in both directions concurrently. One failing slot does
    /// not affect the others.
    pub async fn scan_positions(&self, ticks: &[i32]) -> Vec<PositionScan> {
        let reads = ticks.iter().flat_map(|tick| {
            OrderDirection::BOTH.into_iter().map(move |direction| async move {
                let result = self.position(*tick, direction).await;
                if let Err(e) = &result {
                    warn!("Position read at tick {} ({}) failed: {}", tick, direction.label(), e);
                }
                PositionScan {
                    tick: *tick,
                    direction,
                    result,
                }
            })
        });
        join_all(reads).await
    }

    pub async fn position(&self, tick: i32, direction: OrderDirection) -> Result<Position> {
        let key = &self.deployment.pool_key;
        let hook = self.deployment.grid_hook;
        let pool_id = key.to_id();

        let (position_id, pending_amount) = tokio::try_join!(
            self.read_uint(hook, abi::get_position_id(key, tick, direction), "getPositionId"),
            self.read_uint(hook, abi::pending_orders(&pool_id, tick, direction), "pendingOrders"),
        )?;
        let (claimable_amount, claim_supply) = tokio::try_join!(
            self.read_uint(
                hook,
                abi::claimable_output_tokens(position_id),
                "claimableOutputTokens"
            ),
            self.read_uint(hook, abi::claim_tokens_supply(position_id), "claimTokensSupply"),
        )?;

        Ok(Position {
            tick,
            zero_for_one: direction.zero_for_one(),
            position_id,
            pending_amount,
            claimable_amount,
            claim_supply,
        })
    }

    pub async fn hook_permissions(&self) -> Result<PermissionReport> {
        let hook = self.deployment.grid_hook;
        let data = self.read(hook, abi::get_hook_permissions()).await?;
        let report = PermissionReport {
            reported: abi::decode_permissions(&data)?,
            from_address: HookPermissions::from_address(&hook),
        };
        if !report.consistent() {
            warn!(
                "Hook {} reports permissions {:#06x} but its address encodes {:#06x}",
                checksum(&hook),
                report.reported.bits(),
                report.from_address.bits()
            );
        }
        Ok(report)
    }

    /// `None`, `""` and `"user"` mean the signer; `"gridhook"` and `"pool"` name
    /// deployed contracts. Matching is exact; anything else must be an address.
    pub fn resolve_address(&self, alias: Option<&str>) -> Result<Address> {
        match alias {
            None | Some("") | Some("user") => Ok(self.signer),
            Some("gridhook") => Ok(self.deployment.grid_hook),
            Some("pool") => Ok(self.deployment.swap_router),
            Some(raw) => parse_address(raw),
        }
    }

    #[must_use]
    pub fn label_for(&self, address: &Address) -> String {
        if *address == self.signer {
            "Your".to_string()
        } else if *address == self.deployment.grid_hook {
            "GridHook's".to_string()
        } else if *address == self.deployment.swap_router {
            "Pool's".to_string()
        } else {
            format!("Address {}'s", checksum(address))
        }
    }

    pub async fn balances(&self, alias: Option<&str>) -> Result<Balances> {
        let address = self.resolve_address(alias)?;
        let key = &self.deployment.pool_key;
        debug!("Reading balances for {}", checksum(&address));

        let native = async {
            self.chain
                .get_balance(address)
                .await
                .map_err(|e| GridHookError::QueryError(format!("native balance: {e}")))
        };
        let (token0, token1, native) = tokio::try_join!(
            self.token_balance(key.currency0, address),
            self.token_balance(key.currency1, address),
            native,
        )?;

        Ok(Balances {
            address,
            label: self.label_for(&address),
            token0,
            token1,
            native,
        })
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<TokenBalance> {
        let (name, symbol, balance) = tokio::try_join!(
            self.read_string(token, abi::name(), "name"),
            self.read_string(token, abi::symbol(), "symbol"),
            self.read_uint(token, abi::balance_of(owner), "balanceOf"),
        )?;
        Ok(TokenBalance {
            token,
            name,
            symbol,
            balance,
        })
    }

    async fn read(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let request: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.chain
            .call(&request)
            .await
            .map_err(|e| GridHookError::QueryError(e.to_string()))
    }

    async fn read_uint(&self, to: Address, data: Bytes, what: &str) -> Result<U256> {
        let raw = self.read(to, data).await?;
        abi::decode_uint(&raw, what)
    }

    async fn read_string(&self, to: Address, data: Bytes, what: &str) -> Result<String> {
        let raw = self.read(to, data).await?;
        abi::decode_string(&raw, what)
    }
}

#[must_use]
pub fn format_positions(scans: &[PositionScan], include_empty: bool) -> String {
    let entries: Vec<String> = scans
        .iter()
        .filter_map(|scan| match &scan.result {
            Ok(position) if include_empty || position.has_activity() => {
                Some(format_position(position, scan.direction))
            }
            Ok(_) => None,
            Err(e) => Some(format!(
                "Error checking position at tick {} ({}): {e}",
                scan.tick,
                scan.direction.label()
            )),
        })
        .collect();

    if entries.is_empty() {
        NO_ACTIVE_POSITIONS.to_string()
    } else {
        entries.join("\n")
    }
}

fn format_position(position: &Position, direction: OrderDirection) -> String {
    format!(
        "\nPosition at tick {} ({}):\n\
         Position ID: {}\n\
         Pending order amount: {} tokens\n\
         Claimable output tokens: {} tokens\n\
         Total claim tokens supply: {} tokens",
        position.tick,
        direction.label(),
        position.position_id,
        format_amount(position.pending_amount, ORDER_DISPLAY_DECIMALS),
        format_amount(position.claimable_amount, ORDER_DISPLAY_DECIMALS),
        format_amount(position.claim_supply, ORDER_DISPLAY_DECIMALS),
    )
}

#[must_use]
pub fn format_permissions(report: &PermissionReport) -> String {
    let mut out = String::from("GridHook Permissions:\n-------------------\n");
    for (name, enabled) in report.reported.iter() {
        let _ = writeln!(out, "{name}: {}", if enabled { "✅" } else { "❌" });
    }
    if !report.consistent() {
        let _ = writeln!(
            out,
            "\nWarning: the hook address encodes flags {:#06x}, the contract reports {:#06x}",
            report.from_address.bits(),
            report.reported.bits()
        );
    }
    out
}

#[must_use]
pub fn format_balances(balances: &Balances) -> String {
    let token = |t: &TokenBalance| {
        format!(
            "• {} {} ({})",
            format_amount(t.balance, BALANCE_DISPLAY_DECIMALS),
            t.symbol,
            t.name
        )
    };
    format!(
        "{} balances:\n{}\n{}\n• {} ETH",
        balances.label,
        token(&balances.token0),
        token(&balances.token1),
        format_amount(balances.native, BALANCE_DISPLAY_DECIMALS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(pending: u64) -> Position {
        Position {
            tick: 60,
            zero_for_one: true,
            position_id: U256::from(42),
            pending_amount: U256::from(pending),
            claimable_amount: U256::zero(),
            claim_supply: U256::zero(),
        }
    }

    #[test]
    fn empty_scan_reports_explicitly() {
        let scans = vec![
            PositionScan {
                tick: 0,
                direction: OrderDirection::ZeroForOne,
                result: Ok(position(0)),
            },
            PositionScan {
                tick: 0,
                direction: OrderDirection::OneForZero,
                result: Ok(position(0)),
            },
        ];
        assert_eq!(format_positions(&scans, false), NO_ACTIVE_POSITIONS);
        assert!(format_positions(&scans, true).contains("Position ID: 42"));
        assert_eq!(format_positions(&[], true), NO_ACTIVE_POSITIONS);
    }

    #[test]
    fn failed_pairs_are_reported_inline() {
        let scans = vec![
            PositionScan {
                tick: 60,
                direction: OrderDirection::ZeroForOne,
                result: Ok(position(1_500_000_000_000_000_000)),
            },
            PositionScan {
                tick: 60,
                direction: OrderDirection::OneForZero,
                result: Err(GridHookError::QueryError("execution reverted".into())),
            },
        ];
        let text = format_positions(&scans, false);
        assert!(text.contains("Position at tick 60 (sell token0):"));
        assert!(text.contains("Pending order amount: 1.5000 tokens"));
        assert!(text.contains("Error checking position at tick 60 (sell token1): Query failed: execution reverted"));
    }

    #[test]
    fn permissions_render_every_flag() {
        let hook: Address = "0x9D71E6f99da38505b3c50cb0ec2ed754Ea13D040".parse().unwrap();
        let from_address = HookPermissions::from_address(&hook);
        let report = PermissionReport {
            reported: from_address,
            from_address,
        };
        let text = format_permissions(&report);
        assert!(text.starts_with("GridHook Permissions:\n-------------------\n"));
        assert!(text.contains("afterInitialize: ✅"));
        assert!(text.contains("afterSwap: ✅"));
        assert!(text.contains("beforeSwap: ❌"));
        assert_eq!(text.lines().filter(|l| l.contains(": ")).count(), 14);
        assert!(!text.contains("Warning"));

        let mismatched = PermissionReport {
            reported: HookPermissions::default(),
            from_address,
        };
        assert!(format_permissions(&mismatched).contains("Warning"));
    }

    #[test]
    fn balances_truncate_to_six_places() {
        let token = |symbol: &str, balance: u128| TokenBalance {
            token: Address::zero(),
            name: format!("Mock {symbol}"),
            symbol: symbol.to_string(),
            balance: U256::from(balance),
        };
        let balances = Balances {
            address: Address::zero(),
            label: "Your".to_string(),
            token0: token("MT0", 1_234_567_890_000_000_000),
            token1: token("MT1", 0),
            native: U256::from(10_000_000_000_000_000_000u128),
        };
        assert_eq!(
            format_balances(&balances),
            "Your balances:\n• 1.234567 MT0 (Mock MT0)\n• 0.000000 MT1 (Mock MT1)\n• 10.000000 ETH"
        );
    }
}
