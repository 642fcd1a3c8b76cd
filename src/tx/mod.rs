/*
 * Transaction pipeline: resolve -> build -> sign -> submit -> await receipt -> classify
 *
 * Nothing here retries. A failed build never reaches the node, a failed
 * submission is reported as such, and a receipt that does not arrive within the
 * configured window is a timeout, not a failure: the transaction may still land.
 */

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, TransactionRequest, H256, I256, U256};
use ethers::utils::keccak256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::abi;
use crate::amount::{format_amount, to_chain_amount, to_signed_chain_amount, ORDER_DISPLAY_DECIMALS};
use crate::catalog::Action;
use crate::config::Deployment;
use crate::models::{GridHookError, Result, TransactionOutcome, TxStatus};
use crate::pool::{sqrt_price_limit, OrderDirection};
use crate::rpc::ChainClient;

#[derive(Debug, Clone)]
pub struct TransactionSettings {
    pub gas_buffer_percent: u64,
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
    pub auto_approve: bool,
}

impl Default for TransactionSettings {
    fn default() -> Self {
        Self {
            gas_buffer_percent: 110,
            receipt_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
            auto_approve: true,
        }
    }
}

/// A state-changing action with every on-chain value derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionIntent {
    PlaceOrder {
        tick: i32,
        direction: OrderDirection,
        amount: U256,
    },
    Swap {
        direction: OrderDirection,
        amount_specified: I256,
        sqrt_price_limit: U256,
    },
}

impl TransactionIntent {
    pub fn from_action(action: &Action) -> Result<Self> {
        match action {
            Action::PlaceOrder {
                tick,
                zero_for_one,
                amount,
            } => Ok(TransactionIntent::PlaceOrder {
                tick: *tick,
                direction: OrderDirection::from_zero_for_one(*zero_for_one),
                amount: to_chain_amount(amount)?,
            }),
            Action::Swap {
                zero_for_one,
                amount,
            } => {
                let direction = OrderDirection::from_zero_for_one(*zero_for_one);
                // v4 convention: negative amountSpecified is exact input
                let amount_specified = -to_signed_chain_amount(amount)?;
                Ok(TransactionIntent::Swap {
                    direction,
                    amount_specified,
                    sqrt_price_limit: sqrt_price_limit(direction),
                })
            }
            other => Err(GridHookError::ValidationError(format!(
                "{} does not submit a transaction",
                other.name()
            ))),
        }
    }

    #[must_use]
    pub fn direction(&self) -> OrderDirection {
        match self {
            TransactionIntent::PlaceOrder { direction, .. }
            | TransactionIntent::Swap { direction, .. } => *direction,
        }
    }

    /// Amount the caller specified: the input for orders and exact-input swaps,
    /// the output for exact-output swaps.
    #[must_use]
    pub fn specified_amount(&self) -> U256 {
        match self {
            TransactionIntent::PlaceOrder { amount, .. } => *amount,
            TransactionIntent::Swap {
                amount_specified, ..
            } => amount_specified.unsigned_abs(),
        }
    }

    /// Allowance that must already be in place to skip the approve step.
    /// An exact-output swap spends an input amount that is unknown until it
    /// executes, so any shortfall from the maximum triggers an approval.
    #[must_use]
    pub fn allowance_floor(&self) -> U256 {
        match self {
            TransactionIntent::Swap {
                amount_specified, ..
            } if !amount_specified.is_negative() => U256::MAX,
            _ => self.specified_amount(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            TransactionIntent::PlaceOrder { .. } => "placeOrder",
            TransactionIntent::Swap { .. } => "swap",
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        let shown = format_amount(self.specified_amount(), ORDER_DISPLAY_DECIMALS);
        match self {
            TransactionIntent::PlaceOrder {
                tick, direction, ..
            } => format!("Order at tick {tick} ({}) for {shown} tokens", direction.label()),
            TransactionIntent::Swap {
                direction,
                amount_specified,
                ..
            } => {
                let (from, to) = match direction {
                    OrderDirection::ZeroForOne => ("token0", "token1"),
                    OrderDirection::OneForZero => ("token1", "token0"),
                };
                let kind = if amount_specified.is_negative() {
                    "exact input"
                } else {
                    "exact output"
                };
                format!("Swap {shown} {from} for {to} ({kind})")
            }
        }
    }
}

/// Fields populated, gas estimated, not yet signed.
#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    pub label: &'static str,
    pub tx: TypedTransaction,
}

#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub label: &'static str,
    pub raw: Bytes,
    pub tx_hash: H256,
}

/// Accepted by the node; the hash exists from here on.
#[derive(Debug, Clone, Copy)]
pub struct SubmittedTransaction {
    pub label: &'static str,
    pub tx_hash: H256,
}

#[derive(Debug, Clone)]
pub struct TransactionReport {
    pub intent: TransactionIntent,
    pub approval: Option<TransactionOutcome>,
    pub outcome: TransactionOutcome,
}

pub struct TransactionPipeline {
    chain: Arc<dyn ChainClient>,
    wallet: LocalWallet,
    deployment: Deployment,
    settings: TransactionSettings,
}

impl TransactionPipeline {
    #[must_use]
    pub fn new(
        chain: Arc<dyn ChainClient>,
        wallet: LocalWallet,
        deployment: Deployment,
        settings: TransactionSettings,
    ) -> Self {
        let wallet = wallet.with_chain_id(chain.chain_id());
        Self {
            chain,
            wallet,
            deployment,
            settings,
        }
    }

    #[must_use]
    pub fn signer(&self) -> Address {
        self.wallet.address()
    }

    pub async fn submit(&self, action: &Action) -> Result<TransactionReport> {
        let intent = TransactionIntent::from_action(action)?;
        info!("Submitting {}", intent.describe());

        let key = &self.deployment.pool_key;
        // the contract that pulls the input token is also the call target
        let (target, data) = match &intent {
            TransactionIntent::PlaceOrder {
                tick,
                direction,
                amount,
            } => (
                self.deployment.grid_hook,
                abi::place_order(key, *tick, *direction, *amount),
            ),
            TransactionIntent::Swap {
                direction,
                amount_specified,
                sqrt_price_limit,
            } => (
                self.deployment.swap_router,
                abi::swap(key, *direction, *amount_specified, *sqrt_price_limit),
            ),
        };

        let token = key.input_currency(intent.direction());
        let approval = self
            .ensure_allowance(token, target, intent.allowance_floor())
            .await
            .map_err(|e| {
                warn!("Approval before {} failed: {}", intent.label(), e);
                GridHookError::ApprovalFailed {
                    action: intent.label(),
                    source: Box::new(e),
                }
            })?;

        let outcome = self.execute(intent.label(), target, data).await?;

        Ok(TransactionReport {
            intent,
            approval,
            outcome,
        })
    }

    /// Full lifecycle for one call. Returns `Ok` for both success and revert;
    /// the outcome carries the distinction.
    pub async fn execute(
        &self,
        label: &'static str,
        to: Address,
        data: Bytes,
    ) -> Result<TransactionOutcome> {
        let built = self.build(label, to, data).await?;
        let signed = self.sign(built)?;
        let submitted = self.send(signed).await?;
        self.await_receipt(submitted).await
    }

    pub async fn build(
        &self,
        label: &'static str,
        to: Address,
        data: Bytes,
    ) -> Result<BuiltTransaction> {
        let from = self.signer();
        let mut tx: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(to)
            .data(data)
            .value(U256::zero())
            .chain_id(self.chain.chain_id())
            .into();

        let estimate = self.chain.estimate_gas(&tx).await.map_err(|e| {
            GridHookError::BuildError(format!("{label}: call would not execute: {e}"))
        })?;
        let gas = estimate * self.settings.gas_buffer_percent / 100;

        let gas_price = self
            .chain
            .get_gas_price()
            .await
            .map_err(|e| GridHookError::BuildError(format!("{label}: {e}")))?;

        // fetched per submission, never cached
        let nonce = self
            .chain
            .get_transaction_count(from)
            .await
            .map_err(|e| GridHookError::BuildError(format!("{label}: {e}")))?;

        tx.set_gas(gas);
        tx.set_gas_price(gas_price);
        tx.set_nonce(nonce);

        info!(
            "Built {} tx: to={:?} nonce={} gas={} (estimate {}) gas_price={}",
            label, to, nonce, gas, estimate, gas_price
        );
        Ok(BuiltTransaction { label, tx })
    }

    pub fn sign(&self, built: BuiltTransaction) -> Result<SignedTransaction> {
        let signature = self.wallet.sign_transaction_sync(&built.tx).map_err(|e| {
            GridHookError::SubmissionError(format!("{}: signing failed: {e}", built.label))
        })?;
        let raw = built.tx.rlp_signed(&signature);
        let tx_hash = H256::from(keccak256(&raw));

        debug!("Signed {} tx {:?}", built.label, tx_hash);
        Ok(SignedTransaction {
            label: built.label,
            raw,
            tx_hash,
        })
    }

    pub async fn send(&self, signed: SignedTransaction) -> Result<SubmittedTransaction> {
        let tx_hash = self
            .chain
            .send_raw_transaction(signed.raw)
            .await
            .map_err(|e| GridHookError::SubmissionError(format!("{}: {e}", signed.label)))?;

        if tx_hash != signed.tx_hash {
            warn!(
                "Node returned hash {:?} for {} tx, locally computed {:?}",
                tx_hash, signed.label, signed.tx_hash
            );
        }

        info!("Submitted {} tx {:?}", signed.label, tx_hash);
        Ok(SubmittedTransaction {
            label: signed.label,
            tx_hash,
        })
    }

    pub async fn await_receipt(&self, submitted: SubmittedTransaction) -> Result<TransactionOutcome> {
        let tx_hash = submitted.tx_hash;
        let poll = async {
            // interval() panics on a zero period
            let period = self.settings.poll_interval.max(Duration::from_millis(1));
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match self.chain.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => debug!("No receipt yet for {:?}", tx_hash),
                    Err(e) => warn!("Receipt poll for {:?} failed: {}", tx_hash, e),
                }
            }
        };

        let receipt = tokio::time::timeout(self.settings.receipt_timeout, poll)
            .await
            .map_err(|_| {
                warn!(
                    "Gave up waiting for {} tx {:?} after {:?}",
                    submitted.label, tx_hash, self.settings.receipt_timeout
                );
                GridHookError::ConfirmationTimeout {
                    tx_hash,
                    waited: self.settings.receipt_timeout,
                }
            })?;

        let outcome = classify_receipt(tx_hash, &receipt);
        match outcome.status {
            TxStatus::Success => info!(
                "{} tx {:?} confirmed in block {:?}, gas used {}",
                submitted.label, tx_hash, outcome.block_number, outcome.gas_used
            ),
            TxStatus::Reverted => warn!(
                "{} tx {:?} reverted in block {:?}, gas used {}",
                submitted.label, tx_hash, outcome.block_number, outcome.gas_used
            ),
        }
        Ok(outcome)
    }

    async fn ensure_allowance(
        &self,
        token: Address,
        spender: Address,
        required: U256,
    ) -> Result<Option<TransactionOutcome>> {
        if !self.settings.auto_approve || token.is_zero() {
            return Ok(None);
        }

        let owner = self.signer();
        let request: TypedTransaction = TransactionRequest::new()
            .from(owner)
            .to(token)
            .data(abi::allowance(owner, spender))
            .into();
        let current = self
            .chain
            .call(&request)
            .await
            .and_then(|data| abi::decode_uint(&data, "allowance"))
            .map_err(|e| GridHookError::BuildError(format!("allowance check failed: {e}")))?;

        if current >= required {
            debug!("Allowance {} for {:?} covers {}", current, spender, required);
            return Ok(None);
        }

        info!(
            "Allowance {} of token {:?} for {:?} is below {}, approving",
            current, token, spender, required
        );
        let outcome = self
            .execute("approve", token, abi::approve(spender, U256::MAX))
            .await?;
        if !outcome.is_success() {
            return Err(GridHookError::Reverted {
                tx_hash: outcome.tx_hash,
                gas_used: outcome.gas_used,
            });
        }
        Ok(Some(outcome))
    }
}

/// Status 1 is success; 0, or a receipt without status, counts as reverted.
#[must_use]
pub fn classify_receipt(tx_hash: H256, receipt: &TransactionReceipt) -> TransactionOutcome {
    let status = match receipt.status {
        Some(status) if !status.is_zero() => TxStatus::Success,
        _ => TxStatus::Reverted,
    };

    TransactionOutcome {
        tx_hash,
        status,
        gas_used: receipt.gas_used.unwrap_or_default(),
        block_number: receipt.block_number,
    }
}
