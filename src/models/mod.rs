/*
 * Error taxonomy and shared value types for the dispatcher
 */

use ethers::types::{H256, U256, U64};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Success,
    Reverted,
}

/// Terminal state of a transaction that reached the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    pub tx_hash: H256,
    pub status: TxStatus,
    pub gas_used: U256,
    pub block_number: Option<U64>,
}

impl TransactionOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }
}

/// Read-only projection of a grid order slot, fetched fresh on every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub tick: i32,
    pub zero_for_one: bool,
    pub position_id: U256,
    pub pending_amount: U256,
    pub claimable_amount: U256,
    pub claim_supply: U256,
}

impl Position {
    #[must_use]
    pub fn has_activity(&self) -> bool {
        !self.pending_amount.is_zero() || !self.claimable_amount.is_zero() || !self.claim_supply.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    Validation,
    Build,
    Submission,
    Reverted,
    Timeout,
    Query,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::Validation => "validation",
            ErrorClass::Build => "build",
            ErrorClass::Submission => "submission",
            ErrorClass::Reverted => "reverted",
            ErrorClass::Timeout => "timeout",
            ErrorClass::Query => "query",
            ErrorClass::Internal => "internal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum GridHookError {
    #[error("Invalid request: {0}")]
    ValidationError(String),

    #[error("Failed to build transaction: {0}")]
    BuildError(String),

    #[error("Failed to submit transaction: {0}")]
    SubmissionError(String),

    #[error("Transaction {tx_hash:?} reverted on chain (gas used: {gas_used})")]
    Reverted { tx_hash: H256, gas_used: U256 },

    #[error("No receipt for transaction {tx_hash:?} after {waited:?}")]
    ConfirmationTimeout { tx_hash: H256, waited: Duration },

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Contract interaction error: {0}")]
    ContractError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Token approval failed, {action} was not sent: {source}")]
    ApprovalFailed {
        action: &'static str,
        #[source]
        source: Box<GridHookError>,
    },
}

impl GridHookError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            GridHookError::ValidationError(_) => ErrorClass::Validation,
            GridHookError::BuildError(_) => ErrorClass::Build,
            GridHookError::SubmissionError(_) => ErrorClass::Submission,
            GridHookError::Reverted { .. } => ErrorClass::Reverted,
            GridHookError::ConfirmationTimeout { .. } => ErrorClass::Timeout,
            GridHookError::QueryError(_) | GridHookError::ContractError(_) => ErrorClass::Query,
            GridHookError::RpcError(_)
            | GridHookError::ConfigError(_)
            | GridHookError::SerializationError(_) => ErrorClass::Internal,
            GridHookError::ApprovalFailed { source, .. } => source.class(),
        }
    }

    /// The transaction may have landed even though we never saw it confirmed.
    #[must_use]
    pub fn outcome_unknown(&self) -> bool {
        match self {
            GridHookError::SubmissionError(_) | GridHookError::ConfirmationTimeout { .. } => true,
            GridHookError::ApprovalFailed { source, .. } => source.outcome_unknown(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GridHookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_activity_requires_a_nonzero_field() {
        let mut position = Position {
            tick: 60,
            zero_for_one: true,
            position_id: U256::from(7),
            pending_amount: U256::zero(),
            claimable_amount: U256::zero(),
            claim_supply: U256::zero(),
        };
        assert!(!position.has_activity());

        position.claim_supply = U256::one();
        assert!(position.has_activity());
    }

    #[test]
    fn error_classes_keep_validation_apart_from_chain_failures() {
        assert_eq!(
            GridHookError::ValidationError("x".into()).class(),
            ErrorClass::Validation
        );
        assert_eq!(GridHookError::BuildError("x".into()).class(), ErrorClass::Build);
        let reverted = GridHookError::Reverted {
            tx_hash: H256::zero(),
            gas_used: U256::from(21_000),
        };
        assert_eq!(reverted.class(), ErrorClass::Reverted);
        assert!(!reverted.outcome_unknown());
        assert!(GridHookError::SubmissionError("timeout".into()).outcome_unknown());
    }

    #[test]
    fn approval_failure_keeps_the_inner_class() {
        let err = GridHookError::ApprovalFailed {
            action: "swap",
            source: Box::new(GridHookError::ConfirmationTimeout {
                tx_hash: H256::zero(),
                waited: Duration::from_secs(1),
            }),
        };
        assert_eq!(err.class(), ErrorClass::Timeout);
        assert!(err.outcome_unknown());
        assert!(err.to_string().starts_with("Token approval failed, swap was not sent: No receipt"));
    }
}
