use thiserror::Error;

/// Rejections produced by the intent validator, before anything is signed.
///
/// These never reach the network boundary; the orchestrator turns them
/// straight into a terminal error callback.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("extracted intent is not a JSON object")]
    NotAnObject,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid amount in field {field}: {detail}")]
    InvalidAmount {
        field: &'static str,
        detail: String,
    },

    #[error("invalid slippage: {0}")]
    InvalidSlippage(String),
}

impl ValidationError {
    /// Stable machine-readable code for the chat transport.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAnObject => "intent_not_object",
            Self::MissingField(_) => "missing_field",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InvalidSlippage(_) => "invalid_slippage",
        }
    }
}

/// Terminal failures of a single execution attempt.
///
/// `ChainReverted` and `ConfirmationTimeout` carry the transaction hash: the
/// transaction reached the chain (or may still), and the hash is the only
/// handle the operator has to audit it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("failed to build transaction: {0}")]
    BuildFailed(String),

    #[error("failed to submit transaction: {0}")]
    SubmitFailed(String),

    #[error("transaction {hash} was included but aborted on-chain: {reason}")]
    ChainReverted { hash: String, reason: String },

    /// The finality wait exceeded its deadline. The outcome is unknown: the
    /// transaction may still finalize later. Never collapsed into success or
    /// failure.
    #[error("timed out waiting for finality of transaction {hash}")]
    ConfirmationTimeout { hash: String },
}

impl ExecutionError {
    /// Stable machine-readable code for the chat transport.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BuildFailed(_) => "build_failed",
            Self::SubmitFailed(_) => "submit_failed",
            Self::ChainReverted { .. } => "chain_reverted",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
        }
    }

    /// The transaction hash, when the failure happened after broadcast.
    pub fn transaction_hash(&self) -> Option<&str> {
        match self {
            Self::BuildFailed(_) | Self::SubmitFailed(_) => None,
            Self::ChainReverted { hash, .. } | Self::ConfirmationTimeout { hash } => {
                Some(hash.as_str())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_only_present_after_broadcast() {
        let build = ExecutionError::BuildFailed("boom".to_owned());
        assert_eq!(build.transaction_hash(), None, "no hash before broadcast");

        let reverted = ExecutionError::ChainReverted {
            hash: "0xabc".to_owned(),
            reason: "ABORTED".to_owned(),
        };
        assert_eq!(
            reverted.transaction_hash(),
            Some("0xabc"),
            "revert keeps the hash for audit"
        );

        let timeout = ExecutionError::ConfirmationTimeout {
            hash: "0xdef".to_owned(),
        };
        assert_eq!(
            timeout.transaction_hash(),
            Some("0xdef"),
            "timeout keeps the hash for audit"
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ValidationError::MissingField("amount").code(), "missing_field");
        assert_eq!(
            ExecutionError::SubmitFailed("refused".to_owned()).code(),
            "submit_failed"
        );
    }
}
