use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Address;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("recipient address is required")]
    MissingRecipient,
    #[error("amount is required")]
    MissingAmount,
    #[error("amount '{input}' is not a number")]
    Malformed { input: String },
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount '{input}' has more precision than the token supports")]
    ExcessPrecision { input: String },
    #[error("amount '{input}' does not fit in 256 bits of base units")]
    Overflow { input: String },
}

/// Everything a caller of the mint controller can be told about a refused or failed action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MintError {
    #[error("invalid mint request: {0}")]
    Validation(#[from] ValidationError),
    #[error("caller {} is not the token owner ({})", display_opt(.caller), display_opt(.owner))]
    Authorization {
        caller: Option<Address>,
        owner: Option<Address>,
    },
    #[error("mint submission rejected: {0}")]
    Submission(String),
    #[error("mint transaction failed: {0}")]
    Confirmation(String),
    #[error("form inputs are locked while a mint is in flight")]
    InputsLocked,
    #[error("mint call has not been prepared yet")]
    NotPrepared,
}

impl MintError {
    /// Failures the user is told about through a notification.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, MintError::Submission(_) | MintError::Confirmation(_))
    }
}

fn display_opt(address: &Option<Address>) -> String {
    address
        .as_ref()
        .map(|address| address.to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_message_names_both_parties() {
        let err = MintError::Authorization {
            caller: Some(Address::from("0xC")),
            owner: None,
        };
        assert_eq!(
            err.to_string(),
            "caller 0xC is not the token owner (<unknown>)"
        );
        assert!(!err.is_user_visible());
    }

    #[test]
    fn chain_failures_are_user_visible() {
        assert!(MintError::Submission("rejected".into()).is_user_visible());
        assert!(MintError::Confirmation("reverted".into()).is_user_visible());
        assert!(!MintError::from(ValidationError::NotPositive).is_user_visible());
    }
}
