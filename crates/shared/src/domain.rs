use std::fmt;

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! opaque_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

opaque_newtype!(Address);
opaque_newtype!(TransactionHandle);

impl Address {
    /// Blank addresses are what an untouched form field or a disconnected wallet yields.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Owner as last read from the contract.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "address", rename_all = "snake_case")]
pub enum OwnerState {
    #[default]
    Unknown,
    Known(Address),
}

impl OwnerState {
    pub fn address(&self) -> Option<&Address> {
        match self {
            OwnerState::Unknown => None,
            OwnerState::Known(address) => Some(address),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContractField {
    Owner,
    TotalSupply,
    Name,
    Symbol,
    Decimals,
}

impl ContractField {
    pub fn abi_name(self) -> &'static str {
        match self {
            ContractField::Owner => "owner",
            ContractField::TotalSupply => "totalSupply",
            ContractField::Name => "name",
            ContractField::Symbol => "symbol",
            ContractField::Decimals => "decimals",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Address(Address),
    Uint(U256),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Address(address) => write!(f, "{address}"),
            FieldValue::Uint(value) => write!(f, "{value}"),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

/// How a contract read is presented while it is outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStatus {
    Pending,
    Ready(FieldValue),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    pub recipient: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", content = "args", rename_all = "snake_case")]
pub enum ContractFunction {
    Mint { to: Address, amount: U256 },
}

impl ContractFunction {
    pub fn abi_name(&self) -> &'static str {
        match self {
            ContractFunction::Mint { .. } => "mint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub contract: Address,
    pub function: ContractFunction,
}

impl ContractCall {
    pub fn mint(contract: Address, request: MintRequest) -> Self {
        Self {
            contract,
            function: ContractFunction::Mint {
                to: request.recipient,
                amount: request.amount,
            },
        }
    }
}

/// A call the write port has accepted as sendable; passed back verbatim on submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedWrite {
    pub call: ContractCall,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed { reason: String },
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Failure,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_address_detection_ignores_whitespace() {
        assert!(Address::new("").is_blank());
        assert!(Address::new("   ").is_blank());
        assert!(!Address::new("0xB").is_blank());
    }

    #[test]
    fn mint_call_carries_request_fields() {
        let call = ContractCall::mint(
            Address::from("0xToken"),
            MintRequest {
                recipient: Address::from("0xB"),
                amount: U256::from(5u8),
            },
        );
        assert_eq!(call.function.abi_name(), "mint");
        assert_eq!(
            call.function,
            ContractFunction::Mint {
                to: Address::from("0xB"),
                amount: U256::from(5u8),
            }
        );
    }

    #[test]
    fn notification_serializes_with_snake_case_kind() {
        let json = serde_json::to_value(Notification::failure("nope")).expect("serialize");
        assert_eq!(json["kind"], "failure");
        assert_eq!(json["message"], "nope");
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!TxStatus::Pending.is_terminal());
        assert!(TxStatus::Confirmed.is_terminal());
        assert!(TxStatus::Failed {
            reason: "reverted".into()
        }
        .is_terminal());
    }
}
