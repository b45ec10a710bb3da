//! Read-only token panels: the info list and the live total supply.

use std::sync::Arc;

use alloy_primitives::U256;
use serde::Serialize;
use shared::{
    domain::{Address, ContractField, FieldValue, ReadStatus},
    units::format_units,
};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::warn;

use crate::{config::MintConfig, ports::ContractReader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfoItem {
    pub label: String,
    pub value: String,
}

impl TokenInfoItem {
    pub fn new(label: impl Into<String>, value: impl ToString) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum TokenInfoView {
    /// Skeleton with one placeholder row per field of the ready view.
    Loading { rows: usize },
    Ready(Vec<TokenInfoItem>),
    Error(String),
}

/// Read status of each field the info panel lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfoStatuses {
    pub name: ReadStatus,
    pub symbol: ReadStatus,
    pub decimals: ReadStatus,
    pub owner: ReadStatus,
}

impl TokenInfoStatuses {
    pub fn pending() -> Self {
        Self {
            name: ReadStatus::Pending,
            symbol: ReadStatus::Pending,
            decimals: ReadStatus::Pending,
            owner: ReadStatus::Pending,
        }
    }
}

impl TokenInfoView {
    pub const SKELETON_ROWS: usize = 5;

    pub fn loading() -> Self {
        TokenInfoView::Loading {
            rows: Self::SKELETON_ROWS,
        }
    }

    /// The first failed read wins; any read still pending keeps the skeleton up.
    pub fn from_statuses(statuses: &TokenInfoStatuses, contract: &Address) -> Self {
        let fields = [
            ("Name", &statuses.name),
            ("Symbol", &statuses.symbol),
            ("Decimals", &statuses.decimals),
            ("Owner", &statuses.owner),
        ];
        if let Some(message) = fields.iter().find_map(|(_, status)| match status {
            ReadStatus::Error(message) => Some(message),
            _ => None,
        }) {
            return TokenInfoView::Error(message.clone());
        }

        let mut items = Vec::with_capacity(Self::SKELETON_ROWS);
        for (label, status) in fields {
            let ReadStatus::Ready(value) = status else {
                return Self::loading();
            };
            items.push(TokenInfoItem::new(label, value));
        }
        items.push(TokenInfoItem::new("Contract", contract));
        TokenInfoView::Ready(items)
    }
}

fn to_status(result: anyhow::Result<FieldValue>) -> ReadStatus {
    match result {
        Ok(value) => ReadStatus::Ready(value),
        Err(err) => ReadStatus::Error(err.to_string()),
    }
}

pub async fn load_token_info(reader: &dyn ContractReader, config: &MintConfig) -> TokenInfoView {
    let contract = &config.contract_address;
    let (name, symbol, decimals, owner) = futures::join!(
        reader.read_field(contract, ContractField::Name),
        reader.read_field(contract, ContractField::Symbol),
        reader.read_field(contract, ContractField::Decimals),
        reader.read_field(contract, ContractField::Owner),
    );
    let statuses = TokenInfoStatuses {
        name: to_status(name),
        symbol: to_status(symbol),
        decimals: to_status(decimals),
        owner: to_status(owner),
    };

    let view = TokenInfoView::from_statuses(&statuses, contract);
    if let TokenInfoView::Error(message) = &view {
        warn!(contract = %contract, error = %message, "token_info: failed to load token info");
    }
    view
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TotalSupplyView {
    Loading,
    Ready { base_units: U256, formatted: String },
    Error { message: String },
}

impl TotalSupplyView {
    pub fn from_status(status: &ReadStatus, scaling_factor: U256) -> Self {
        match status {
            ReadStatus::Pending => TotalSupplyView::Loading,
            ReadStatus::Ready(FieldValue::Uint(value)) => TotalSupplyView::Ready {
                base_units: *value,
                formatted: format_units(*value, scaling_factor),
            },
            ReadStatus::Ready(other) => TotalSupplyView::Error {
                message: format!("total supply is not an integer: {other}"),
            },
            ReadStatus::Error(message) => TotalSupplyView::Error {
                message: message.clone(),
            },
        }
    }
}

/// Keeps the total supply view current from the reader's push updates.
pub struct TotalSupplyMonitor {
    scaling_factor: U256,
    view: TotalSupplyView,
    updates: BroadcastStream<FieldValue>,
}

impl TotalSupplyMonitor {
    pub async fn start(reader: Arc<dyn ContractReader>, config: &MintConfig) -> Self {
        let contract = &config.contract_address;
        // Subscribe before the initial read so no update slips between the two.
        let updates = BroadcastStream::new(reader.subscribe(contract, ContractField::TotalSupply));
        let status = to_status(reader.read_field(contract, ContractField::TotalSupply).await);
        Self {
            scaling_factor: config.scaling_factor(),
            view: TotalSupplyView::from_status(&status, config.scaling_factor()),
            updates,
        }
    }

    pub fn view(&self) -> &TotalSupplyView {
        &self.view
    }

    /// Waits for the next pushed value. `None` once the reader stops publishing.
    pub async fn next_update(&mut self) -> Option<&TotalSupplyView> {
        loop {
            match self.updates.next().await? {
                Ok(value) => {
                    self.view =
                        TotalSupplyView::from_status(&ReadStatus::Ready(value), self.scaling_factor);
                    return Some(&self.view);
                }
                Err(err) => warn!(error = %err, "token_info: total supply updates lagged"),
            }
        }
    }
}
