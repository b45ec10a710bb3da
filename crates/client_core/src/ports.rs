//! Capabilities the mint workflow consumes. Wallets, chains and contracts live behind these.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use shared::domain::{
    Address, ContractCall, ContractField, FieldValue, Notification, PreparedWrite,
    TransactionHandle, TxStatus,
};
use tokio::sync::broadcast;

#[async_trait]
pub trait ContractReader: Send + Sync {
    async fn read_field(&self, contract: &Address, field: ContractField) -> Result<FieldValue>;
    /// Pushes every new value of `field` after the moment of subscription.
    fn subscribe(&self, contract: &Address, field: ContractField)
        -> broadcast::Receiver<FieldValue>;
}

#[async_trait]
pub trait ContractWriter: Send + Sync {
    /// Dry-runs `call`; an error means the write is disabled as prepared.
    async fn prepare_write(&self, call: ContractCall) -> Result<PreparedWrite>;
    async fn submit_write(&self, prepared: PreparedWrite) -> Result<TransactionHandle>;
}

pub trait TransactionWatcher: Send + Sync {
    fn watch(&self, handle: &TransactionHandle) -> BoxStream<'static, TxStatus>;
}

pub trait WalletConnection: Send + Sync {
    fn current_caller(&self) -> Option<Address>;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

pub struct DisconnectedWallet;

impl WalletConnection for DisconnectedWallet {
    fn current_caller(&self) -> Option<Address> {
        None
    }
}

pub struct MissingContractWriter;

#[async_trait]
impl ContractWriter for MissingContractWriter {
    async fn prepare_write(&self, call: ContractCall) -> Result<PreparedWrite> {
        Err(anyhow!(
            "no contract writer available for {} on {}",
            call.function.abi_name(),
            call.contract
        ))
    }

    async fn submit_write(&self, prepared: PreparedWrite) -> Result<TransactionHandle> {
        Err(anyhow!(
            "no contract writer available for {} on {}",
            prepared.call.function.abi_name(),
            prepared.call.contract
        ))
    }
}
