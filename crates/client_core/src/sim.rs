//! In-memory ERC20-style token that stands in for a wallet plus chain.
//!
//! Mints are executed when their transaction is first watched, and ownership is
//! enforced at execution the way the real contract would revert.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use alloy_primitives::U256;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use shared::domain::{
    Address, ContractCall, ContractField, ContractFunction, FieldValue, PreparedWrite,
    TransactionHandle, TxStatus,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::ports::{ContractReader, ContractWriter, TransactionWatcher, WalletConnection};

const UPDATE_CHANNEL_CAPACITY: usize = 64;
const NOT_OWNER_REASON: &str = "Ownable: caller is not the owner";

#[derive(Debug, Clone)]
struct PendingMint {
    from: Address,
    to: Address,
    amount: U256,
}

#[derive(Debug)]
struct TokenState {
    owner: Address,
    total_supply: U256,
    balances: HashMap<Address, U256>,
    caller: Option<Address>,
    pending: HashMap<TransactionHandle, PendingMint>,
    receipts: HashMap<TransactionHandle, TxStatus>,
    next_nonce: u64,
    reject_submissions: Option<String>,
}

pub struct InMemoryToken {
    contract: Address,
    name: String,
    symbol: String,
    decimals: u8,
    state: Mutex<TokenState>,
    updates: HashMap<ContractField, broadcast::Sender<FieldValue>>,
}

impl InMemoryToken {
    pub fn new(
        contract: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        owner: Address,
    ) -> Self {
        let updates = [
            ContractField::Owner,
            ContractField::TotalSupply,
            ContractField::Name,
            ContractField::Symbol,
            ContractField::Decimals,
        ]
        .into_iter()
        .map(|field| (field, broadcast::channel(UPDATE_CHANNEL_CAPACITY).0))
        .collect();

        Self {
            contract,
            name: name.into(),
            symbol: symbol.into(),
            decimals: 18,
            state: Mutex::new(TokenState {
                owner,
                total_supply: U256::ZERO,
                balances: HashMap::new(),
                caller: None,
                pending: HashMap::new(),
                receipts: HashMap::new(),
                next_nonce: 0,
                reject_submissions: None,
            }),
            updates,
        }
    }

    /// Credits `to` directly, bypassing ownership; used to seed an initial supply.
    pub fn credit(&self, to: &Address, amount: U256) -> Result<()> {
        let total_supply = {
            let mut state = self.lock();
            let total_supply = state
                .total_supply
                .checked_add(amount)
                .ok_or_else(|| anyhow!("total supply overflow"))?;
            let balance = state.balances.entry(to.clone()).or_insert(U256::ZERO);
            *balance = balance
                .checked_add(amount)
                .ok_or_else(|| anyhow!("balance overflow for {to}"))?;
            state.total_supply = total_supply;
            total_supply
        };
        self.publish(ContractField::TotalSupply, FieldValue::Uint(total_supply));
        Ok(())
    }

    pub fn connect(&self, caller: Option<Address>) {
        self.lock().caller = caller;
    }

    pub fn transfer_ownership(&self, new_owner: Address) {
        self.lock().owner = new_owner.clone();
        info!(owner = %new_owner, "sim: ownership transferred");
        self.publish(ContractField::Owner, FieldValue::Address(new_owner));
    }

    /// Makes the wallet refuse every submission with `reason`, e.g. a user rejecting the signature.
    pub fn reject_submissions(&self, reason: Option<String>) {
        self.lock().reject_submissions = reason;
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.lock()
            .balances
            .get(account)
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn total_supply(&self) -> U256 {
        self.lock().total_supply
    }

    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, field: ContractField, value: FieldValue) {
        if let Some(sender) = self.updates.get(&field) {
            // No subscribers is fine.
            let _ = sender.send(value);
        }
    }

    fn ensure_contract(&self, contract: &Address) -> Result<()> {
        if contract != &self.contract {
            bail!("no contract deployed at {contract}");
        }
        Ok(())
    }

    fn check_call(&self, call: &ContractCall) -> Result<(Address, U256)> {
        self.ensure_contract(&call.contract)?;
        let ContractFunction::Mint { to, amount } = &call.function;
        if to.is_blank() {
            bail!("invalid recipient address");
        }
        if amount.is_zero() {
            bail!("mint amount must be non-zero");
        }
        Ok((to.clone(), *amount))
    }

    fn execute(&self, handle: &TransactionHandle) -> TxStatus {
        let (status, total_supply) = {
            let mut state = self.lock();
            if let Some(receipt) = state.receipts.get(handle) {
                return receipt.clone();
            }
            let Some(mint) = state.pending.remove(handle) else {
                return TxStatus::Failed {
                    reason: format!("unknown transaction {handle}"),
                };
            };

            let status = if mint.from != state.owner {
                TxStatus::Failed {
                    reason: NOT_OWNER_REASON.into(),
                }
            } else {
                let balance = state
                    .balances
                    .get(&mint.to)
                    .copied()
                    .unwrap_or(U256::ZERO);
                match (
                    state.total_supply.checked_add(mint.amount),
                    balance.checked_add(mint.amount),
                ) {
                    (Some(total_supply), Some(balance)) => {
                        state.total_supply = total_supply;
                        state.balances.insert(mint.to.clone(), balance);
                        TxStatus::Confirmed
                    }
                    _ => TxStatus::Failed {
                        reason: "arithmetic overflow".into(),
                    },
                }
            };
            state.receipts.insert(handle.clone(), status.clone());
            (status, state.total_supply)
        };

        match &status {
            TxStatus::Confirmed => {
                info!(handle = %handle, "sim: mint executed");
                self.publish(ContractField::TotalSupply, FieldValue::Uint(total_supply));
            }
            TxStatus::Failed { reason } => {
                warn!(handle = %handle, %reason, "sim: mint reverted")
            }
            TxStatus::Pending => {}
        }
        status
    }
}

#[async_trait]
impl ContractReader for InMemoryToken {
    async fn read_field(&self, contract: &Address, field: ContractField) -> Result<FieldValue> {
        self.ensure_contract(contract)?;
        let state = self.lock();
        Ok(match field {
            ContractField::Owner => FieldValue::Address(state.owner.clone()),
            ContractField::TotalSupply => FieldValue::Uint(state.total_supply),
            ContractField::Name => FieldValue::Text(self.name.clone()),
            ContractField::Symbol => FieldValue::Text(self.symbol.clone()),
            ContractField::Decimals => FieldValue::Uint(U256::from(self.decimals)),
        })
    }

    fn subscribe(
        &self,
        contract: &Address,
        field: ContractField,
    ) -> broadcast::Receiver<FieldValue> {
        if contract != &self.contract {
            warn!(contract = %contract, "sim: subscription to unknown contract");
        }
        match self.updates.get(&field) {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }
}

#[async_trait]
impl ContractWriter for InMemoryToken {
    async fn prepare_write(&self, call: ContractCall) -> Result<PreparedWrite> {
        self.check_call(&call)?;
        Ok(PreparedWrite { call })
    }

    async fn submit_write(&self, prepared: PreparedWrite) -> Result<TransactionHandle> {
        let (to, amount) = self.check_call(&prepared.call)?;
        let mut state = self.lock();
        if let Some(reason) = &state.reject_submissions {
            bail!("{reason}");
        }
        let Some(from) = state.caller.clone() else {
            bail!("wallet is not connected");
        };
        state.next_nonce += 1;
        let handle = TransactionHandle::new(format!("0x{:064x}", state.next_nonce));
        state
            .pending
            .insert(handle.clone(), PendingMint { from, to, amount });
        info!(handle = %handle, "sim: transaction accepted");
        Ok(handle)
    }
}

impl TransactionWatcher for InMemoryToken {
    fn watch(&self, handle: &TransactionHandle) -> BoxStream<'static, TxStatus> {
        let outcome = self.execute(handle);
        futures::stream::iter([TxStatus::Pending, outcome]).boxed()
    }
}

impl WalletConnection for InMemoryToken {
    fn current_caller(&self) -> Option<Address> {
        self.lock().caller.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> InMemoryToken {
        InMemoryToken::new(
            Address::from("0xToken"),
            "Blockmaker Token",
            "BM",
            Address::from("0xA"),
        )
    }

    fn mint_call(to: &str, amount: u64) -> ContractCall {
        ContractCall {
            contract: Address::from("0xToken"),
            function: ContractFunction::Mint {
                to: Address::from(to),
                amount: U256::from(amount),
            },
        }
    }

    #[tokio::test]
    async fn owner_mint_credits_recipient_once_watched() {
        let token = token();
        token.connect(Some(Address::from("0xA")));
        let prepared = token.prepare_write(mint_call("0xB", 7)).await.expect("prepare");
        let handle = token.submit_write(prepared).await.expect("submit");
        assert_eq!(token.total_supply(), U256::ZERO);

        let statuses: Vec<_> = token.watch(&handle).collect().await;
        assert_eq!(statuses, vec![TxStatus::Pending, TxStatus::Confirmed]);
        assert_eq!(token.balance_of(&Address::from("0xB")), U256::from(7u8));
        assert_eq!(token.total_supply(), U256::from(7u8));

        // Watching again replays the receipt without minting twice.
        let again: Vec<_> = token.watch(&handle).collect().await;
        assert_eq!(again.last(), Some(&TxStatus::Confirmed));
        assert_eq!(token.total_supply(), U256::from(7u8));
    }

    #[tokio::test]
    async fn non_owner_mint_reverts_on_execution() {
        let token = token();
        token.connect(Some(Address::from("0xC")));
        let prepared = token.prepare_write(mint_call("0xB", 1)).await.expect("prepare");
        let handle = token.submit_write(prepared).await.expect("submit");
        let statuses: Vec<_> = token.watch(&handle).collect().await;
        assert_eq!(
            statuses.last(),
            Some(&TxStatus::Failed {
                reason: NOT_OWNER_REASON.into()
            })
        );
        assert_eq!(token.total_supply(), U256::ZERO);
    }

    #[tokio::test]
    async fn blank_recipient_and_foreign_contract_fail_preparation() {
        let token = token();
        assert!(token.prepare_write(mint_call("", 1)).await.is_err());
        assert!(token.prepare_write(mint_call("0xB", 0)).await.is_err());
        let mut foreign = mint_call("0xB", 1);
        foreign.contract = Address::from("0xElsewhere");
        assert!(token.prepare_write(foreign).await.is_err());
    }

    #[tokio::test]
    async fn submission_requires_connected_wallet() {
        let token = token();
        let prepared = token.prepare_write(mint_call("0xB", 1)).await.expect("prepare");
        let err = token.submit_write(prepared).await.expect_err("should fail");
        assert!(err.to_string().contains("not connected"));
    }

    #[tokio::test]
    async fn credit_and_ownership_changes_are_published() {
        let token = token();
        let mut supply = token.subscribe(&Address::from("0xToken"), ContractField::TotalSupply);
        let mut owner = token.subscribe(&Address::from("0xToken"), ContractField::Owner);

        token
            .credit(&Address::from("0xA"), U256::from(100u8))
            .expect("credit");
        token.transfer_ownership(Address::from("0xD"));

        assert_eq!(
            supply.recv().await.expect("supply update"),
            FieldValue::Uint(U256::from(100u8))
        );
        assert_eq!(
            owner.recv().await.expect("owner update"),
            FieldValue::Address(Address::from("0xD"))
        );
    }
}
