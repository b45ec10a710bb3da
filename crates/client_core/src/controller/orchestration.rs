//! Runs reducer effects against the ports and feeds their results back as events.

use std::{collections::VecDeque, sync::Arc};

use futures::{stream::BoxStream, StreamExt};
use shared::{
    domain::{ContractField, FieldValue, OwnerState, TransactionHandle, TxStatus},
    error::MintError,
};
use tracing::{debug, info, warn};

use crate::{
    config::MintConfig,
    ports::{ContractReader, ContractWriter, Notifier, TransactionWatcher, WalletConnection},
};

use super::{
    events::{Effect, MintEvent, MintFormView, Outcome, Phase},
    reducer::MintMachine,
};

const STREAM_ENDED_REASON: &str = "transaction status stream ended";

#[derive(Clone)]
pub struct MintPorts {
    pub reader: Arc<dyn ContractReader>,
    pub writer: Arc<dyn ContractWriter>,
    pub watcher: Arc<dyn TransactionWatcher>,
    pub wallet: Arc<dyn WalletConnection>,
    pub notifier: Arc<dyn Notifier>,
}

struct ActiveWatch {
    handle: TransactionHandle,
    statuses: BoxStream<'static, TxStatus>,
}

pub struct MintController {
    config: MintConfig,
    machine: MintMachine,
    ports: MintPorts,
    watch: Option<ActiveWatch>,
}

impl MintController {
    pub fn new(config: MintConfig, ports: MintPorts) -> Self {
        Self {
            machine: MintMachine::new(&config),
            config,
            ports,
            watch: None,
        }
    }

    pub fn config(&self) -> &MintConfig {
        &self.config
    }

    pub fn machine(&self) -> &MintMachine {
        &self.machine
    }

    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    pub fn view(&self) -> MintFormView {
        self.machine.view()
    }

    /// Re-reads the contract owner and the wallet's caller. Safe to call at any phase.
    pub async fn sync_authorization(&mut self) -> Result<(), MintError> {
        let owner = match self
            .ports
            .reader
            .read_field(&self.config.contract_address, ContractField::Owner)
            .await
        {
            Ok(FieldValue::Address(owner)) if !owner.is_blank() => OwnerState::Known(owner),
            Ok(other) => {
                warn!(value = %other, "mint: owner field is not an address");
                OwnerState::Unknown
            }
            Err(err) => {
                warn!(error = %err, "mint: failed to read contract owner");
                OwnerState::Unknown
            }
        };
        let caller = self.ports.wallet.current_caller();
        self.dispatch(MintEvent::OwnerObserved(owner)).await?;
        self.dispatch(MintEvent::CallerObserved(caller)).await
    }

    pub async fn observe_owner(&mut self, owner: OwnerState) -> Result<(), MintError> {
        self.dispatch(MintEvent::OwnerObserved(owner)).await
    }

    pub async fn set_recipient(&mut self, recipient: impl Into<String>) -> Result<(), MintError> {
        self.dispatch(MintEvent::RecipientChanged(recipient.into()))
            .await
    }

    pub async fn set_amount(&mut self, amount: impl Into<String>) -> Result<(), MintError> {
        self.dispatch(MintEvent::AmountChanged(amount.into())).await
    }

    /// Sends the prepared mint. `Ok(None)` means a transaction was already in flight and
    /// nothing new was sent.
    pub async fn submit(&mut self) -> Result<Option<TransactionHandle>, MintError> {
        let already_in_flight = self.machine.is_in_flight();
        self.dispatch(MintEvent::SubmitRequested).await?;
        if already_in_flight {
            return Ok(None);
        }
        if let Some(handle) = self.machine.in_flight_handle() {
            return Ok(Some(handle.clone()));
        }
        match self.machine.last_outcome() {
            Some(Outcome::Failed(err)) => Err(err.clone()),
            _ => Err(MintError::Submission(
                "submission finished without a transaction handle".into(),
            )),
        }
    }

    /// Follows the in-flight transaction until the watcher reports a terminal status.
    /// Returns `Ok(None)` when nothing is being watched.
    pub async fn settle(&mut self) -> Result<Option<TransactionHandle>, MintError> {
        let Some(mut watch) = self.watch.take() else {
            return Ok(None);
        };
        while let Some(status) = watch.statuses.next().await {
            debug!(handle = %watch.handle, status = ?status, "mint: watcher update");
            let terminal = status.is_terminal();
            self.dispatch(MintEvent::WatchReported {
                handle: watch.handle.clone(),
                status,
            })
            .await?;
            if terminal {
                break;
            }
        }

        if self.machine.in_flight_handle() == Some(&watch.handle) {
            self.dispatch(MintEvent::WatchReported {
                handle: watch.handle.clone(),
                status: TxStatus::Failed {
                    reason: STREAM_ENDED_REASON.into(),
                },
            })
            .await?;
        }

        match self.machine.last_outcome() {
            Some(Outcome::Confirmed(handle)) => Ok(Some(handle.clone())),
            Some(Outcome::Failed(err)) => Err(err.clone()),
            None => Err(MintError::Confirmation(STREAM_ENDED_REASON.into())),
        }
    }

    /// Submits and then waits for the outcome.
    pub async fn mint(&mut self) -> Result<Option<TransactionHandle>, MintError> {
        if self.submit().await?.is_none() {
            return Ok(None);
        }
        self.settle().await
    }

    async fn dispatch(&mut self, event: MintEvent) -> Result<(), MintError> {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let step = self.machine.handle(event)?;
            for effect in step.effects {
                if let Some(follow_up) = self.run_effect(effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
        Ok(())
    }

    async fn run_effect(&mut self, effect: Effect) -> Option<MintEvent> {
        match effect {
            Effect::Prepare { revision, call } => {
                let result = self
                    .ports
                    .writer
                    .prepare_write(call)
                    .await
                    .map_err(|err| err.to_string());
                Some(MintEvent::PrepareResolved { revision, result })
            }
            Effect::Submit(prepared) => {
                info!(
                    contract = %prepared.call.contract,
                    function = prepared.call.function.abi_name(),
                    "mint: submitting prepared call"
                );
                let result = self
                    .ports
                    .writer
                    .submit_write(prepared)
                    .await
                    .map_err(|err| err.to_string());
                Some(MintEvent::SubmitResolved(result))
            }
            Effect::Watch(handle) => {
                info!(handle = %handle, "mint: watching transaction");
                let statuses = self.ports.watcher.watch(&handle);
                self.watch = Some(ActiveWatch { handle, statuses });
                None
            }
            Effect::Notify(notification) => {
                self.ports.notifier.notify(notification);
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/orchestration_tests.rs"]
mod tests;
