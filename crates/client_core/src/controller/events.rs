//! Events fed into the mint state machine and the effects it asks the orchestrator to run.

use serde::Serialize;
use shared::{
    domain::{
        Address, ContractCall, Notification, OwnerState, PreparedWrite, TransactionHandle,
        TxStatus,
    },
    error::MintError,
};

#[derive(Debug, Clone)]
pub enum MintEvent {
    RecipientChanged(String),
    AmountChanged(String),
    OwnerObserved(OwnerState),
    CallerObserved(Option<Address>),
    PrepareResolved {
        revision: u64,
        result: Result<PreparedWrite, String>,
    },
    SubmitRequested,
    SubmitResolved(Result<TransactionHandle, String>),
    WatchReported {
        handle: TransactionHandle,
        status: TxStatus,
    },
}

impl MintEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MintEvent::RecipientChanged(_) => "recipient_changed",
            MintEvent::AmountChanged(_) => "amount_changed",
            MintEvent::OwnerObserved(_) => "owner_observed",
            MintEvent::CallerObserved(_) => "caller_observed",
            MintEvent::PrepareResolved { .. } => "prepare_resolved",
            MintEvent::SubmitRequested => "submit_requested",
            MintEvent::SubmitResolved(_) => "submit_resolved",
            MintEvent::WatchReported { .. } => "watch_reported",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Effect {
    Prepare { revision: u64, call: ContractCall },
    Submit(PreparedWrite),
    Watch(TransactionHandle),
    Notify(Notification),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Prepared,
    /// Waiting for the write port to hand back a transaction handle.
    Submitting,
    Submitted,
    Confirmed,
    Failed,
}

/// What a single event did: phases entered in order, plus effects to run.
#[derive(Debug, Default)]
pub struct Step {
    pub visited: Vec<Phase>,
    pub effects: Vec<Effect>,
}

impl Step {
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Notify(notification) => Some(notification),
            _ => None,
        })
    }
}

/// How the last mint attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Confirmed(TransactionHandle),
    Failed(MintError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintFormView {
    pub recipient: String,
    pub amount: String,
    pub phase: Phase,
    pub inputs_locked: bool,
    pub submit_enabled: bool,
    pub is_loading: bool,
    pub submit_label: String,
}
