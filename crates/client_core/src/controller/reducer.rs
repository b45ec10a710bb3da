//! Pure mint lifecycle: events in, phase changes and effects out. No I/O happens here.

use alloy_primitives::U256;
use shared::{
    domain::{
        Address, ContractCall, MintRequest, Notification, OwnerState, PreparedWrite,
        TransactionHandle, TxStatus,
    },
    error::{MintError, ValidationError},
    units::parse_amount,
};
use tracing::{debug, info, warn};

use crate::config::MintConfig;

use super::events::{Effect, MintEvent, MintFormView, Outcome, Phase, Step};

pub const MINT_SUCCESS_MESSAGE: &str = "Mint completed successfully. Check your balance.";
pub const MINT_FAILURE_MESSAGE: &str = "Mint could not be completed. Please try again later.";
pub const ONLY_OWNER_LABEL: &str = "Only Owner Can Mint";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Prepared(PreparedWrite),
    Submitting,
    Submitted(TransactionHandle),
}

impl Lifecycle {
    fn phase(&self) -> Phase {
        match self {
            Lifecycle::Idle => Phase::Idle,
            Lifecycle::Prepared(_) => Phase::Prepared,
            Lifecycle::Submitting => Phase::Submitting,
            Lifecycle::Submitted(_) => Phase::Submitted,
        }
    }

    fn is_in_flight(&self) -> bool {
        matches!(self, Lifecycle::Submitting | Lifecycle::Submitted(_))
    }
}

#[derive(Debug, Clone)]
pub struct MintMachine {
    contract: Address,
    scaling_factor: U256,
    token_symbol: String,
    recipient: String,
    amount: String,
    owner: OwnerState,
    caller: Option<Address>,
    lifecycle: Lifecycle,
    revision: u64,
    awaiting_prepare: Option<u64>,
    last_outcome: Option<Outcome>,
}

impl MintMachine {
    pub fn new(config: &MintConfig) -> Self {
        Self {
            contract: config.contract_address.clone(),
            scaling_factor: config.scaling_factor(),
            token_symbol: config.token_symbol.clone(),
            recipient: String::new(),
            amount: String::new(),
            owner: OwnerState::Unknown,
            caller: None,
            lifecycle: Lifecycle::Idle,
            revision: 0,
            awaiting_prepare: None,
            last_outcome: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn owner(&self) -> &OwnerState {
        &self.owner
    }

    pub fn caller(&self) -> Option<&Address> {
        self.caller.as_ref()
    }

    pub fn in_flight_handle(&self) -> Option<&TransactionHandle> {
        match &self.lifecycle {
            Lifecycle::Submitted(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.lifecycle.is_in_flight()
    }

    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last_outcome.as_ref()
    }

    /// Display gate only; the contract enforces ownership on its own.
    pub fn is_authorized(&self) -> bool {
        match (&self.caller, self.owner.address()) {
            (Some(caller), Some(owner)) => !caller.is_blank() && caller == owner,
            _ => false,
        }
    }

    pub fn validate(&self) -> Result<MintRequest, ValidationError> {
        let recipient = self.recipient.trim();
        if recipient.is_empty() {
            return Err(ValidationError::MissingRecipient);
        }
        let amount = parse_amount(&self.amount, self.scaling_factor)?;
        Ok(MintRequest {
            recipient: Address::new(recipient),
            amount,
        })
    }

    pub fn view(&self) -> MintFormView {
        let authorized = self.is_authorized();
        let is_loading = self.lifecycle.is_in_flight();
        let submit_label = if !authorized {
            ONLY_OWNER_LABEL.to_string()
        } else if is_loading {
            format!("Minting {} Tokens...", self.token_symbol)
        } else {
            format!("Mint {} Tokens", self.token_symbol)
        };
        MintFormView {
            recipient: self.recipient.clone(),
            amount: self.amount.clone(),
            phase: self.phase(),
            inputs_locked: !authorized || is_loading,
            submit_enabled: authorized && matches!(self.lifecycle, Lifecycle::Prepared(_)),
            is_loading,
            submit_label,
        }
    }

    pub fn handle(&mut self, event: MintEvent) -> Result<Step, MintError> {
        debug!(event = event.name(), phase = ?self.phase(), "mint: handling event");
        let mut step = Step::default();
        match event {
            MintEvent::RecipientChanged(value) => {
                self.ensure_editable()?;
                self.recipient = value;
                self.reprepare(&mut step);
            }
            MintEvent::AmountChanged(value) => {
                self.ensure_editable()?;
                self.amount = value;
                self.reprepare(&mut step);
            }
            MintEvent::OwnerObserved(owner) => {
                if owner != self.owner {
                    info!(owner = ?owner.address(), "mint: owner updated");
                    self.owner = owner;
                    self.reprepare_unless_in_flight(&mut step);
                }
            }
            MintEvent::CallerObserved(caller) => {
                if caller != self.caller {
                    info!(caller = ?caller, "mint: connected caller updated");
                    self.caller = caller;
                    self.reprepare_unless_in_flight(&mut step);
                }
            }
            MintEvent::PrepareResolved { revision, result } => {
                self.on_prepare_resolved(revision, result, &mut step);
            }
            MintEvent::SubmitRequested => self.on_submit_requested(&mut step)?,
            MintEvent::SubmitResolved(result) => self.on_submit_resolved(result, &mut step),
            MintEvent::WatchReported { handle, status } => {
                self.on_watch_reported(handle, status, &mut step)
            }
        }
        Ok(step)
    }

    /// Inputs follow the view: locked while in flight and for anyone but the owner.
    fn ensure_editable(&self) -> Result<(), MintError> {
        if self.lifecycle.is_in_flight() {
            return Err(MintError::InputsLocked);
        }
        if !self.is_authorized() {
            return Err(self.authorization_error());
        }
        Ok(())
    }

    fn authorization_error(&self) -> MintError {
        MintError::Authorization {
            caller: self.caller.clone(),
            owner: self.owner.address().cloned(),
        }
    }

    fn enter(&mut self, lifecycle: Lifecycle, step: &mut Step) {
        let from = self.phase();
        self.lifecycle = lifecycle;
        let to = self.phase();
        if from != to {
            info!(from = ?from, to = ?to, "mint: lifecycle transition");
            step.visited.push(to);
        }
    }

    fn pass_through(&self, phase: Phase, step: &mut Step) {
        info!(from = ?self.phase(), to = ?phase, "mint: lifecycle transition");
        step.visited.push(phase);
    }

    fn reprepare_unless_in_flight(&mut self, step: &mut Step) {
        if self.lifecycle.is_in_flight() {
            debug!("mint: authorization change while in flight does not cancel the transaction");
            return;
        }
        self.reprepare(step);
    }

    /// Drops any existing preparation and asks for a fresh one when the form allows it.
    fn reprepare(&mut self, step: &mut Step) {
        self.revision += 1;
        self.awaiting_prepare = None;
        if matches!(self.lifecycle, Lifecycle::Prepared(_)) {
            self.enter(Lifecycle::Idle, step);
        }
        if !self.is_authorized() {
            return;
        }
        let Ok(request) = self.validate() else {
            return;
        };
        self.awaiting_prepare = Some(self.revision);
        step.effects.push(Effect::Prepare {
            revision: self.revision,
            call: ContractCall::mint(self.contract.clone(), request),
        });
    }

    fn on_prepare_resolved(
        &mut self,
        revision: u64,
        result: Result<PreparedWrite, String>,
        step: &mut Step,
    ) {
        if self.awaiting_prepare != Some(revision) || self.lifecycle.is_in_flight() {
            debug!(revision, "mint: discarding stale preparation");
            return;
        }
        self.awaiting_prepare = None;
        match result {
            Ok(prepared) => self.enter(Lifecycle::Prepared(prepared), step),
            Err(reason) => warn!(revision, %reason, "mint: preparation rejected"),
        }
    }

    fn on_submit_requested(&mut self, step: &mut Step) -> Result<(), MintError> {
        if self.lifecycle.is_in_flight() {
            debug!("mint: submit ignored while a transaction is in flight");
            return Ok(());
        }
        if !self.is_authorized() {
            return Err(self.authorization_error());
        }
        self.validate()?;
        let Lifecycle::Prepared(prepared) = &self.lifecycle else {
            return Err(MintError::NotPrepared);
        };
        let prepared = prepared.clone();
        self.enter(Lifecycle::Submitting, step);
        step.effects.push(Effect::Submit(prepared));
        Ok(())
    }

    fn on_submit_resolved(&mut self, result: Result<TransactionHandle, String>, step: &mut Step) {
        if self.lifecycle != Lifecycle::Submitting {
            warn!("mint: submission result arrived with no submission pending");
            return;
        }
        match result {
            Ok(handle) => {
                self.enter(Lifecycle::Submitted(handle.clone()), step);
                step.effects.push(Effect::Watch(handle));
            }
            Err(reason) => self.fail(MintError::Submission(reason), step),
        }
    }

    fn on_watch_reported(&mut self, handle: TransactionHandle, status: TxStatus, step: &mut Step) {
        if self.in_flight_handle() != Some(&handle) {
            debug!(handle = %handle, "mint: ignoring status for untracked transaction");
            return;
        }
        match status {
            TxStatus::Pending => {}
            TxStatus::Confirmed => {
                self.pass_through(Phase::Confirmed, step);
                step.effects
                    .push(Effect::Notify(Notification::success(MINT_SUCCESS_MESSAGE)));
                self.recipient.clear();
                self.amount.clear();
                self.last_outcome = Some(Outcome::Confirmed(handle));
                self.revision += 1;
                self.awaiting_prepare = None;
                self.lifecycle = Lifecycle::Idle;
                step.visited.push(Phase::Idle);
            }
            TxStatus::Failed { reason } => self.fail(MintError::Confirmation(reason), step),
        }
    }

    /// Failed keeps the form as typed so the user can retry.
    fn fail(&mut self, error: MintError, step: &mut Step) {
        warn!(error = %error, "mint: attempt failed");
        self.pass_through(Phase::Failed, step);
        if error.is_user_visible() {
            step.effects
                .push(Effect::Notify(Notification::failure(MINT_FAILURE_MESSAGE)));
        }
        self.last_outcome = Some(Outcome::Failed(error));
        self.lifecycle = Lifecycle::Idle;
        step.visited.push(Phase::Idle);
        self.reprepare(step);
    }
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod tests;
