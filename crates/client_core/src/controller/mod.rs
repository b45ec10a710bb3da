//! Controller layer: mint events, reducer-like state transitions, and port orchestration.

pub mod events;
pub mod orchestration;
pub mod reducer;

pub use events::{Effect, MintEvent, MintFormView, Outcome, Phase, Step};
pub use orchestration::{MintController, MintPorts};
pub use reducer::MintMachine;
