pub mod config;
pub mod controller;
pub mod ports;
pub mod sim;
pub mod token_info;

pub use config::{load_settings, ConfigError, MintConfig};
pub use controller::{MintController, MintFormView, MintPorts, Phase};
pub use ports::{ContractReader, ContractWriter, Notifier, TransactionWatcher, WalletConnection};
pub use sim::InMemoryToken;
pub use token_info::{
    load_token_info, TokenInfoStatuses, TokenInfoView, TotalSupplyMonitor, TotalSupplyView,
};
