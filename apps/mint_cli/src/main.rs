use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    load_settings, load_token_info, InMemoryToken, MintController, MintPorts, Notifier,
    TokenInfoView, TotalSupplyMonitor,
};
use shared::{
    domain::{Address, Notification, NotificationKind},
    error::ValidationError,
    units::parse_amount,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SIMULATED_CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// Mint tokens against a simulated token contract and print the resulting views.
#[derive(Parser, Debug)]
struct Args {
    /// TOML settings file with contract_address, scaling_factor and token_symbol.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Contract address; overrides file and environment settings.
    #[arg(long)]
    contract: Option<String>,
    #[arg(long, default_value = "0xA11CE")]
    owner: String,
    /// Connected wallet address. Defaults to the owner.
    #[arg(long)]
    caller: Option<String>,
    #[arg(long)]
    recipient: String,
    #[arg(long)]
    amount: String,
    /// Supply credited to the owner before minting, in human units.
    #[arg(long, default_value = "0")]
    initial_supply: String,
    /// Have the wallet refuse the submission with this reason.
    #[arg(long)]
    reject_submission: Option<String>,
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let tag = match notification.kind {
            NotificationKind::Success => "success",
            NotificationKind::Failure => "failure",
        };
        println!(
            "[{tag}] {} ({})",
            notification.message,
            notification.at.to_rfc3339()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut config = load_settings(args.config.as_deref())?;
    if let Some(contract) = args.contract {
        config.contract_address = Address::new(contract);
    }
    if config.contract_address.is_blank() {
        config.contract_address = Address::new(SIMULATED_CONTRACT);
    }
    config.validate()?;

    let owner = Address::new(args.owner);
    let token = Arc::new(InMemoryToken::new(
        config.contract_address.clone(),
        "Blockmaker Token",
        config.token_symbol.clone(),
        owner.clone(),
    ));
    match parse_amount(&args.initial_supply, config.scaling_factor()) {
        Ok(amount) => token.credit(&owner, amount)?,
        Err(ValidationError::NotPositive) => {}
        Err(err) => return Err(err).context("invalid --initial-supply"),
    }
    let caller = args.caller.map(Address::new).unwrap_or_else(|| owner.clone());
    token.connect(Some(caller));
    token.reject_submissions(args.reject_submission);

    println!("{}", serde_json::to_string(&TokenInfoView::loading())?);
    let token_info = load_token_info(token.as_ref(), &config).await;
    println!("{}", serde_json::to_string_pretty(&token_info)?);
    let mut supply = TotalSupplyMonitor::start(token.clone(), &config).await;
    println!("total supply: {}", serde_json::to_string(supply.view())?);

    let ports = MintPorts {
        reader: token.clone(),
        writer: token.clone(),
        watcher: token.clone(),
        wallet: token.clone(),
        notifier: Arc::new(ConsoleNotifier),
    };
    let mut controller = MintController::new(config, ports);
    controller.sync_authorization().await?;
    if !controller.machine().is_authorized() {
        println!("{}", serde_json::to_string_pretty(&controller.view())?);
        bail!("connected wallet is not the token owner; minting is disabled");
    }
    controller.set_recipient(args.recipient).await?;
    controller.set_amount(args.amount).await?;
    println!("{}", serde_json::to_string_pretty(&controller.view())?);

    let outcome = controller.mint().await;
    println!("{}", serde_json::to_string_pretty(&controller.view())?);

    match outcome {
        Ok(Some(handle)) => {
            info!(handle = %handle, "mint_cli: mint confirmed");
            if let Ok(Some(view)) =
                tokio::time::timeout(Duration::from_millis(250), supply.next_update()).await
            {
                println!("total supply: {}", serde_json::to_string(view)?);
            }
            Ok(())
        }
        Ok(None) => {
            println!("a mint is already in flight; nothing new was submitted");
            Ok(())
        }
        Err(err) => Err(err).context("mint failed"),
    }
}
