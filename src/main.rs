// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;

use anyhow::Context as _;
use sme_fsm::config::consts::DEFAULT_CONFIG_PATH;
use sme_fsm::config::{load_and_validate_config, LoggingOptions, RuntimeBuilder};
use sme_fsm::demo::{self, SmeMessage};
use sme_fsm::engine::{Address, Context};
use sme_fsm::host;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DEFAULT_SSID: &str = "lab-network";
/// Firmware confirm latency used by the demo MIB
const MIB_LATENCY_MS: u64 = 25;
const FETCH_TIMEOUT_MS: u64 = 500;

fn init_logging(options: &LoggingOptions) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&options.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(options.ansi)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        eprintln!("Usage: {} [config.yaml] [ssid]", args[0]);
        eprintln!("Example: {} {} {}", args[0], DEFAULT_CONFIG_PATH, DEFAULT_SSID);
        return Ok(());
    }

    let config_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);
    let ssid = args.get(2).map(String::as_str).unwrap_or(DEFAULT_SSID);

    let cfg = load_and_validate_config(config_path)
        .with_context(|| format!("loading {}", config_path))?;
    init_logging(&cfg.logging);

    let (mut ctx, host_options): (Context<SmeMessage>, _) =
        RuntimeBuilder::from_config(&cfg).context("building engine context")?;
    let station = demo::install(&mut ctx, MIB_LATENCY_MS, FETCH_TIMEOUT_MS)
        .context("installing demo processes")?;

    println!("SME FSM demo");
    println!("════════════");
    println!("Config: {}", config_path);
    println!("SSID:   {}", ssid);
    println!();

    demo::script(&mut ctx, &station, ssid);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    let report = host::drive(&mut ctx, &host_options, cancel).await;
    println!(
        "Host stopped ({}) after {} dispatch passes, {} deliveries",
        report.stop.as_str(),
        report.passes,
        ctx.dispatched()
    );
    println!();

    println!("Environment deliveries:");
    for delivery in ctx.take_environment_events() {
        let sender = match delivery.sender() {
            Address::Instance(id) => ctx
                .dump(id)
                .map(|dump| format!("{} {}", dump.process, id))
                .unwrap_or_else(|| format!("instance {}", id)),
            Address::Environment => "environment".to_string(),
        };
        println!("  {:<28} {:?}", sender, delivery.message());
    }
    println!();

    println!("Instance dumps:");
    let dumps = serde_json::to_string_pretty(&ctx.dump_all()).context("serialising dumps")?;
    println!("{}", dumps);

    Ok(())
}
