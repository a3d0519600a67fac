//! # roam-agent
//!
//! Subscriber daemon binary — loads settings, wires the link simulator
//! and the consumption loop together, and runs until interrupted.

#![deny(unsafe_code)]

mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use roam_broker::{AmqpConnector, Responder, SessionConfig, SessionManager, Subscriber};
use roam_core::identity;
use roam_link::{Gate, LinkSimulator};
use roam_logging::LogFormat;
use roam_settings::RoamSettings;
use tracing::info;

use crate::shutdown::ShutdownCoordinator;

/// Mobility-resilient message-queue subscriber.
#[derive(Parser, Debug)]
#[command(name = "roam-agent", about = "Mobility-resilient message-queue subscriber")]
struct Cli {
    /// Path to the settings file (default: `~/.roam/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Broker host; repeat the flag for a failover list.
    #[arg(long = "host")]
    hosts: Vec<String>,

    /// Broker port shared by all hosts.
    #[arg(long)]
    port: Option<u16>,

    /// Broker account name.
    #[arg(long)]
    username: Option<String>,

    /// Broker account password.
    #[arg(long)]
    password: Option<String>,

    /// Consumer tag (default: the derived per-host queue name).
    #[arg(long)]
    consumer_tag: Option<String>,

    /// Disable the connectivity simulator; the gate stays open.
    #[arg(long)]
    no_link_sim: bool,

    /// Log filter, e.g. `debug` or `roam_broker=trace`.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Fold CLI flags over loaded settings (CLI wins).
    fn apply(&self, settings: &mut RoamSettings) {
        if !self.hosts.is_empty() {
            settings.broker.hosts = self.hosts.clone();
        }
        if let Some(port) = self.port {
            settings.broker.port = port;
        }
        if let Some(username) = &self.username {
            settings.broker.username = username.clone();
        }
        if let Some(password) = &self.password {
            settings.broker.password = password.clone();
        }
        if let Some(tag) = &self.consumer_tag {
            settings.broker.consumer_tag = Some(tag.clone());
        }
        if self.no_link_sim {
            settings.link.enabled = false;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => roam_settings::load_settings_from_path(path),
        None => roam_settings::load_settings(),
    }
    .context("failed to load settings")?;
    cli.apply(&mut settings);
    settings.validate().context("invalid configuration")?;

    let format = if settings.logging.json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    roam_logging::init(&settings.logging.level, format);

    let host = identity::host_identity();
    let queue = identity::consumer_queue_name(&settings.broker.queue_prefix, &host);
    let consumer_tag = settings
        .broker
        .consumer_tag
        .clone()
        .unwrap_or_else(|| queue.clone());

    info!(
        %queue,
        %consumer_tag,
        hosts = ?settings.broker.hosts,
        link_sim = settings.link.enabled,
        "starting subscriber"
    );

    let endpoints = settings.broker.endpoints()?;
    let session_config = SessionConfig {
        exchange: settings.broker.exchange.clone(),
        queue,
        response_queue: settings.broker.response_queue.clone(),
        consumer_tag: consumer_tag.clone(),
        connect_delay: settings.broker.connect_delay(),
        prefetch: settings.broker.prefetch,
    };
    let manager = SessionManager::new(Arc::new(AmqpConnector::new()), endpoints, session_config)
        .context("invalid broker configuration")?;

    let gate = Gate::new(true);
    gate.on_edge(|up| {
        if up {
            info!("link up — resuming message intake");
        } else {
            info!("link down — pausing message intake");
        }
    });

    let coordinator = ShutdownCoordinator::new();
    let mut handles = Vec::new();

    if settings.link.enabled {
        let simulator = LinkSimulator::new(settings.link.profile, gate.clone());
        handles.push(tokio::spawn(simulator.run(coordinator.token())));
    } else {
        info!("link simulation disabled — gate stays open");
    }

    let responder = Responder::new(consumer_tag, settings.broker.response_queue.clone());
    let subscriber = Subscriber::new(manager, gate, responder, coordinator.token());
    handles.push(tokio::spawn(subscriber.run()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");
    coordinator.graceful_shutdown(handles, None).await;
    Ok(())
}
