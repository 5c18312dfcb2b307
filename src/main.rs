use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use whatsapp_relay::client::GatewayClient;
use whatsapp_relay::config::{self, Config};
use whatsapp_relay::event_log::EventLog;
use whatsapp_relay::logging;
use whatsapp_relay::server::{self, RelayServer, StartupError};

/// HTTP relay for sending WhatsApp messages and PDFs
#[derive(Debug, Parser)]
#[command(name = "whatsapp-relay", version, about)]
struct Cli {
    /// Config file (defaults to ~/.whatsapp-relay/config.toml when present)
    #[arg(short, long, env = "WA_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on; empty or non-numeric values fall back to 2408
    #[arg(short, long, env = "WA_RELAY_PORT")]
    port: Option<String>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Ask for the port on stdin before starting
    #[arg(long)]
    prompt_port: bool,

    /// Send without asking the session whether the number exists
    #[arg(long)]
    skip_registration_check: bool,

    /// Do not write the event log file
    #[arg(long)]
    no_event_log: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    async fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = &self.port {
            config.server.port = config::resolve_port(port);
        }
        if self.prompt_port {
            config.server.port = prompt_port().await?;
        }
        if self.skip_registration_check {
            config.dispatch.check_registration = false;
        }
        if self.no_event_log {
            config.logging.persist_events = false;
        }
        Ok(())
    }
}

async fn prompt_port() -> Result<u16> {
    tokio::task::spawn_blocking(|| -> Result<u16> {
        let mut stdout = std::io::stdout();
        write!(stdout, "Enter the port for the HTTP server: ")?;
        stdout.flush()?;

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("Failed to read port from stdin")?;
        Ok(config::resolve_port(&line))
    })
    .await
    .context("Port prompt task failed")?
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config).await?;

    if cli.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let _guard = logging::init(&config.logging)?;

    let event_log = Arc::new(EventLog::from_config(&config.logging).with_context(|| {
        format!(
            "Failed to open event log {}",
            config.logging.event_log.display()
        )
    })?);
    match event_log.path() {
        Some(path) => tracing::info!("Recording events to {}", path.display()),
        None => tracing::info!("Event log persistence disabled"),
    }

    let listener = match server::bind_listener(&config.server.host, config.server.port).await {
        Ok(listener) => listener,
        Err(e @ StartupError::PortInUse(_)) => {
            event_log.record(e.to_string());
            return Err(e.into());
        }
        Err(e) => {
            event_log.record(format!("Failed to check port: {e}"));
            return Err(e.into());
        }
    };

    let client = Arc::new(
        GatewayClient::new(config.gateway.clone()).context("Failed to build gateway client")?,
    );

    RelayServer::new(config, client, event_log)
        .serve(listener)
        .await
}
