//! legbridge command line
//!
//! Sends named commands to the controller board, either over the serial
//! port or to an in-process simulated board.

mod demo;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use legbridge_core::protocol::{list_ports, Gateway, LinkConfig, ScanMode};
use legbridge_core::registry::CommandRegistry;
use legbridge_core::sim::SimulatedBoard;

#[derive(Parser, Debug)]
#[command(name = "legbridge", version, about = "Serial command gateway for legged-robot controller boards")]
struct Cli {
    /// JSON link configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serial port (overrides the config file)
    #[arg(long, global = true)]
    port: Option<String>,

    /// Baud rate (overrides the config file)
    #[arg(long, global = true)]
    baud: Option<u32>,

    /// Response timeout in milliseconds (overrides the config file)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Drop bytes trailing a response frame, like the stock firmware expects
    #[arg(long, global = true)]
    reset_after_frame: bool,

    /// JSON file with extra command definitions
    #[arg(long, global = true)]
    commands: Option<PathBuf>,

    /// Talk to a simulated board instead of the serial port
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Run one command, e.g. `invoke body_height height=60`
    Invoke {
        name: String,
        /// Parameters as key=value
        params: Vec<String>,
    },
    /// Run the power-on / stand-up / walk / power-off demo sequence
    Demo,
    /// List known commands and their parameters
    Commands,
    /// List serial ports
    Ports,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let registry = load_registry(cli.commands.as_deref())?;

    match &cli.action {
        Action::Commands => print_commands(&registry),
        Action::Ports => print_ports(),
        Action::Invoke { name, params } => {
            let params = parse_params(params)?;
            let gateway = connect(&cli, registry)?;
            println!("{}", gateway.invoke(name, params).await);
            gateway.shutdown().await;
        }
        Action::Demo => {
            let gateway = connect(&cli, registry)?;
            demo::run(&gateway).await;
            gateway.shutdown().await;
        }
    }
    Ok(())
}

fn print_commands(registry: &CommandRegistry) {
    for (name, definition) in registry.iter() {
        let params = definition.param_names();
        if params.is_empty() {
            println!("{name}");
        } else {
            println!("{name} {}", params.join(" "));
        }
    }
}

fn print_ports() {
    for port in list_ports() {
        match &port.product {
            Some(product) => println!("{} ({product})", port.name),
            None => println!("{}", port.name),
        }
    }
}

/// Start a gateway on the configured port, or on a simulated board
fn connect(cli: &Cli, registry: CommandRegistry) -> Result<Gateway> {
    let config = link_config(cli)?;
    if cli.simulate {
        let (link, _board) = SimulatedBoard::new().spawn();
        return Ok(Gateway::spawn(link, registry, &config));
    }
    Gateway::open(&config, registry).with_context(|| format!("failed to open {}", config.port_name))
}

fn load_registry(extra: Option<&std::path::Path>) -> Result<CommandRegistry> {
    let registry = CommandRegistry::standard();
    let Some(path) = extra else {
        return Ok(registry);
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let extra = CommandRegistry::from_json(&content)
        .with_context(|| format!("invalid command file {}", path.display()))?;
    Ok(registry.merge(extra))
}

fn link_config(cli: &Cli) -> Result<LinkConfig> {
    let mut config = match &cli.config {
        Some(path) => LinkConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => LinkConfig::default(),
    };
    if let Some(port) = &cli.port {
        config.port_name = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.response_timeout_ms = timeout_ms;
    }
    if cli.reset_after_frame {
        config.scan_mode = ScanMode::ResetAfterFrame;
    }
    Ok(config)
}

/// Parse `key=value` arguments. The first `=` splits; later ones belong to the value.
fn parse_params(args: &[String]) -> Result<HashMap<String, String>> {
    let mut params = HashMap::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("parameter {arg:?} is not key=value");
        };
        if key.is_empty() {
            bail!("parameter {arg:?} has an empty key");
        }
        params.insert(key.to_string(), value.to_string());
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_params() {
        let params = parse_params(&["height=60".to_string(), "x=a=b".to_string()]).unwrap();
        assert_eq!(params.get("height").map(String::as_str), Some("60"));
        assert_eq!(params.get("x").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_parse_params_rejects_bare_word() {
        assert!(parse_params(&["height".to_string()]).is_err());
        assert!(parse_params(&["=60".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_simulated_link() {
        let cli = Cli::parse_from(["legbridge", "--simulate", "invoke", "power_on"]);
        let gateway = connect(&cli, CommandRegistry::standard()).unwrap();
        assert_eq!(gateway.invoke("power_on", HashMap::new()).await, "ok");
        assert_eq!(gateway.invoke("is_power_on", HashMap::new()).await, "true");
        gateway.shutdown().await;
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "legbridge",
            "--port",
            "/dev/ttyUSB0",
            "--timeout-ms",
            "250",
            "--reset-after-frame",
            "invoke",
            "power_on",
        ]);
        let config = link_config(&cli).unwrap();
        assert_eq!(config.port_name, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 38400);
        assert_eq!(config.response_timeout_ms, 250);
        assert_eq!(config.scan_mode, ScanMode::ResetAfterFrame);
    }
}
