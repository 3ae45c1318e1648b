use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Context, Result};
use serde::Deserialize;

use m110a_core::{ModeId, ModemConfig};
use m110a_server::{Server, ServerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "MS-DMT compatible serial tone modem server", long_about = None)]
struct Cli {
    /// Control socket port
    #[arg(long, default_value_t = 4999)]
    control_port: u16,

    /// Data socket port
    #[arg(long, default_value_t = 4998)]
    data_port: u16,

    /// Bind address for both sockets
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Initial data rate, e.g. 2400S
    #[arg(long, default_value = "2400S")]
    data_rate: String,

    /// Optional TOML file overriding the modem front-end parameters
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    modem: Option<ModemConfig>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let modem = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            let file: FileConfig = toml::from_str(&text)
                .wrap_err_with(|| format!("failed to parse {}", path.display()))?;
            file.modem.unwrap_or_default()
        }
        None => ModemConfig::default(),
    };
    modem.validate()?;

    let initial_mode = ModeId::from_rate_name(&args.data_rate)
        .ok_or_else(|| color_eyre::eyre::eyre!("unsupported data rate {}", args.data_rate))?;

    let config = ServerConfig {
        bind_addr: args.bind,
        control_port: args.control_port,
        data_port: args.data_port,
        modem,
        initial_mode,
    };

    let server = Server::bind(&config)?;
    eprintln!(
        "m110a-server listening: control {} data {}",
        server.control_addr()?,
        server.data_addr()?
    );
    server.serve()?;
    Ok(())
}
