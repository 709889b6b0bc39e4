//! `cs2000` command-line tool
//!
//! Lists serial ports, initializes a CS2000-class meter and prints
//! luminance / chromaticity readings.

mod cli;
mod output;

use anyhow::Context;
use clap::Parser;
use cs2000_core::instrument::Cs2000;
use cs2000_core::protocol::list_ports;
use cs2000_core::simulator::{SimulatedCs2000, SIMULATED_PORT};
use tracing_subscriber::EnvFilter;

use cli::{Cli, CliCommand};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.session.log_level());

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let json = cli.session.json;

    if cli.command == CliCommand::Ports {
        return output::ports(&list_ports(), json);
    }

    let config = cli.session.session_config()?;
    let mut meter = if cli.session.demo {
        tracing::info!("Using simulated meter");
        let settings = config.connection.for_port(SIMULATED_PORT)?;
        let conn = SimulatedCs2000::new().connect_with(settings);
        Cs2000::new(conn).with_policy(config.init.failure_policy)
    } else {
        let port = config.connection.port.clone().unwrap_or_default();
        Cs2000::open(&config).with_context(|| format!("could not connect to {port:?}"))?
    };

    let result = measure(&mut meter, cli.command, &config.init, json);
    let closed = meter.close();

    result?;
    closed.context("failed to close port")?;
    Ok(())
}

fn measure(
    meter: &mut Cs2000,
    command: CliCommand,
    init: &cs2000_core::config::InitConfig,
    json: bool,
) -> anyhow::Result<()> {
    let report = meter.initialize(init).context("initialization failed")?;

    match command {
        CliCommand::Init => output::init_report(&report, json),
        CliCommand::Lv => {
            let lv = meter.get_luminance().context("luminance read failed")?;
            output::luminance(&lv, json)
        }
        CliCommand::Xylv => {
            let reading = meter
                .get_chromaticity_and_luminance()
                .context("chromaticity read failed")?;
            output::chromaticity(&reading, json)
        }
        CliCommand::Ports => Ok(()),
    }
}
