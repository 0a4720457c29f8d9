//! Ask a player's host which files it can play.
//!
//! Issues one `GET /api/available-files`, prints the status line and the raw
//! body, and exits. Any connection or protocol failure ends the process with
//! a non-zero status; nothing is retried.

mod transport;

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use query_core::{AvailabilityClient, ConnectionTarget, DEFAULT_HOST, DEFAULT_PORT};

#[derive(Debug, Parser)]
#[command(name = "query_files", version, infer_long_args = true)]
#[command(about = "query which files are available for play")]
struct Args {
    /// ip or host name of the http server (player's host)
    #[arg(long = "ip_address", value_name = "HOST", default_value = DEFAULT_HOST)]
    ip_address: String,

    /// port of the http server (player's host)
    #[arg(
        long,
        value_name = "PORT",
        default_value_t = i64::from(DEFAULT_PORT),
        allow_negative_numbers = true
    )]
    port: i64,
}

impl Args {
    /// The port is only range-checked here, once the query is about to run.
    fn target(&self) -> Result<ConnectionTarget> {
        let port = u16::try_from(self.port)
            .with_context(|| format!("port {} is out of range 0-65535", self.port))?;
        Ok(ConnectionTarget::new(&self.ip_address, port))
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    log::debug!("{args:?}");

    let client = AvailabilityClient::new(args.target()?);
    let request = client.build_available_files();
    let response = transport::execute(client.target(), &request)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&client.render_report(&response))?;
    stdout.flush()?;
    Ok(())
}
