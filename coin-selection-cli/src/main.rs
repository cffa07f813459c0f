use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use coin_selection::composer::ComposeRequest;
use coin_selection::simple_oracle::SimpleOracle;

/// demo binary: loads a compose request from a JSON file, runs it through
/// the coin-selection engine, and prints the resulting transaction
/// summary -- wired against [`SimpleOracle`], since the `cml`-feature
/// oracle requires a live transaction builder this demo doesn't carry.
#[derive(Parser, Debug)]
#[clap(version)]
struct Cli {
    /// path to a JSON-encoded compose request.
    #[clap(long, value_parser)]
    request: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let Cli { request } = Cli::parse();

    let raw = fs::read_to_string(&request)
        .with_context(|| format!("can't read request file {}", request.display()))?;
    let compose_request: ComposeRequest = serde_json::from_str(&raw)
        .with_context(|| format!("can't parse request file {}", request.display()))?;

    let params = compose_request
        .options
        .resolve_params(coin_selection::ProtocolParams::default());
    let mut oracle = SimpleOracle::new(params);

    let summary = coin_selection::compose(&compose_request, &mut oracle)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
