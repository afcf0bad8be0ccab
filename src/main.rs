//! Prints the kami search parameters after all config sources are applied.

use kami_params::{config, OptionsParser, SearchParams};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "kami-params", about = "Resolve and inspect kami search parameters")]
struct Args {
    /// Config file (defaults to params.json in the kami data directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print UCI option declarations instead of resolved values
    #[arg(long)]
    uci: bool,

    /// Print resolved values as JSON
    #[arg(long, conflicts_with = "uci")]
    json: bool,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Option overrides, as key=value
    overrides: Vec<String>,
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut parser = OptionsParser::new();
    SearchParams::populate(&mut parser).context("failed to declare search options")?;

    if args.uci {
        for def in parser.schema().iter() {
            println!("{}", def.uci_declaration());
        }

        return Ok(());
    }

    let options = parser.defaults();

    match &args.config {
        Some(path) => {
            config::load_file(&options, path)
                .with_context(|| format!("failed to load {}", path.display()))?;
        }
        None => {
            config::load_default(&options).context("failed to load default config")?;
        }
    }

    config::apply_overrides(&options, &args.overrides).context("invalid option override")?;

    let params = SearchParams::new(&options).context("failed to resolve search parameters")?;
    info!(
        minibatch = params.get_mini_batch_size(),
        multipv = params.get_multi_pv(),
        "resolved"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&options.values())?);
        return Ok(());
    }

    for def in options.schema().iter() {
        println!("{:<22} = {}", def.key(), options.value(def.key())?);
    }

    Ok(())
}
