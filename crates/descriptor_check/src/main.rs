use std::io;
use std::process::exit;

use clap::Parser;
use descriptor_check::{run, Cli, EXIT_LOAD_FAILED};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "descriptor_check=warn,descriptor_core=error".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let code = match run(&cli, &mut io::stdout().lock(), &mut io::stderr().lock()) {
        Ok(code) => code,
        Err(err) => {
            error!("descriptor check aborted: {err:#}");
            EXIT_LOAD_FAILED
        }
    };
    exit(code);
}
