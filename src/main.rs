//! samc CLI: compile SAM templates into typed function/resource specs.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "samc",
    version,
    about = "SAM template compiler: resolves intrinsics and conditions, emits typed specs for local emulation"
)]
struct Cli {
    #[command(subcommand)]
    command: samc::cli::Commands,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SAMC_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = samc::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
