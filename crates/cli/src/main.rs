use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::report::{print_summary, status_line};
use cli::{Args, RunSummary};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: .env: {}", e);
        }
    }

    let args = Args::parse();
    init_tracing(args.verbose);

    let outcome = cli::run(&args).await?;
    for report in &outcome.reports {
        if let Some(line) = status_line(report, &outcome.root, args.dry_run) {
            println!("{line}");
        }
    }
    print_summary(&RunSummary::from_reports(&outcome.reports), args.dry_run);

    Ok(())
}

/// Log lines go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
