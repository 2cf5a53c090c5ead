use clap::Parser;
use targetscan::cli::Cli;
use targetscan::output;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (settings, paths) = cli.load_settings()?;
    init_logging(&cli.log_filter(&settings));

    tracing::debug!(
        config_dir = %paths.config_dir.display(),
        data_dir = %paths.data_dir.display(),
        "resolved directories"
    );

    cli.execute(settings, paths).await?;
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("targetscan={level},tower_http={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}
