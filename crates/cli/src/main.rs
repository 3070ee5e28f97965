use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use analyzer_core::forecast::AdditiveForecaster;
use analyzer_core::ingest::AlphaVantageClient;

#[derive(Debug, Parser)]
#[command(name = "analyzer_cli")]
struct Args {
    /// Ticker symbol, passed to the provider as-is.
    ticker: String,

    /// Pretty-print the JSON envelope.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = analyzer_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    // stdout carries the JSON; logs go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let provider = AlphaVantageClient::from_settings(&settings)?;
    let forecaster = AdditiveForecaster::default();

    let response = match analyzer_core::analysis::analyze(&provider, &forecaster, &args.ticker).await {
        Ok(response) => response,
        Err(err) => {
            let err = anyhow::Error::new(err).context(format!("analysis of {} failed", args.ticker));
            sentry_anyhow::capture_anyhow(&err);
            return Err(err);
        }
    };

    let out = if args.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .context("failed to serialize analysis")?;
    println!("{out}");

    Ok(())
}

fn init_sentry(settings: &analyzer_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
