use anyhow::Context;
use clap::Parser;
use remedy_mock_service::{router, Fixture, MockState};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "remedy_mock_service", about = "Serves scripted medicine effects locally")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:5000")]
    addr: String,
    /// JSON fixture; the built-in sample is used when omitted.
    #[arg(long)]
    fixture: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let fixture = match &args.fixture {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("read fixture {}", path.display()))?;
            serde_json::from_str::<Fixture>(&raw)
                .with_context(|| format!("parse fixture {}", path.display()))?
        }
        None => Fixture::sample(),
    };

    let listener = TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("bind {}", args.addr))?;
    let addr = listener.local_addr()?;
    info!(
        "serving {} medicine(s) and {} scripted answer(s)",
        fixture.medicines.as_ref().map_or(0, Vec::len),
        fixture.responses.len()
    );
    println!("remedy_mock_service listening on http://{addr}/");

    axum::serve(listener, router(MockState::new(fixture)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
