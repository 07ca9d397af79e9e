mod terminal;

use clap::Parser;
use lookup_core::actor::{run, Controller, UiEvent};
use lookup_core::config::{LookupConfig, RacePolicy};
use lookup_core::directory::ResourceDirectory;
use lookup_core::effect_client::{EffectQuery, EffectQueryClient};
use lookup_core::presenter::render;
use lookup_core::protocol::MedicineName;
use lookup_core::session::{SearchSession, SessionState, Submission};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use terminal::{format_result, parse_line, Command, TerminalView, HELP};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lookup_cli")]
struct Args {
    /// Run one search and exit instead of starting the prompt.
    #[arg(long)]
    medicine: Option<String>,

    /// Print the service result as JSON (with --medicine).
    #[arg(long, default_value_t = false, requires = "medicine")]
    json: bool,

    /// Overrides REMEDY_SERVICE_URL.
    #[arg(long)]
    service_url: Option<String>,

    /// URL or path of medicines.json. Overrides REMEDY_DIRECTORY.
    #[arg(long, value_name = "URL_OR_PATH")]
    directory: Option<String>,

    /// last_settled or latest_submission. Overrides REMEDY_RACE_POLICY.
    #[arg(long)]
    race_policy: Option<String>,

    /// 0 disables the timeout. Overrides REMEDY_HTTP_TIMEOUT_SECS.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    debug!("service {} directory {:?}", config.service_base, config.directory);

    let http = config.http_client()?;
    let client = EffectQueryClient::new(http.clone(), &config.service_base)?;

    if let Some(medicine) = args.medicine.as_deref() {
        return search_once(&client, config.race_policy, medicine, args.json).await;
    }

    let directory = ResourceDirectory::new(config.directory.clone(), http);
    interactive(Controller::new(client, directory, config.race_policy)).await
}

fn build_config(args: &Args) -> anyhow::Result<LookupConfig> {
    let mut config = LookupConfig::from_env()?;
    if let Some(url) = args.service_url.as_deref() {
        config = config.with_service_url(url)?;
    }
    if let Some(dir) = args.directory.as_deref() {
        config = config.with_directory(dir)?;
    }
    if let Some(policy) = args.race_policy.as_deref() {
        config = config.with_race_policy(policy)?;
    }
    if let Some(secs) = args.timeout_secs {
        config.http_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    Ok(config)
}

async fn search_once(
    client: &EffectQueryClient,
    policy: RacePolicy,
    medicine: &str,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let mut session = SearchSession::new(policy);
    if let Submission::Started(ticket) = session.submit(medicine) {
        let outcome = client.query(&ticket.medicine).await;
        if json {
            if let Ok(result) = &outcome {
                println!("{}", serde_json::to_string_pretty(result)?);
            }
        }
        session.settle(ticket, outcome);
    }

    let state = session.into_state();
    match &state {
        SessionState::Success { .. } if json => {}
        SessionState::Error { message } if json => eprintln!("error: {message}"),
        _ => {
            for line in format_result(&render(&state)) {
                println!("{line}");
            }
        }
    }

    Ok(if matches!(state, SessionState::Success { .. }) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn interactive(
    controller: Controller<EffectQueryClient, ResourceDirectory>,
) -> anyhow::Result<ExitCode> {
    let shown = Arc::new(Mutex::new(Vec::new()));
    let mut view = TerminalView::new(Arc::clone(&shown));
    let (tx, rx) = mpsc::channel(32);

    println!("{HELP}");
    let reader = tokio::spawn(read_commands(tx, shown));
    let state = run(rx, controller, &mut view).await;
    reader.await?;

    debug!("session closed in state {state:?}");
    Ok(ExitCode::SUCCESS)
}

/// Feeds stdin lines to the controller until EOF or `/quit`.
async fn read_commands(tx: mpsc::Sender<UiEvent>, shown: Arc<Mutex<Vec<MedicineName>>>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let listed = shown.lock().map(|s| s.clone()).unwrap_or_default();
        match parse_line(&line, &listed) {
            Command::Event(event) => {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => return,
            Command::Invalid(message) => eprintln!("{message}"),
        }
    }
}
