use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gcal_sync::calendar::google_calendar::GoogleCalendarStore;
use gcal_sync::error::BoxError;
use gcal_sync::properties::FilePropertyStore;
use gcal_sync::provider::sync_progress::feedback_channel;
use gcal_sync::sources::github::GithubReader;
use gcal_sync::sources::ics::IcsReader;
use gcal_sync::{Config, Provider};

#[derive(Parser)]
#[command(name = "gcal-sync")]
#[command(about = "Mirror ICS task feeds and GitHub commits into Google Calendar")]
struct Cli {
    /// The JSON configuration file
    #[arg(short, long, default_value = "gcal-sync.json")]
    config: PathBuf,

    /// The file the sync state is kept in, across invocations
    #[arg(short, long, default_value = "gcal-sync-state.json")]
    state: PathBuf,

    /// The environment variable that holds the Google OAuth access token
    #[arg(long, default_value = "GOOGLE_ACCESS_TOKEN")]
    token_env: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let config = Config::from_file(&cli.config)?;
    config.validate()?;

    let token = std::env::var(&cli.token_env)
        .map_err(|_| format!("The {} environment variable must hold a Google access token", cli.token_env))?;

    let calendar = GoogleCalendarStore::new(token)?;
    let properties = FilePropertyStore::from_file(&cli.state)?;
    let ics_reader = IcsReader::new(config.default_timezone());
    let github_reader = GithubReader::new();
    let mut provider = Provider::new(calendar, properties, ics_reader, github_reader);

    let (sender, mut receiver) = feedback_channel();
    let progress_logger = tokio::spawn(async move {
        while receiver.changed().await.is_ok() {
            log::debug!("{}", *receiver.borrow());
        }
    });

    let result = provider.sync_with_feedback(&config, sender).await;
    let _ = progress_logger.await;

    let stats = result?;
    if stats.has_errors() {
        for error in &stats.errors {
            log::warn!("[{}] {}", error.kind, error.message);
        }
        return Err(format!("{} source(s) could not be synced", stats.errors.len()).into());
    }
    Ok(())
}
