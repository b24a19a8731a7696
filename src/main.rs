//! Telegram File Uploader CLI - main entry point
//!
//! Example:
//!   telegram_uploader --to @examplechannel --message "Build artifacts" --files build.log output.zip

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use telegram_uploader::config::{self, SESSION_FILE};
use telegram_uploader::progress::ConsoleProgress;
use telegram_uploader::{
    output, workflow, Credentials, Invocation, Result, SessionLock, TelegramClient,
};

#[derive(Parser, Debug)]
#[command(name = "telegram_uploader")]
#[command(about = "Send files to a Telegram chat as a single album", long_about = None)]
#[command(version, after_help = "Credentials are read from API_ID, API_HASH and BOT_TOKEN.")]
struct Cli {
    /// Chat ID or username
    #[arg(long, alias = "to-who", env = "UPLOAD_TO")]
    to: Option<String>,

    /// Caption for the album
    #[arg(long, env = "UPLOAD_MESSAGE")]
    message: Option<String>,

    /// Files to send; each value may hold several newline-separated paths
    #[arg(long, num_args = 1.., value_name = "PATH")]
    files: Vec<String>,

    /// Session file used to persist the bot authorization
    #[arg(long, env = "TG_SESSION", default_value = SESSION_FILE)]
    session: PathBuf,

    /// Print the result as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Append step outputs to this file (GitHub Actions)
    #[arg(long, env = "GITHUB_OUTPUT")]
    github_output: Option<PathBuf>,
}

impl Cli {
    fn invocation(&self) -> Invocation {
        Invocation {
            to: self.to.clone(),
            message: self.message.clone(),
            files: self.files.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    config::load_dotenv();

    // Initialize logging; stdout is reserved for progress and links
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("telegram_uploader=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(err.exit_code());
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let request = workflow::load_request(&cli.invocation())?;

    let _lock = SessionLock::acquire(&cli.session)?;
    let mut client = TelegramClient::new(&cli.session);
    let mut progress = ConsoleProgress::new();

    let result = workflow::execute(&mut client, &credentials, &request, &mut progress).await?;

    if cli.json {
        println!("{}", output::to_json(&result)?);
    } else {
        output::print_urls(&result);
    }

    if let Some(path) = cli.github_output.as_deref() {
        output::write_github_output(path, &result)?;
    }

    Ok(())
}
