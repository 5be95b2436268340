use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use waka::model::StatsRange;
use waka::{Config, LoadResult, WakaClient};

#[derive(Parser, Debug)]
#[command(name = "waka")]
#[command(about = "Query WakaTime coding activity from the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/waka/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show the signed-in user
  User {
    /// Skip the cache and fetch now
    #[arg(long)]
    refresh: bool,
  },
  /// Show total time logged since the account was created
  Total,
  /// List projects
  Projects,
  /// Show coding stats for a time range
  Stats {
    /// last_7_days, last_30_days, last_6_months, last_year or all_time
    #[arg(default_value = "last_7_days")]
    range: StatsRange,
  },
  /// Show a page of the public leaderboard
  Leaders {
    #[arg(short, long)]
    language: Option<String>,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },
  /// List private leaderboards
  Boards,
  /// Show a page of a private leaderboard
  Board {
    id: String,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },
  /// Revoke the access token and drop cached user data
  Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_logging()?;

  let config = Config::load(args.config.as_deref())?;
  let client = WakaClient::from_config(&config)?;

  if !client.is_authorized() {
    eprintln!("warning: no credentials found, set WAKA_API_KEY or WAKA_ACCESS_TOKEN");
  }

  match args.command {
    Command::User { refresh: false } => print(client.current_user().await),
    Command::User { refresh: true } => print(client.refresh_current_user().await),
    Command::Total => print(client.total_record().await),
    Command::Projects => print(client.projects().await),
    Command::Stats { range } => print(client.stats(range).await),
    Command::Leaders { language, page } => {
      print(client.public_leaders(language.as_deref(), page).await)
    }
    Command::Boards => print(client.private_leaderboards().await),
    Command::Board { id, page } => print(client.private_leaders(&id, page).await),
    Command::Logout => match client.logout().await {
      LoadResult::Failure(error) => Err(eyre!("signed out locally, revocation failed: {}", error)),
      _ => {
        println!("signed out");
        Ok(())
      }
    },
  }
}

/// Log to a daily file so stdout only carries command output.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("waka")
    .join("logs");
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
    log_dir, "waka.log",
  ));
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("waka=info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()?;

  Ok(guard)
}

fn print<T: Serialize>(result: LoadResult<T>) -> Result<()> {
  match result {
    LoadResult::Values { data, error } => {
      if let Some(error) = error {
        eprintln!("warning: refresh failed, showing cached data: {}", error);
      }
      println!("{}", serde_json::to_string_pretty(&data)?);
      Ok(())
    }
    LoadResult::Empty | LoadResult::Loading => {
      eprintln!("nothing to show");
      Ok(())
    }
    LoadResult::Failure(error) => Err(eyre!("{} (code {})", error, error.code())),
  }
}
