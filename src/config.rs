use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use crate::batch::BatchOptions;
use crate::fetch::TrackSource;
use crate::spotify::TimeRange;

pub const DEFAULT_USERS_JSON: &str = "./config/users.json";

/// Post Spotify listening activity to a Microsoft Teams channel.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch tracks for every user and post them to Teams (default)
    Run(RunArgs),
    /// Obtain a refresh token for one user through the browser consent flow
    Authorize {
        #[command(flatten)]
        user: UserArgs,

        /// Print the consent URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Check one user's credentials and show their profile and recent tracks
    Validate {
        #[command(flatten)]
        user: UserArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SourceArg {
    #[default]
    Recent,
    Top,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Number of tracks to fetch per user (clamped to 0..=50)
    #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
    pub num_tracks: i64,

    /// Path to the JSON file with user credentials
    #[arg(long, env = "USERS_JSON_PATH", default_value = DEFAULT_USERS_JSON)]
    pub users_json: PathBuf,

    /// Teams incoming webhook URL
    #[arg(long, env = "TEAMS_WEBHOOK_URL")]
    pub teams_webhook: Option<String>,

    /// Only process the user with this username
    #[arg(long)]
    pub user: Option<String>,

    /// Which tracks to post
    #[arg(long, value_enum, default_value_t = SourceArg::Recent)]
    pub source: SourceArg,

    /// Time window for `--source top`
    #[arg(long, value_enum, default_value_t = TimeRange::ShortTerm)]
    pub time_range: TimeRange,
}

#[derive(Args, Debug, Clone)]
pub struct UserArgs {
    /// Username as listed in the users file
    pub username: String,

    /// Path to the JSON file with user credentials
    #[arg(long, env = "USERS_JSON_PATH", default_value = DEFAULT_USERS_JSON)]
    pub users_json: PathBuf,
}

/// Everything a batch run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub users_path: PathBuf,
    pub webhook_url: Url,
    pub only_user: Option<String>,
    pub batch: BatchOptions,
}

impl Config {
    pub fn from_run_args(args: &RunArgs) -> Result<Config> {
        let Some(raw) = args
            .teams_webhook
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        else {
            bail!("no Teams webhook configured; pass --teams-webhook or set TEAMS_WEBHOOK_URL");
        };
        let webhook_url =
            Url::parse(raw.trim()).with_context(|| format!("invalid Teams webhook URL: {raw}"))?;
        if !matches!(webhook_url.scheme(), "http" | "https") {
            bail!("Teams webhook URL must be http(s): {raw}");
        }

        let source = match args.source {
            SourceArg::Recent => TrackSource::RecentlyPlayed,
            SourceArg::Top => TrackSource::TopTracks(args.time_range),
        };

        Ok(Config {
            users_path: args.users_json.clone(),
            webhook_url,
            only_user: args.user.clone(),
            batch: BatchOptions {
                num_tracks: args.num_tracks,
                source,
            },
        })
    }
}
