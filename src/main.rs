use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use spoteamfy::auth::authenticate;
use spoteamfy::config::{Cli, Command, Config, RunArgs, UserArgs};
use spoteamfy::credentials::{load_users, select_user, CredentialRecord};
use spoteamfy::fetch::{fetch_tracks, TrackSource};
use spoteamfy::spotify::auth::authorize;
use spoteamfy::spotify::id::UserId;
use spoteamfy::spotify::SpotifyClient;
use spoteamfy::webhook::WebhookPoster;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    spoteamfy::logging::init(cli.verbose);

    match cli.command.unwrap_or(Command::Run(cli.run)) {
        Command::Run(args) => run_batch(&args).await,
        Command::Authorize { user, no_browser } => run_authorize(&user, !no_browser).await,
        Command::Validate { user } => run_validate(&user).await,
    }
}

async fn run_batch(args: &RunArgs) -> Result<()> {
    let config = Config::from_run_args(args)?;

    let mut users = load_users(&config.users_path)?;
    if let Some(name) = &config.only_user {
        users = select_user(users, name)?;
    }

    println!(
        "Fetching {} tracks per user from {} and posting to Teams.",
        config.batch.num_tracks,
        config.users_path.display()
    );
    println!("Loaded user credentials for {} users.", users.len());

    let client = SpotifyClient::new();
    let poster = WebhookPoster::new(config.webhook_url.as_str());
    let counters = spoteamfy::run(&client, &poster, &users, &config.batch).await;

    info!(
        successful = counters.successful,
        failed = counters.failed,
        "batch finished"
    );
    println!("{counters}");
    Ok(())
}

fn find_user(args: &UserArgs) -> Result<CredentialRecord> {
    let users = load_users(&args.users_json)?;
    select_user(users, &args.username)?
        .into_iter()
        .next()
        .context("user lookup returned no record")
}

async fn run_authorize(args: &UserArgs, open_browser: bool) -> Result<()> {
    let record = find_user(args)?;
    println!("Getting authorization for user: {}", record.username);

    let token = authorize(&SpotifyClient::new(), &record, open_browser).await?;
    let refresh_token = token
        .refresh_token
        .context("Spotify did not return a refresh token")?;

    println!("Granted scope: {}", token.scope);
    println!("\nUpdate {} with this refresh token:", args.users_json.display());
    println!("Replace '{}' with '{}'", record.refresh_token, refresh_token);
    Ok(())
}

async fn run_validate(args: &UserArgs) -> Result<()> {
    let record = find_user(args)?;
    println!("Testing authentication for user: {}", record.username);
    println!("Client ID: {}", record.client_id);
    println!("Redirect URI: {}", record.redirect_uri);

    let client = SpotifyClient::new();
    let session = authenticate(&client, &record).await?;
    println!("Authentication successful!");

    let profile = client
        .current_user(&session)
        .await
        .context("failed to fetch profile")?;
    let profile_url = profile
        .uri
        .as_deref()
        .and_then(UserId::new)
        .map(|id| id.url())
        .unwrap_or_else(|| "N/A".to_string());
    println!("Profile retrieved successfully!");
    println!(
        "   Display Name: {}",
        profile.display_name.as_deref().unwrap_or("N/A")
    );
    println!("   Spotify ID: {}", profile.id);
    println!("   Profile: {profile_url}");
    println!(
        "   Followers: {}",
        profile
            .followers
            .total
            .map_or_else(|| "N/A".to_string(), |t| t.to_string())
    );
    println!("   Country: {}", profile.country.as_deref().unwrap_or("N/A"));

    let tracks = fetch_tracks(
        &client,
        &session,
        &record.username,
        TrackSource::RecentlyPlayed,
        3,
    )
    .await?;
    if tracks.is_empty() {
        println!("No recently played tracks found");
    } else {
        println!("Found {} recently played tracks:", tracks.len());
        for (i, track) in tracks.iter().enumerate() {
            println!("   {}. {} by {}", i + 1, track.name, track.artist);
        }
    }
    Ok(())
}
