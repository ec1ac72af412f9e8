//! MediTrack CLI - meditrack command

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use meditrack::api::HttpClient;
use meditrack::config::ClientConfig;
use meditrack::profile::completion;
use meditrack::store::ProfileStore;
use meditrack::sync::{AutoSaver, AutoSaverOptions, LastSave, SaveOutcome};
use meditrack::PartitionKey;

/// MediTrack - profile editor with debounced auto-save
#[derive(Parser)]
#[command(name = "meditrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the signed-in user's profile partitions
    Show {
        /// Print the profile completion report instead
        #[arg(long)]
        completion: bool,
    },
    /// Edit one partition and wait for the auto-save to go through
    Edit {
        /// personalInfo, medicalProfile, accountSettings or securitySettings
        partition: PartitionKey,
        /// JSON object with the new partition data
        data: String,
        /// Merge into the existing data instead of replacing it
        #[arg(long)]
        merge: bool,
    },
    /// End the session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = ClientConfig::load()?;
    let client = Arc::new(HttpClient::new(config)?);

    match cli.command {
        Commands::Show { completion } => show(&client, completion).await,
        Commands::Edit {
            partition,
            data,
            merge,
        } => edit(client, partition, &data, merge).await,
        Commands::Logout => {
            client.logout().await?;
            Ok(())
        }
    }
}

async fn show(client: &HttpClient, with_completion: bool) -> Result<()> {
    let store = ProfileStore::new();
    client.load_into(&store).await?;

    let output = if with_completion {
        serde_json::to_string_pretty(&completion(&store.data(PartitionKey::PersonalInfo)))?
    } else {
        serde_json::to_string_pretty(&store.state())?
    };
    println!("{output}");
    Ok(())
}

async fn edit(
    client: Arc<HttpClient>,
    partition: PartitionKey,
    data: &str,
    merge: bool,
) -> Result<()> {
    let value: Value = serde_json::from_str(data).context("partition data must be valid JSON")?;

    let store = Arc::new(ProfileStore::new());
    client.load_into(&store).await?;

    let quiet = client.config().autosave_quiet;
    let saver = AutoSaver::new(AutoSaverOptions::new(client, store.clone()).quiet_interval(quiet));
    let _subscription = saver.attach(&store);
    let mut status = saver.status_changes();

    if merge {
        store.merge_value(partition, value)?;
    } else {
        store.update_value(partition, value)?;
    }
    info!(%partition, quiet_ms = quiet.as_millis() as u64, "edit applied, waiting for auto-save");

    let outcome = tokio::select! {
        changed = status.wait_for(|s| !s.in_flight && s.last != LastSave::Idle) => {
            match &changed?.last {
                LastSave::Saved { keys, .. } => SaveOutcome::Saved { keys: keys.clone() },
                LastSave::Failed { error, .. } => bail!("auto-save failed: {error}"),
                LastSave::Idle => SaveOutcome::Skipped,
            }
        }
        _ = signal::ctrl_c() => {
            info!("interrupted, flushing now");
            saver.flush_now().await
        }
    };
    saver.dispose();

    match outcome {
        SaveOutcome::Saved { keys } => {
            println!("saved: {}", saved_line(&keys));
            Ok(())
        }
        SaveOutcome::Skipped => {
            println!("nothing to save");
            Ok(())
        }
        SaveOutcome::Failed { error, .. } => bail!("auto-save failed: {error}"),
    }
}

fn saved_line(keys: &[PartitionKey]) -> String {
    let names: Vec<&str> = keys.iter().map(PartitionKey::display_name).collect();
    names.join(", ")
}
