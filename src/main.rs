mod commands;
mod config;
mod notify;
mod publisher;
mod schedule;
mod state;
mod summarizer;
mod telegram;
mod templates;
mod youtube;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::signal;

use crate::schedule::JobKind;
use crate::summarizer::{Summarizer, SummarizerClient};
use crate::telegram::Messenger;

#[derive(Parser)]
#[command(
    name = "buildercall-bot",
    version,
    about = "Reminder and recording-announcement bot for the weekly Builder Call"
)]
struct Cli {
    #[arg(short, long, default_value = "~/.buildercall/config.toml")]
    config: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default)
    Run,
    /// Write a config template to ~/.buildercall/
    Init,
    /// Print the persisted call state and the next occurrence
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Init => {
            config::init_config_dir().await?;
            tracing::info!("Initialized ~/.buildercall/");
        }
        Commands::Run => run(&cli.config).await?,
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            let call_schedule = cfg.call.schedule()?;
            let store = state::CallStateStore::new(cfg.state.path.clone());
            let call_state = store.load()?;
            let now = Utc::now().with_timezone(&call_schedule.tz);
            println!(
                "Next call: #{} at {}",
                call_state.call_number,
                call_schedule.next_occurrence(now).format("%A %Y-%m-%d %H:%M %Z")
            );
            if call_state.topics.is_empty() {
                println!("Topics: (none yet)");
            } else {
                for topic in &call_state.topics {
                    println!("Topic: {topic}");
                }
            }
        }
    }
    Ok(())
}

async fn run(config_path: &str) -> Result<()> {
    let cfg = config::load(config_path)?;
    cfg.validate()?;
    let call_schedule = cfg.call.schedule()?;

    let store = Arc::new(state::CallStateStore::new(cfg.state.path.clone()));
    // A corrupt state file should stop us here, not mid-announcement.
    let call_state = store.load()?;
    tracing::info!("Upcoming call: #{}", call_state.call_number);

    let client = telegram::TelegramClient::new(&cfg.telegram.bot_token);
    match client.get_me().await {
        Ok(me) => tracing::info!(
            "Telegram bot: @{}",
            me.username.as_deref().unwrap_or(&me.first_name)
        ),
        Err(e) => tracing::warn!("getMe failed, check the bot token: {e:#}"),
    }

    let messenger: Arc<dyn Messenger> = Arc::new(telegram::GroupMessenger::new(
        client.clone(),
        cfg.telegram.chat_id,
    ));
    let catalog = youtube::PlaylistCatalog::new(
        youtube::YoutubeClient::new(cfg.youtube.api_key.clone()),
        cfg.youtube.playlist_id.clone(),
    );
    let summarizer: Option<Box<dyn Summarizer>> = cfg
        .summarizer
        .as_ref()
        .map(|c| Box::new(SummarizerClient::new(c)) as Box<dyn Summarizer>);
    if summarizer.is_none() {
        tracing::info!("No summarizer configured, announcements use description excerpts");
    }
    let recording_publisher = Arc::new(publisher::RecordingPublisher::new(
        Box::new(catalog),
        messenger.clone(),
        summarizer,
        store.clone(),
    ));

    if cfg.telegram.chat_id.is_some() {
        let dispatcher = Arc::new(notify::ReminderDispatcher::new(
            messenger.clone(),
            store.clone(),
            call_schedule,
            cfg.links.clone(),
        ));
        let publisher = recording_publisher.clone();
        let reminder_hours = cfg.call.reminder_hours.clone();
        tokio::spawn(async move {
            schedule::run(call_schedule, reminder_hours, move |kind| {
                let dispatcher = dispatcher.clone();
                let publisher = publisher.clone();
                async move {
                    match kind {
                        JobKind::Reminder(hours) => {
                            dispatcher.send_reminder(hours).await;
                            Ok(())
                        }
                        JobKind::RecordingCheck => {
                            publisher.check_and_publish().await.map(|_| ())
                        }
                    }
                }
            })
            .await;
        });
    } else {
        tracing::warn!("SETUP MODE: [telegram] chat_id is not configured, reminders disabled");
        tracing::warn!("Add the bot to your group and send /chatid to get the ID");
    }

    let ctx = commands::CommandContext {
        telegram: client.clone(),
        store,
        schedule: call_schedule,
        publisher: recording_publisher,
        links: cfg.links.clone(),
    };

    tracing::info!("Bot is running. Press Ctrl+C to stop.");
    let mut last_update_id = 0i64;
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            result = client.get_updates(last_update_id + 1) => match result {
                Ok(updates) => {
                    for update in updates {
                        last_update_id = last_update_id.max(update.update_id);
                        if let Some(msg) = update.message {
                            ctx.handle(&msg).await;
                        }
                    }
                    tokio::time::sleep(Duration::from_secs(cfg.telegram.poll_interval)).await;
                }
                Err(e) => {
                    tracing::error!("getUpdates failed: {e:#}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
    Ok(())
}
