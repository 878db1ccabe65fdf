use anyhow::{Context, Result};
use chrono::Weekday;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::PathBuf;

use crate::schedule::CallSchedule;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
    /// Optional — without it the announcement falls back to a description excerpt.
    pub summarizer: Option<SummarizerConfig>,
    #[serde(default)]
    pub call: CallConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// The group the bot posts into. Absent = setup mode: commands still
    /// answer (so /chatid works) but nothing is scheduled.
    pub chat_id: Option<i64>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

fn default_poll_interval() -> u64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct YoutubeConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_playlist_id")]
    pub playlist_id: String,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            playlist_id: default_playlist_id(),
        }
    }
}

fn default_playlist_id() -> String {
    "PLn2qRQUAAg0zFWTWeuZVo05tUnOGAmWkm".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    pub api_key: String,
    /// Base URL for the API. Optional — any OpenAI-compatible endpoint works.
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_language() -> String {
    "Deutsch".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallConfig {
    #[serde(default = "default_weekday")]
    pub weekday: String,
    #[serde(default = "default_hour")]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Reminder lead times in hours before the call.
    #[serde(default = "default_reminder_hours")]
    pub reminder_hours: Vec<i64>,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            weekday: default_weekday(),
            hour: default_hour(),
            minute: 0,
            timezone: default_timezone(),
            reminder_hours: default_reminder_hours(),
        }
    }
}

fn default_weekday() -> String {
    "thu".to_string()
}

fn default_hour() -> u32 {
    17
}

fn default_timezone() -> String {
    "Europe/Berlin".to_string()
}

fn default_reminder_hours() -> Vec<i64> {
    vec![72, 24, 1]
}

impl CallConfig {
    pub fn schedule(&self) -> Result<CallSchedule> {
        let weekday: Weekday = self
            .weekday
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid [call] weekday: '{}'", self.weekday))?;
        let tz: Tz = self
            .timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid [call] timezone: '{}'", self.timezone))?;
        if self.hour > 23 || self.minute > 59 {
            anyhow::bail!("Invalid [call] time: {:02}:{:02}", self.hour, self.minute);
        }
        Ok(CallSchedule {
            weekday,
            hour: self.hour,
            minute: self.minute,
            tz,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinksConfig {
    #[serde(default = "default_channel_url")]
    pub channel_url: String,
    pub calendar_url: Option<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            channel_url: default_channel_url(),
            calendar_url: None,
        }
    }
}

fn default_channel_url() -> String {
    "https://www.youtube.com/@AnchorWatch".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from("call_state.json")
}

impl Config {
    /// Only the bot token is hard-required; everything else degrades.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("[telegram] bot_token is required");
        }
        Ok(())
    }
}

pub fn load(path: &str) -> Result<Config> {
    let path = expand_tilde(path);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;
    Ok(config)
}

fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".buildercall")
}

pub async fn init_config_dir() -> Result<()> {
    let base = default_base_dir();
    tokio::fs::create_dir_all(&base).await?;

    let config_path = base.join("config.toml");
    if !config_path.exists() {
        tokio::fs::write(
            &config_path,
            r#"[telegram]
bot_token = "YOUR_BOT_TOKEN"
# Send /chatid in your group to find this, then uncomment:
# chat_id = -1001234567890

[youtube]
# api_key = "YOUR_YOUTUBE_DATA_API_KEY"
playlist_id = "PLn2qRQUAAg0zFWTWeuZVo05tUnOGAmWkm"

# [summarizer]
# api_key = "YOUR_API_KEY"
# base_url = "https://api.openai.com/v1"  # any OpenAI-compatible endpoint
# model = "gpt-4o-mini"
# language = "Deutsch"

[call]
weekday = "thu"
hour = 17
minute = 0
timezone = "Europe/Berlin"
reminder_hours = [72, 24, 1]

[links]
channel_url = "https://www.youtube.com/@AnchorWatch"
# calendar_url = "https://example.com/builder-call.ics"

[state]
path = "call_state.json"
"#,
        )
        .await?;
    }

    Ok(())
}

fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[telegram]
bot_token = "123:abc"
"#,
        )
        .unwrap();
        assert!(cfg.validate().is_ok());
        assert!(cfg.telegram.chat_id.is_none());
        assert_eq!(cfg.call.hour, 17);
        assert_eq!(cfg.call.reminder_hours, vec![72, 24, 1]);
        assert!(cfg.summarizer.is_none());
        assert_eq!(cfg.state.path, PathBuf::from("call_state.json"));
    }

    #[test]
    fn test_empty_bot_token_rejected() {
        let cfg: Config = toml::from_str(
            r#"
[telegram]
bot_token = ""
"#,
        )
        .unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_schedule_from_call_config() {
        let call = CallConfig::default();
        let schedule = call.schedule().unwrap();
        assert_eq!(schedule.weekday, Weekday::Thu);
        assert_eq!(schedule.hour, 17);
        assert_eq!(schedule.tz, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let call = CallConfig {
            timezone: "Mars/Olympus_Mons".into(),
            ..CallConfig::default()
        };
        assert!(call.schedule().is_err());
    }

    #[test]
    fn test_invalid_weekday_rejected() {
        let call = CallConfig {
            weekday: "someday".into(),
            ..CallConfig::default()
        };
        assert!(call.schedule().is_err());
    }
}
