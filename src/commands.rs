use std::sync::Arc;

use chrono::Utc;

use crate::config::LinksConfig;
use crate::publisher::{PublishOutcome, RecordingPublisher};
use crate::schedule::CallSchedule;
use crate::state::CallStateStore;
use crate::telegram::{TelegramClient, TelegramMessage};
use crate::templates;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Status,
    NextCall,
    AddTopic(String),
    /// Empty args = show, otherwise set. Argument validation happens in the
    /// handler so bad input becomes a reply, not a dropped message.
    CallNumber(String),
    ChatId,
    LatestVideo,
    PostVideo,
}

impl Command {
    /// Unknown commands map to `None` and are ignored — other bots in the
    /// same group have their own command namespace.
    pub fn parse(name: &str, args: &str) -> Option<Command> {
        match name {
            "start" | "help" => Some(Command::Start),
            "status" => Some(Command::Status),
            "nextcall" => Some(Command::NextCall),
            "addtopic" => Some(Command::AddTopic(args.to_string())),
            "callnumber" => Some(Command::CallNumber(args.to_string())),
            "chatid" => Some(Command::ChatId),
            "latestvideo" => Some(Command::LatestVideo),
            "postvideo" => Some(Command::PostVideo),
            _ => None,
        }
    }
}

/// Everything the handlers reach into. No handler keeps state of its own
/// between invocations; whatever must survive lives in the store.
pub struct CommandContext {
    pub telegram: TelegramClient,
    pub store: Arc<CallStateStore>,
    pub schedule: CallSchedule,
    pub publisher: Arc<RecordingPublisher>,
    pub links: LinksConfig,
}

impl CommandContext {
    /// Handle one inbound message: extract the command, run it, reply into
    /// the chat it came from. Reply failures are logged and dropped.
    pub async fn handle(&self, msg: &TelegramMessage) {
        let Some((name, args)) = msg.command() else {
            return;
        };
        let Some(command) = Command::parse(&name, &args) else {
            return;
        };
        tracing::info!("Command /{name} from chat {}", msg.chat.id);
        let reply = self.dispatch(&command, msg).await;
        if let Err(e) = self.telegram.send_message(msg.chat.id, &reply, true).await {
            tracing::error!("Failed to reply to /{name}: {e:#}");
        }
    }

    async fn dispatch(&self, command: &Command, msg: &TelegramMessage) -> String {
        match command {
            Command::Start => templates::welcome(),
            Command::Status => self.status(),
            Command::NextCall => self.next_call(),
            Command::AddTopic(args) => self.add_topic(args),
            Command::CallNumber(args) => self.call_number(args),
            Command::ChatId => templates::chat_info(
                msg.chat.id,
                &msg.chat.chat_type,
                msg.chat.title.as_deref(),
            ),
            Command::LatestVideo => self.latest_video().await,
            Command::PostVideo => self.post_video().await,
        }
    }

    fn status(&self) -> String {
        let now = Utc::now().with_timezone(&self.schedule.tz);
        match self.store.load() {
            Ok(state) => templates::status(now, self.schedule.next_occurrence(now), &state),
            Err(e) => error_reply(e),
        }
    }

    fn next_call(&self) -> String {
        let now = Utc::now().with_timezone(&self.schedule.tz);
        let occurrence = self.schedule.next_occurrence(now);
        match self.store.load() {
            Ok(state) => templates::next_call(
                state.call_number,
                occurrence,
                now,
                &state.topics,
                self.links.calendar_url.as_deref(),
            ),
            Err(e) => error_reply(e),
        }
    }

    fn add_topic(&self, args: &str) -> String {
        let topic = args.trim();
        if topic.is_empty() {
            return "❌ Bitte ein Thema angeben: /addtopic <Text>".to_string();
        }
        match self.store.add_topic(topic) {
            Ok(()) => format!("✅ Thema vorgemerkt: {topic}"),
            Err(e) => error_reply(e),
        }
    }

    fn call_number(&self, args: &str) -> String {
        let args = args.trim();
        if args.is_empty() {
            return match self.store.next_call_number() {
                Ok(n) => format!("📟 Aktuelle Call-Nummer: {n}"),
                Err(e) => error_reply(e),
            };
        }
        let n: u32 = match args.parse() {
            Ok(n) if n >= 1 => n,
            _ => return "❌ Ungültige Nummer. Beispiel: /callnumber 12".to_string(),
        };
        match self.store.set_call_number(n) {
            Ok(()) => format!("✅ Call-Nummer gesetzt: {n}"),
            Err(e) => error_reply(e),
        }
    }

    async fn latest_video(&self) -> String {
        match self.publisher.latest_preview().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("/latestvideo failed: {e:#}");
                "❌ Konnte kein Video finden.".to_string()
            }
        }
    }

    async fn post_video(&self) -> String {
        match self.publisher.check_and_publish().await {
            Ok(PublishOutcome::Published { call_number, title }) => {
                format!("📤 Aufzeichnung von Call #{call_number} angekündigt: {title}")
            }
            Ok(PublishOutcome::AlreadyAnnounced) => {
                "ℹ️ Die neueste Aufzeichnung wurde bereits angekündigt.".to_string()
            }
            Ok(PublishOutcome::NothingFound) => "❌ Konnte kein Video finden.".to_string(),
            Err(e) => {
                tracing::error!("/postvideo failed: {e:#}");
                error_reply(e)
            }
        }
    }
}

fn error_reply(e: anyhow::Error) -> String {
    format!("❌ Fehler: {e}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(Command::parse("start", ""), Some(Command::Start));
        assert_eq!(Command::parse("help", ""), Some(Command::Start));
        assert_eq!(Command::parse("status", ""), Some(Command::Status));
        assert_eq!(Command::parse("nextcall", ""), Some(Command::NextCall));
        assert_eq!(
            Command::parse("addtopic", "Taproot"),
            Some(Command::AddTopic("Taproot".into()))
        );
        assert_eq!(
            Command::parse("callnumber", "12"),
            Some(Command::CallNumber("12".into()))
        );
        assert_eq!(Command::parse("chatid", ""), Some(Command::ChatId));
        assert_eq!(Command::parse("latestvideo", ""), Some(Command::LatestVideo));
        assert_eq!(Command::parse("postvideo", ""), Some(Command::PostVideo));
    }

    #[test]
    fn test_unknown_commands_ignored() {
        assert_eq!(Command::parse("dance", ""), None);
        assert_eq!(Command::parse("", ""), None);
    }
}
