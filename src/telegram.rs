use anyhow::{Context, Result};
use serde::Deserialize;

/// Where announcements and reminders go. The production impl posts to the
/// configured group chat; tests substitute their own.
#[async_trait::async_trait]
pub trait Messenger: Send + Sync {
    async fn post(&self, text: &str) -> Result<()>;
}

/// Thin Telegram Bot API client. Cheap to clone (reqwest::Client is shared).
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    token: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.to_string(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.token, method)
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        disable_preview: bool,
    ) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": disable_preview,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .context("sendMessage request failed")?;

        let result: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .context("Invalid sendMessage response")?;
        if !result.ok {
            anyhow::bail!(
                "sendMessage rejected: {}",
                result.description.unwrap_or_default()
            );
        }
        Ok(())
    }

    /// Long-poll for updates after `offset`. The 30s timeout is the
    /// suspension point that lets scheduled jobs interleave freely.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>> {
        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", "30".into()),
                ("allowed_updates", "[\"message\"]".into()),
            ])
            .send()
            .await
            .context("getUpdates request failed")?;

        let body: ApiResponse<Vec<TelegramUpdate>> = response
            .json()
            .await
            .context("Invalid getUpdates response")?;
        if !body.ok {
            anyhow::bail!(
                "getUpdates rejected: {}",
                body.description.unwrap_or_default()
            );
        }
        Ok(body.result.unwrap_or_default())
    }

    pub async fn get_me(&self) -> Result<TelegramUser> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .context("getMe request failed")?;
        let body: ApiResponse<TelegramUser> = response
            .json()
            .await
            .context("Invalid getMe response")?;
        body.result
            .ok_or_else(|| anyhow::anyhow!("getMe returned no bot info"))
    }
}

/// [`Messenger`] bound to the configured group. In setup mode (no chat id
/// yet) every post fails with a clear error instead of going nowhere.
pub struct GroupMessenger {
    client: TelegramClient,
    chat_id: Option<i64>,
}

impl GroupMessenger {
    pub fn new(client: TelegramClient, chat_id: Option<i64>) -> Self {
        Self { client, chat_id }
    }
}

#[async_trait::async_trait]
impl Messenger for GroupMessenger {
    async fn post(&self, text: &str) -> Result<()> {
        let chat_id = self
            .chat_id
            .context("[telegram] chat_id is not configured")?;
        self.client.send_message(chat_id, text, false).await
    }
}

// --- Bot API types ---

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}

impl TelegramMessage {
    /// Extract `(command, arguments)` from a `/command[@botname] args` text.
    /// Returns `None` for plain messages and messages from other bots.
    pub fn command(&self) -> Option<(String, String)> {
        if self.from.as_ref().is_some_and(|u| u.is_bot) {
            return None;
        }
        let text = self.text.as_deref()?.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head);
        if name.is_empty() {
            return None;
        }
        Some((name.to_ascii_lowercase(), args.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> TelegramMessage {
        TelegramMessage {
            from: Some(TelegramUser {
                id: 1,
                is_bot: false,
                first_name: "Test".into(),
                username: None,
            }),
            chat: TelegramChat {
                id: -100,
                chat_type: "group".into(),
                title: Some("Builders".into()),
            },
            text: Some(text.into()),
        }
    }

    #[test]
    fn test_command_extraction() {
        assert_eq!(msg("/status").command(), Some(("status".into(), String::new())));
        assert_eq!(
            msg("/addtopic PSBT improvements").command(),
            Some(("addtopic".into(), "PSBT improvements".into()))
        );
        assert_eq!(
            msg("/NextCall@buildercall_bot").command(),
            Some(("nextcall".into(), String::new()))
        );
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(msg("hello there").command(), None);
        assert_eq!(msg("/").command(), None);
    }

    #[test]
    fn test_bot_messages_ignored() {
        let mut m = msg("/status");
        if let Some(from) = m.from.as_mut() {
            from.is_bot = true;
        }
        assert_eq!(m.command(), None);
    }

    #[tokio::test]
    async fn test_setup_mode_post_fails() {
        let messenger = GroupMessenger::new(TelegramClient::new("token"), None);
        let err = messenger.post("hi").await.unwrap_err();
        assert!(err.to_string().contains("chat_id"));
    }
}
