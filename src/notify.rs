use std::sync::Arc;

use chrono::Utc;

use crate::config::LinksConfig;
use crate::schedule::CallSchedule;
use crate::state::CallStateStore;
use crate::telegram::Messenger;
use crate::templates::{self, TemplateContext};

/// Sends lead-time reminders. Strictly best-effort: every failure is logged
/// and swallowed so one bad send never takes down the scheduler or blocks
/// the next reminder.
pub struct ReminderDispatcher {
    messenger: Arc<dyn Messenger>,
    store: Arc<CallStateStore>,
    schedule: CallSchedule,
    links: LinksConfig,
}

impl ReminderDispatcher {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        store: Arc<CallStateStore>,
        schedule: CallSchedule,
        links: LinksConfig,
    ) -> Self {
        Self {
            messenger,
            store,
            schedule,
            links,
        }
    }

    pub async fn send_reminder(&self, hours: i64) {
        let state = match self.store.load() {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("Skipping {hours}h reminder, call state unreadable: {e:#}");
                return;
            }
        };
        let now = Utc::now().with_timezone(&self.schedule.tz);
        let occurrence = self.schedule.next_occurrence(now);
        let text = templates::reminder(
            hours,
            &TemplateContext {
                call_number: state.call_number,
                occurrence,
                topics: &state.topics,
                links: &self.links,
            },
        );
        match self.messenger.post(&text).await {
            Ok(()) => tracing::info!("{hours}h reminder sent for call #{}", state.call_number),
            Err(e) => tracing::error!("Failed to send {hours}h reminder: {e:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CallState;
    use anyhow::Result;
    use chrono::Weekday;
    use chrono_tz::Europe::Berlin;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Messenger for RecordingMessenger {
        async fn post(&self, text: &str) -> Result<()> {
            if self.fail {
                anyhow::bail!("send failed");
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn dispatcher(messenger: Arc<RecordingMessenger>, name: &str) -> ReminderDispatcher {
        let path = std::env::temp_dir().join(format!("buildercall-notify-{name}.json"));
        std::fs::remove_file(&path).ok();
        let store = CallStateStore::new(path);
        store
            .save(&CallState {
                call_number: 12,
                topics: vec!["Taproot".into()],
            })
            .unwrap();
        ReminderDispatcher::new(
            messenger,
            Arc::new(store),
            CallSchedule {
                weekday: Weekday::Thu,
                hour: 17,
                minute: 0,
                tz: Berlin,
            },
            LinksConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_reminder_carries_state() {
        let messenger = Arc::new(RecordingMessenger::default());
        dispatcher(messenger.clone(), "ok").send_reminder(72).await;
        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("#12"));
        assert!(sent[0].contains("• Taproot"));
    }

    #[tokio::test]
    async fn test_send_failure_is_swallowed() {
        let messenger = Arc::new(RecordingMessenger {
            fail: true,
            ..RecordingMessenger::default()
        });
        // Must not panic or propagate
        dispatcher(messenger, "fail").send_reminder(24).await;
    }
}
