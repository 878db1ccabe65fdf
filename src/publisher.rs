use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::state::CallStateStore;
use crate::summarizer::{Summarizer, fallback_summary};
use crate::telegram::Messenger;
use crate::templates;
use crate::youtube::VideoCatalog;

#[derive(Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { call_number: u32, title: String },
    AlreadyAnnounced,
    NothingFound,
}

/// Finds the newest recording, announces it once, and advances the call
/// counter. Owns the last-announced id: in-memory only, reset on restart —
/// a restart inside the dedup window can re-announce, which is accepted.
pub struct RecordingPublisher {
    catalog: Box<dyn VideoCatalog>,
    messenger: Arc<dyn Messenger>,
    summarizer: Option<Box<dyn Summarizer>>,
    store: Arc<CallStateStore>,
    last_announced: Mutex<Option<String>>,
}

impl RecordingPublisher {
    pub fn new(
        catalog: Box<dyn VideoCatalog>,
        messenger: Arc<dyn Messenger>,
        summarizer: Option<Box<dyn Summarizer>>,
        store: Arc<CallStateStore>,
    ) -> Self {
        Self {
            catalog,
            messenger,
            summarizer,
            store,
            last_announced: Mutex::new(None),
        }
    }

    /// Shared by the scheduled recording check and /postvideo; both get the
    /// same dedup and fallback semantics. The counter advance is tied to a
    /// successful send: if sending fails, neither the last-announced id nor
    /// the persisted state changes, and an `Err` is returned for the caller
    /// to log or report.
    pub async fn check_and_publish(&self) -> Result<PublishOutcome> {
        let video = match self.catalog.latest().await {
            Ok(video) => video,
            Err(e) => {
                tracing::warn!("Recording check: catalog query failed: {e:#}");
                return Ok(PublishOutcome::NothingFound);
            }
        };

        {
            let last = self.last_announced.lock().expect("last-announced lock poisoned");
            if last.as_deref() == Some(video.video_id.as_str()) {
                tracing::info!("Video {} already announced, skipping", video.video_id);
                return Ok(PublishOutcome::AlreadyAnnounced);
            }
        }

        // The announcement names the call that was just held, so capture the
        // number before the advance.
        let call_number = self.store.next_call_number()?;
        let summary = self.summary_for(&video.description).await;
        let text = templates::announcement(call_number, &video, &summary);

        self.messenger
            .post(&text)
            .await
            .context("Failed to send recording announcement")?;

        *self.last_announced.lock().expect("last-announced lock poisoned") =
            Some(video.video_id.clone());
        match self.store.advance_after_publish() {
            Ok(next) => tracing::info!(
                "Announced '{}', next call is #{next}",
                video.title
            ),
            // Announcement went out but the counter is stale until the next
            // manual correction — known gap, surfaced loudly.
            Err(e) => tracing::error!("Call state advance failed after announcement: {e:#}"),
        }

        Ok(PublishOutcome::Published {
            call_number,
            title: video.title,
        })
    }

    /// /latestvideo: same lookup and summary, no announcement, no state change.
    pub async fn latest_preview(&self) -> Result<String> {
        let video = self.catalog.latest().await?;
        let call_number = self.store.next_call_number()?;
        let summary = self.summary_for(&video.description).await;
        Ok(templates::announcement(call_number, &video, &summary))
    }

    /// Configured-but-failing and not-configured deliberately share one
    /// fallback path.
    async fn summary_for(&self, description: &str) -> String {
        if let Some(summarizer) = &self.summarizer {
            match summarizer.summarize(description).await {
                Ok(text) if !text.trim().is_empty() => return text,
                Ok(_) => tracing::warn!("Summarizer returned empty text, using fallback"),
                Err(e) => tracing::warn!("Summarizer failed, using fallback: {e:#}"),
            }
        }
        fallback_summary(description)
    }
}
