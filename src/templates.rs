//! All outbound message texts. Each template is a typed formatter over an
//! enumerable variable set, never ad-hoc interpolation at the call site.

use chrono::{DateTime, Datelike, Weekday};
use chrono_tz::Tz;

use crate::config::LinksConfig;
use crate::state::CallState;
use crate::youtube::VideoInfo;

pub struct TemplateContext<'a> {
    pub call_number: u32,
    pub occurrence: DateTime<Tz>,
    pub topics: &'a [String],
    pub links: &'a LinksConfig,
}

pub fn reminder(hours: i64, ctx: &TemplateContext) -> String {
    let when = format_occurrence(ctx.occurrence);
    match hours {
        72 => format!(
            "🔔 *Builder Call #{} in 3 Tagen!*\n\n\
             📅 {when}\n\
             📺 Live auf YouTube\n\n\
             📋 Themen bisher:\n{}\n\n\
             Schlagt weitere Themen mit /addtopic vor!\n\n\
             🔗 YouTube Kanal: {}",
            ctx.call_number,
            topic_list(ctx.topics),
            ctx.links.channel_url,
        ),
        24 => format!(
            "🔔 *Builder Call #{} MORGEN!*\n\n\
             📅 {when}\n\
             📺 Live auf YouTube\n\n\
             Nicht vergessen - morgen ist es soweit!\n\n\
             🔗 YouTube Kanal: {}",
            ctx.call_number, ctx.links.channel_url,
        ),
        1 => format!(
            "🚀 *Builder Call #{} in 1 STUNDE!*\n\n\
             📅 {when}\n\
             📺 Live auf YouTube\n\n\
             Macht euch bereit - gleich geht's los!\n\n\
             🔗 YouTube Kanal: {}",
            ctx.call_number, ctx.links.channel_url,
        ),
        hours => format!(
            "🔔 *Builder Call #{} in {hours} Stunden!*\n\n\
             📅 {when}\n\
             📺 Live auf YouTube\n\n\
             🔗 YouTube Kanal: {}",
            ctx.call_number, ctx.links.channel_url,
        ),
    }
}

pub fn announcement(call_number: u32, video: &VideoInfo, summary: &str) -> String {
    format!(
        "📺 *Builder Call #{call_number} - Aufzeichnung verfügbar!*\n\n\
         Ihr habt den Call verpasst oder wollt ihn nochmal anschauen? Kein Problem!\n\n\
         🎬 *{}*\n\n\
         📝 *Zusammenfassung:*\n{summary}\n\n\
         🔗 *Zum Video:* {}\n\n\
         Bis zum nächsten Mal! 👋",
        video.title, video.url,
    )
}

pub fn status(now: DateTime<Tz>, occurrence: DateTime<Tz>, state: &CallState) -> String {
    format!(
        "🤖 *Bot Status*\n\n\
         ✅ Bot läuft\n\
         🕐 Aktuelle Zeit: {}\n\
         📅 Nächster Call: #{} am {}\n\
         📋 Themen vorgeschlagen: {}\n\
         🔔 Erinnerungen: 3 Tage, 1 Tag, 1 Stunde vorher",
        now.format("%Y-%m-%d %H:%M %Z"),
        state.call_number,
        format_occurrence(occurrence),
        state.topics.len(),
    )
}

pub fn next_call(
    call_number: u32,
    occurrence: DateTime<Tz>,
    now: DateTime<Tz>,
    topics: &[String],
    calendar_url: Option<&str>,
) -> String {
    let until = occurrence - now;
    let days = until.num_days();
    let hours = until.num_hours() % 24;
    let minutes = until.num_minutes() % 60;
    let mut text = format!(
        "📅 *Nächster Builder Call #{call_number}*\n\n\
         🗓 {}\n\n\
         ⏳ Noch {days} Tage, {hours} Stunden und {minutes} Minuten\n\n\
         📋 Themen bisher:\n{}",
        format_occurrence(occurrence),
        topic_list(topics),
    );
    if let Some(url) = calendar_url {
        text.push_str(&format!("\n\n🗓 Kalender: {url}"));
    }
    text
}

pub fn chat_info(chat_id: i64, chat_type: &str, title: Option<&str>) -> String {
    format!(
        "📋 *Chat Information*\n\n\
         Chat ID: `{chat_id}`\n\
         Typ: {chat_type}\n\
         Name: {}\n\n\
         Trage diese ID als `chat_id` in deine config.toml ein.",
        title.unwrap_or("Privater Chat"),
    )
}

pub fn welcome() -> String {
    "Hallo! Ich bin der Builder Call Bot.\n\n\
     Ich sende automatisch Erinnerungen für den wöchentlichen Call \
     und poste Links zu den Aufzeichnungen.\n\n\
     Befehle:\n\
     /status - Zeige Bot-Status\n\
     /nextcall - Zeige nächsten Call-Termin\n\
     /addtopic <Text> - Thema für den nächsten Call vorschlagen\n\
     /callnumber [n] - Call-Nummer anzeigen oder setzen\n\
     /latestvideo - Zeige das neueste Video mit Zusammenfassung\n\
     /postvideo - Aufzeichnung jetzt ankündigen\n\
     /chatid - Zeige die Chat-ID (für Setup)"
        .to_string()
}

fn topic_list(topics: &[String]) -> String {
    if topics.is_empty() {
        return "Noch keine Themen vorgeschlagen.".to_string();
    }
    topics
        .iter()
        .map(|t| format!("• {t}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_occurrence(occurrence: DateTime<Tz>) -> String {
    format!(
        "{}, {} um {} Uhr",
        german_weekday(occurrence.weekday()),
        occurrence.format("%d.%m.%Y"),
        occurrence.format("%H:%M"),
    )
}

fn german_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Montag",
        Weekday::Tue => "Dienstag",
        Weekday::Wed => "Mittwoch",
        Weekday::Thu => "Donnerstag",
        Weekday::Fri => "Freitag",
        Weekday::Sat => "Samstag",
        Weekday::Sun => "Sonntag",
    }
}
