//! Notification text for the organizers' chat.
//!
//! Formatting is a pure function of the submission and a timestamp, so the
//! same input always renders byte-identical text.

use chrono::{DateTime, FixedOffset, Utc};

use crate::models::{Attendance, RsvpSubmission};

/// Wishes longer than this many characters are cut.
pub const WISHES_LIMIT: usize = 200;

const TRUNCATION_MARKER: &str = "...";
const NO_COMPANION: &str = "Без спутника";
const NO_DRINKS: &str = "Не указаны";

/// Moscow time, UTC+03:00 all year round.
const DISPLAY_OFFSET_SECS: i32 = 3 * 3600;

/// Backslash-escape the characters legacy Telegram Markdown treats as entity
/// delimiters. Telegram shows the escaped text exactly as the guest typed it.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Display label for a drink tag. Unknown tags are shown as they came.
pub fn drink_label(tag: &str) -> &str {
    match tag {
        "champagne" => "Шампанское",
        "white-wine" => "Белое вино",
        "red-wine" => "Красное вино",
        "vodka" => "Водка",
        "whiskey" => "Виски",
        "no-alcohol" => "Без алкоголя",
        other => other,
    }
}

/// Marker and phrase for an attendance answer.
pub fn attendance_label(attendance: Attendance) -> (&'static str, &'static str) {
    match attendance {
        Attendance::Yes => ("✅", "Придёт"),
        Attendance::No => ("❌", "Не сможет прийти"),
    }
}

/// Cut text to [`WISHES_LIMIT`] characters, appending a marker when cut.
pub fn truncate_wishes(wishes: &str) -> String {
    if wishes.chars().count() <= WISHES_LIMIT {
        return wishes.to_string();
    }
    let mut cut: String = wishes.chars().take(WISHES_LIMIT).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Render the Markdown message sent to the organizers.
pub fn format_message(submission: &RsvpSubmission, received_at: DateTime<Utc>) -> String {
    let (marker, phrase) = attendance_label(submission.attendance);

    let companion = submission
        .companion
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(NO_COMPANION);

    let drinks = if submission.drinks.is_empty() {
        NO_DRINKS.to_string()
    } else {
        submission
            .drinks
            .iter()
            .map(|tag| escape_markdown(drink_label(tag)))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut lines = vec![
        "🎉 *Новый ответ на приглашение!*".to_string(),
        String::new(),
        format!("👤 *Имя:* {}", escape_markdown(&submission.name)),
        format!("{} *Статус:* {}", marker, phrase),
        format!("👫 *Спутник:* {}", escape_markdown(companion)),
        format!("🥂 *Напитки:* {}", drinks),
    ];

    if let Some(wishes) = submission.wishes.as_deref().filter(|w| !w.trim().is_empty()) {
        lines.push(format!(
            "💌 *Пожелания:* {}",
            escape_markdown(&truncate_wishes(wishes))
        ));
    }

    if let Some(email) = submission.email.as_deref().filter(|e| !e.trim().is_empty()) {
        lines.push(format!("📧 *Email:* {}", escape_markdown(email.trim())));
    }

    let local = received_at.with_timezone(&display_offset());
    lines.push(String::new());
    lines.push(format!(
        "🕐 *Получено:* {} в {}",
        local.format("%d.%m.%Y"),
        local.format("%H:%M")
    ));

    lines.join("\n")
}

fn display_offset() -> FixedOffset {
    FixedOffset::east_opt(DISPLAY_OFFSET_SECS).expect("display offset is within ±24h")
}
