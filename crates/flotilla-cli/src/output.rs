//! Formatted output helpers for CLI commands.
//!
//! Provides the `ps` table and human-readable container ages.

use chrono::{DateTime, Utc};
use flotilla_compose::containers::{Containers, canonical_name};

/// Formats the age of an RFC 3339 timestamp relative to `now`
/// (e.g., "5 minutes ago"). Unparsable timestamps are shown as-is.
#[must_use]
pub fn format_age(created_at: &str, now: DateTime<Utc>) -> String {
    let Ok(created) = DateTime::parse_from_rfc3339(created_at) else {
        return created_at.to_string();
    };
    let secs = (now - created.with_timezone(&Utc)).num_seconds().max(0);

    let (value, unit) = match secs {
        0..=59 => return "Less than a minute ago".to_string(),
        60..=3_599 => (secs / 60, "minute"),
        3_600..=86_399 => (secs / 3_600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    if value == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{value} {unit}s ago")
    }
}

/// Renders the `ps` table, header first.
#[must_use]
pub fn container_table(containers: &Containers, now: DateTime<Utc>) -> Vec<String> {
    let rows: Vec<[String; 5]> = containers
        .iter()
        .map(|c| {
            [
                canonical_name(c),
                c.service().unwrap_or("-").to_string(),
                c.state.to_string(),
                if c.image.is_empty() { "-".to_string() } else { c.image.clone() },
                format_age(&c.created_at, now),
            ]
        })
        .collect();

    let header = ["NAME", "SERVICE", "STATE", "IMAGE", "CREATED"].map(String::from);
    let mut widths = header.each_ref().map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    std::iter::once(&header)
        .chain(&rows)
        .map(|row| {
            row.iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("   ")
                .trim_end()
                .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use flotilla_common::types::ContainerState;
    use flotilla_runtime::state::StateEntry;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    fn ago(duration: Duration) -> String {
        (now() - duration).to_rfc3339()
    }

    #[test]
    fn format_age_displays_seconds() {
        assert_eq!(format_age(&ago(Duration::seconds(30)), now()), "Less than a minute ago");
    }

    #[test]
    fn format_age_displays_minutes() {
        assert_eq!(format_age(&ago(Duration::minutes(1)), now()), "1 minute ago");
        assert_eq!(format_age(&ago(Duration::minutes(5)), now()), "5 minutes ago");
    }

    #[test]
    fn format_age_displays_hours_and_days() {
        assert_eq!(format_age(&ago(Duration::hours(3)), now()), "3 hours ago");
        assert_eq!(format_age(&ago(Duration::days(2)), now()), "2 days ago");
    }

    #[test]
    fn format_age_keeps_garbage() {
        assert_eq!(format_age("yesterday", now()), "yesterday");
    }

    #[test]
    fn table_aligns_columns() {
        let mut web = StateEntry::service_replica("shop", "web", 1)
            .with_state(ContainerState::Running)
            .with_image("nginx:1.27");
        web.created_at = ago(Duration::minutes(2));
        let mut db = StateEntry::service_replica("shop", "db", 1).with_state(ContainerState::Stopped);
        db.created_at = ago(Duration::hours(1));
        let containers = Containers::new(vec![web.summary(), db.summary()]);

        let lines = container_table(&containers, now());
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME         SERVICE"));
        assert!(lines[1].starts_with("shop-web-1   web       running   nginx:1.27"));
        assert!(lines[2].contains("stopped"));
        assert!(lines[2].ends_with("1 hour ago"));
    }
}
