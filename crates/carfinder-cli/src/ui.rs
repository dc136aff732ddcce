//! Plain-text rendering for the terminal

use carfinder_api::{Alert, AlertStats, HistoryEntry, format_mileage, format_price};
use carfinder_chat::ProgressFlags;

use crate::utils::truncate_chars;

/// Progress checklist, one step per line
pub fn render_progress(flags: &ProgressFlags) -> String {
    let mut out: Vec<String> = flags
        .steps()
        .iter()
        .map(|(label, done)| format!("  [{}] {}", if *done { "x" } else { " " }, label))
        .collect();
    out.push(format!("  {}/{} complete", flags.completed(), flags.steps().len()));
    out.join("\n")
}

/// Compact progress line for status output
pub fn progress_line(flags: &ProgressFlags) -> String {
    format!("[progress {}/{}]", flags.completed(), flags.steps().len())
}

/// One alert card
pub fn render_alert(alert: &Alert) -> String {
    let listing = &alert.listing;

    let mut title = listing.title();
    if let Some(trim) = &listing.trim {
        if !title.is_empty() {
            title.push(' ');
        }
        title.push_str(trim);
    }
    if title.is_empty() {
        title = listing.vin.clone();
    }

    let mut header = format!("{}  {}% Match", title, alert.match_percent());
    if alert.is_unseen() {
        header.push_str("  [NEW]");
    }

    let mut details = vec![format_price(listing.price), format_mileage(listing.mileage)];
    if let Some(color) = &listing.exterior_color {
        details.push(color.clone());
    }

    let mut lines = vec![header, format!("  {}", details.join(" | "))];

    let location = listing.dealer.location();
    match (&listing.dealer.name, location.is_empty()) {
        (Some(name), false) => lines.push(format!("  {} ({})", name, location)),
        (Some(name), true) => lines.push(format!("  {}", name)),
        (None, false) => lines.push(format!("  {}", location)),
        (None, true) => {}
    }
    if let Some(url) = &listing.listing_url {
        lines.push(format!("  {}", url));
    }
    lines.join("\n")
}

/// The whole feed, newest first as the server returns it
pub fn render_alerts(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "No alerts yet. Save your preferences in chat to start receiving matches."
            .to_string();
    }
    alerts
        .iter()
        .map(render_alert)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_stats(stats: &AlertStats) -> String {
    let mut out = format!(
        "{} alerts ({} unseen)",
        stats.total_alerts, stats.unseen_alerts
    );
    for (day, count) in &stats.alerts_by_day {
        out.push_str(&format!("\n  {}: {}", day, count));
    }
    out
}

/// Server-side transcript entry, shortened for display
pub fn render_history_entry(entry: &HistoryEntry) -> String {
    format!("{}: {}", entry.role, truncate_chars(&entry.content, 200))
}
