use std::fmt::Write;
use std::time::SystemTime;

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::domain::HistoryPoint;
use crate::ui::table::format_coins;

pub fn render_history(item_id: &str, range_label: &str, points: &[HistoryPoint]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Price history for {item_id} ({range_label})");

    if points.is_empty() {
        let _ = writeln!(out, "No history available.");
        return out;
    }

    let _ = writeln!(out, "{:<22} {:>12} {:>12}", "Time (UTC)", "Buy", "Sell");
    for point in points {
        let _ = writeln!(
            out,
            "{:<22} {:>12} {:>12}",
            format_time(point.time),
            format_coins(point.buy_price),
            format_coins(point.sell_price)
        );
    }
    out
}

fn format_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .replace_nanosecond(0)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| "?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn renders_points_in_utc() {
        let points = [HistoryPoint {
            time: SystemTime::UNIX_EPOCH + Duration::from_millis(1_709_294_400_250),
            buy_price: 1_500.0,
            sell_price: 9.0,
        }];
        let text = render_history("ENCHANTED_CARROT", "1d", &points);
        assert!(text.contains("2024-03-01T12:00:00Z"));
        assert!(text.contains("2k"));
        assert!(text.contains("9.0"));
    }

    #[test]
    fn empty_history_is_reported() {
        let text = render_history("X", "1h", &[]);
        assert!(text.ends_with("No history available.\n"));
    }
}
