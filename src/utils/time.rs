use chrono::Duration;

/// This is the standard way of showing tracked time in feedblock. Only the two most significant
/// units are shown: `1h 2m`, `1m 30s`, `45s`.
pub fn format_time(v: Duration) -> String {
    let seconds = v.num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::format_time;

    #[test]
    fn formats_two_most_significant_units() {
        assert_eq!(format_time(Duration::milliseconds(90_000)), "1m 30s");
        assert_eq!(format_time(Duration::milliseconds(3_723_000)), "1h 2m");
        assert_eq!(format_time(Duration::milliseconds(45_999)), "45s");
        assert_eq!(format_time(Duration::zero()), "0s");
        assert_eq!(format_time(Duration::hours(30)), "30h 0m");
    }
}
