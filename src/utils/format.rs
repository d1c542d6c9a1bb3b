//! Countdown display formatting

/// Format seconds as `MM:SS`, or `HH:MM:SS` once an hour or more is left
pub fn format_time_left(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
