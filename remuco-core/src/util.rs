//! Small helpers shared by the core and front ends.

/// Formats a duration in seconds as `m:ss`. Minutes are not wrapped into
/// hours, so an hour and a bit reads `62:05`.
///
/// Negative values mean "unknown" and format as an empty string.
pub fn format_time(seconds: i32) -> String {
    if seconds < 0 {
        return String::new();
    }
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
