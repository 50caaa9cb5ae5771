// src/pretty.rs

//! Human-readable elapsed time.

/// Format a whole number of seconds as `MM:SS`, or `HH:MM:SS` once at least
/// one hour has elapsed.
///
/// Every field is zero-padded to two digits; an hour count of 100 or more is
/// printed in full.
pub fn pretty_time(seconds: u64) -> String {
    let (minutes, secs) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}
