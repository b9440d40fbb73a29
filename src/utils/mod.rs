//! Small helpers shared by the library and the binaries.

pub mod time;

/// Truncate a string for display, appending `...` when it was cut.
pub fn truncate_string(s: &str, max_length: usize) -> String {
    if s.chars().count() > max_length {
        let cut: String = s.chars().take(max_length.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}
