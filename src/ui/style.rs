use console::style;
use std::fmt::Display;

/// Cyan bold: speaker labels, bullets
pub fn accent<D: Display>(text: D) -> String {
    style(text).cyan().bold().to_string()
}

/// White bold: section headers
pub fn header<D: Display>(text: D) -> String {
    style(text).white().bold().to_string()
}

/// Dim: hints, ids, secondary text
pub fn dim<D: Display>(text: D) -> String {
    style(text).dim().to_string()
}

/// Green bold: successful outcomes
pub fn success<D: Display>(text: D) -> String {
    style(text).green().bold().to_string()
}

/// Yellow: pending confirmations, warnings
pub fn warn<D: Display>(text: D) -> String {
    style(text).yellow().to_string()
}

/// Red bold: failures shown to the user
pub fn error<D: Display>(text: D) -> String {
    style(text).red().bold().to_string()
}

/// Fixed-width speaker prefix for transcript lines.
pub fn speaker(label: &str) -> String {
    accent(format!("{label:>6}:"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_keep_text() {
        console::set_colors_enabled(false);
        assert_eq!(header("Sessions"), "Sessions");
        assert_eq!(speaker("You"), "   You:");
        assert_eq!(warn("pending"), "pending");
    }
}
