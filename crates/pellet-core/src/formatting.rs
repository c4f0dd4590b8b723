/// Longest display name shown on chart axes before truncation.
pub const MAX_LABEL_CHARS: usize = 15;

/// Shorten a display name for a chart axis.
///
/// Names longer than `max_chars` characters keep their first `max_chars`
/// characters followed by `"..."`.
///
/// # Examples
///
/// ```
/// use pellet_core::formatting::truncate_label;
///
/// assert_eq!(truncate_label("Alice", 15), "Alice");
/// assert_eq!(truncate_label("Bartholomew Winterbottom", 15), "Bartholomew Win...");
/// ```
pub fn truncate_label(name: &str, max_chars: usize) -> String {
    if name.chars().count() > max_chars {
        let head: String = name.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

/// Render a bin boundary without a trailing `.0` for whole numbers.
///
/// # Examples
///
/// ```
/// use pellet_core::formatting::format_bound;
///
/// assert_eq!(format_bound(10.0), "10");
/// assert_eq!(format_bound(2.5), "2.5");
/// ```
pub fn format_bound(value: f64) -> String {
    format!("{}", value)
}

/// Label for the half-open bin `[lo, hi)`, e.g. `"8-10"`.
pub fn bin_label(lo: f64, hi: f64) -> String {
    format!("{}-{}", format_bound(lo), format_bound(hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_exactly_at_limit() {
        let fifteen = "abcdefghijklmno";
        assert_eq!(truncate_label(fifteen, MAX_LABEL_CHARS), fifteen);
        assert_eq!(
            truncate_label("abcdefghijklmnop", MAX_LABEL_CHARS),
            "abcdefghijklmno..."
        );
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let name = "Jürgen Müller-Lüdenscheidt";
        let out = truncate_label(name, MAX_LABEL_CHARS);
        assert_eq!(out, "Jürgen Müller-L...");
    }

    #[test]
    fn test_bin_label() {
        assert_eq!(bin_label(0.0, 2.0), "0-2");
        assert_eq!(bin_label(12.0, 15.0), "12-15");
        assert_eq!(bin_label(0.5, 1.25), "0.5-1.25");
    }
}
