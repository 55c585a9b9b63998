//! Output truncation for tool results
//!
//! Keeps the head of the output (CSV headers and the earliest rows matter
//! most) and cuts at a line boundary.

/// Result of a truncation operation
#[derive(Debug)]
pub struct TruncationResult {
    pub text: String,
    pub was_truncated: bool,
    pub chars_shown: usize,
    pub chars_total: usize,
}

impl TruncationResult {
    /// Marker appended after truncated output
    pub fn notice(&self) -> Option<String> {
        if !self.was_truncated {
            return None;
        }
        Some(format!(
            "\n\n[... OUTPUT TRUNCATED: {} chars -> {} chars ...]",
            self.chars_total, self.chars_shown
        ))
    }

    /// Text with the marker, if any
    pub fn into_output(self) -> String {
        match self.notice() {
            Some(notice) => format!("{}{}", self.text, notice),
            None => self.text,
        }
    }
}

/// Keep at most `max_chars` characters of `text`, ending on a full line when
/// possible
pub fn truncate_head(text: &str, max_chars: usize) -> TruncationResult {
    let limit = match text.char_indices().nth(max_chars) {
        Some((index, _)) => index,
        None => {
            let chars_total = text.chars().count();
            return TruncationResult {
                text: text.to_string(),
                was_truncated: false,
                chars_shown: chars_total,
                chars_total,
            };
        }
    };

    let head = &text[..limit];
    let kept = match head.rfind('\n') {
        Some(cut) => &text[..cut],
        None => head,
    };
    let chars_shown = kept.chars().count();

    TruncationResult {
        text: kept.to_string(),
        was_truncated: true,
        chars_shown,
        chars_total: text.chars().count(),
    }
}
