//! Code page utilities for Latin thermal printers
//!
//! Receipt printers sold for Spanish-speaking markets ship with a single-byte
//! Western code page. Every character occupies one printed column, so layout
//! works in `char` counts and text is converted to Windows-1252 when written.
//!
//! This module provides utilities for:
//! - Measuring, truncating and padding strings to a column width
//! - Word wrapping to a column width
//! - Converting UTF-8 text to Windows-1252 bytes

/// Get the printed column width of a string
pub fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to fit within a column width
pub fn truncate_width(s: &str, max_width: usize) -> String {
    s.chars().take(max_width).collect()
}

/// Pad a string to a specific column width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad_width(s: &str, width: usize, align_right: bool) -> String {
    let current_width = text_width(s);
    if current_width >= width {
        return truncate_width(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}

/// Greedy word wrap to `width` columns
///
/// Words longer than a full line are hard-split. Embedded newlines start a
/// new line. A blank input yields a single empty line.
pub fn wrap_text(s: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in s.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let mut word = word.to_string();
            let mut word_width = text_width(&word);

            // Hard-split words that cannot fit on any line
            while word_width > width {
                if current_width > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                let head: String = word.chars().take(width).collect();
                let tail: String = word.chars().skip(width).collect();
                lines.push(head);
                word = tail;
                word_width = text_width(&word);
            }
            if word_width == 0 {
                continue;
            }

            let needed = if current_width == 0 {
                word_width
            } else {
                current_width + 1 + word_width
            };
            if needed > width {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            if current_width > 0 {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(&word);
            current_width += word_width;
        }

        if current_width > 0 || lines.is_empty() {
            lines.push(current);
        }
    }

    lines
}

/// Convert UTF-8 text to Windows-1252 bytes
///
/// ASCII passes through untouched. Characters with no Windows-1252 mapping
/// are printed as `?`.
pub fn encode_cp1252(s: &str) -> Vec<u8> {
    if s.is_ascii() {
        return s.as_bytes().to_vec();
    }

    let mut out = Vec::with_capacity(s.len());
    let mut tmp = [0u8; 4];
    for c in s.chars() {
        if c.is_ascii() {
            out.push(c as u8);
            continue;
        }
        let (cow, _, had_errors) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut tmp));
        if had_errors {
            out.push(b'?');
        } else {
            out.extend_from_slice(&cow);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("hello"), 5);
        assert_eq!(text_width("Jalapeño"), 8);
    }

    #[test]
    fn test_truncate_width() {
        assert_eq!(truncate_width("hello world", 5), "hello");
        assert_eq!(truncate_width("Año", 2), "Añ");
    }

    #[test]
    fn test_pad_width() {
        assert_eq!(pad_width("hi", 5, false), "hi   ");
        assert_eq!(pad_width("hi", 5, true), "   hi");
        assert_eq!(pad_width("hello world", 5, false), "hello");
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let lines = wrap_text("sin cebolla y con extra queso por favor", 12);
        assert!(lines.iter().all(|l| text_width(l) <= 12));
        assert_eq!(lines[0], "sin cebolla");
    }

    #[test]
    fn test_wrap_text_hard_splits_long_words() {
        let lines = wrap_text("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_text_empty() {
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn test_encode_cp1252() {
        assert_eq!(encode_cp1252("abc"), b"abc".to_vec());
        assert_eq!(encode_cp1252("ñ"), vec![0xF1]);
        assert_eq!(encode_cp1252("€"), vec![0x80]);
        assert_eq!(encode_cp1252("中"), vec![b'?']);
    }
}
