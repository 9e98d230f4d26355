// ============================================================
// Layer 4 — Newsgroup Metadata Stripper
// ============================================================
// Raw newsgroup messages carry metadata that makes topic
// classification trivially easy (the "Newsgroups:" header names
// the class outright). Three kinds of metadata are removed:
//
//   1. Header  — everything up to the first blank line
//   2. Footer  — the trailing signature block, found by scanning
//                backwards for a line made only of whitespace/'-'
//   3. Quotes  — lines that quote another post ("> ...",
//                "In article <...> foo writes:", ...)
//
// They are applied in that order. Messages in the raw archive
// are Latin-1 encoded, so decoding is a byte → char map.
//
// Reference: regex crate documentation

use regex::Regex;

const QUOTE_PATTERN: &str =
    r"(writes in|writes:|wrote:|says:|said:|^In article|^Quoted from|^\||^>)";

pub struct MetadataStripper {
    quote_re: Regex,
}

impl MetadataStripper {
    pub fn new() -> Self {
        let quote_re = Regex::new(QUOTE_PATTERN).expect("quote pattern is valid");
        Self { quote_re }
    }

    /// Apply header, footer and quote stripping in order.
    pub fn strip(&self, text: &str) -> String {
        let body = strip_header(text);
        let body = strip_footer(body);
        self.strip_quotes(&body)
    }

    /// Drop every line that looks like quoted text from another post.
    pub fn strip_quotes(&self, text: &str) -> String {
        text.split('\n')
            .filter(|line| !self.quote_re.is_match(line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for MetadataStripper {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything after the first blank line; empty if there is none.
pub fn strip_header(text: &str) -> &str {
    text.split_once("\n\n")
        .map(|(_, body)| body)
        .unwrap_or("")
}

/// Cut the signature block that follows the last separator-only line.
/// A separator on the very first line (or none at all) leaves the text
/// untouched.
pub fn strip_footer(text: &str) -> String {
    let lines: Vec<&str> = text.trim().split('\n').collect();

    let mut cut = 0;
    for (idx, line) in lines.iter().enumerate().rev() {
        cut = idx;
        if line.trim().trim_matches('-').is_empty() {
            break;
        }
    }

    if cut > 0 {
        lines[..cut].join("\n")
    } else {
        text.to_string()
    }
}

/// Decode Latin-1 bytes. Every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "From: someone@example.com\n\
Subject: Re: shuttle launch\n\
Newsgroups: sci.space\n\
\n\
In article <1234@nasa.gov> bob@nasa.gov writes:\n\
> The launch slipped again.\n\
It flew this morning after all.\n\
Orbit looked nominal.\n\
\n\
--\n\
Alice, rocket enthusiast";

    #[test]
    fn test_header_removed() {
        let body = strip_header(MESSAGE);
        assert!(!body.contains("Newsgroups:"));
        assert!(body.starts_with("In article"));
    }

    #[test]
    fn test_header_without_blank_line_is_empty() {
        assert_eq!(strip_header("Subject: nothing else"), "");
    }

    #[test]
    fn test_footer_removed() {
        let body = strip_footer(strip_header(MESSAGE));
        assert!(!body.contains("Alice"));
        assert!(body.contains("Orbit looked nominal."));
    }

    #[test]
    fn test_footer_kept_when_no_separator() {
        assert_eq!(strip_footer("one\ntwo"), "one\ntwo");
    }

    #[test]
    fn test_quotes_removed() {
        let s = MetadataStripper::new();
        let out = s.strip(MESSAGE);
        assert!(!out.contains("writes:"));
        assert!(!out.contains("slipped"));
        assert!(out.contains("It flew this morning after all."));
    }

    #[test]
    fn test_pipe_quotes_removed() {
        let s = MetadataStripper::new();
        assert_eq!(s.strip_quotes("| quoted\nkept"), "kept");
    }

    #[test]
    fn test_latin1_decoding() {
        assert_eq!(decode_latin1(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[test]
    fn test_empty_message() {
        let s = MetadataStripper::new();
        assert_eq!(s.strip(""), "");
    }
}
