//! Escaping capability used by attribute rendering
//!
//! The engine does not hard-wire an escaping policy; it consumes an
//! [`Escaper`] and applies it to the configured set of sensitive attribute
//! names. [`DefaultEscaper`] covers the common markup contexts.

/// Context-specific escaping functions
pub trait Escaper {
    fn escape_html(&self, s: &str) -> String;
    fn escape_html_attr(&self, s: &str) -> String;
    fn escape_js(&self, s: &str) -> String;
    fn escape_css(&self, s: &str) -> String;
    fn escape_url(&self, s: &str) -> String;
}

/// Plain string-replacement escaper
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEscaper;

impl Escaper for DefaultEscaper {
    fn escape_html(&self, s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#039;")
    }

    fn escape_html_attr(&self, s: &str) -> String {
        self.escape_html(s)
    }

    fn escape_js(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for ch in s.chars() {
            match ch {
                '\\' => out.push_str("\\\\"),
                '"' => out.push_str("\\\""),
                '\'' => out.push_str("\\'"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                // Keeps "</script>" from terminating an inline block
                '<' => out.push_str("\\u003C"),
                c => out.push(c),
            }
        }
        out
    }

    fn escape_css(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for ch in s.chars() {
            if ch.is_ascii_alphanumeric() {
                out.push(ch);
            } else {
                out.push_str(&format!("\\{:x} ", ch as u32));
            }
        }
        out
    }

    fn escape_url(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for byte in s.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
                out.push(byte as char);
            } else {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
        out
    }
}
