//! Position-keyed encoding rules and the small HTTP grammar checks the
//! validator relies on.
//!
//! The instantiator decides *which* rule applies to a slot (from its role);
//! the alphabet itself lives behind `ComponentEncoder` so a transport can
//! substitute its own encoding utility.

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};

/// RFC 3986 unreserved characters stay, everything else is escaped.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// pchar minus `/`: unreserved, sub-delims, `:` and `@` stay.
const PATH_SEGMENT: &AsciiSet = &QUERY_COMPONENT
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

const FRAGMENT: &AsciiSet = &QUERY_COMPONENT.remove(b'/').remove(b'?');

const HEADER_VALUE: &AsciiSet = CONTROLS;

/// Everything outside RFC 6265 cookie-octet, plus `%` so escapes stay unambiguous.
const COOKIE_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b',')
    .add(b';')
    .add(b'\\')
    .add(b'%');

/// Where in the request an encoded value ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    PathSegment,
    QueryComponent,
    Fragment,
    HeaderValue,
    CookieValue,
    /// `application/x-www-form-urlencoded` name or value.
    FormComponent,
}

impl Position {
    fn ascii_set(self) -> &'static AsciiSet {
        match self {
            Position::PathSegment => PATH_SEGMENT,
            Position::QueryComponent => QUERY_COMPONENT,
            Position::Fragment => FRAGMENT,
            Position::HeaderValue => HEADER_VALUE,
            Position::CookieValue => COOKIE_VALUE,
            Position::FormComponent => QUERY_COMPONENT,
        }
    }
}

/// Escapes a raw value for a request position. Must be deterministic.
pub trait ComponentEncoder: Send + Sync {
    fn encode(&self, position: Position, raw: &str) -> String;
}

/// Default percent-encoding for every position.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentEncoder;

impl ComponentEncoder for PercentEncoder {
    fn encode(&self, position: Position, raw: &str) -> String {
        let encoded = utf8_percent_encode(raw, position.ascii_set()).to_string();
        match position {
            // a literal `+` was already escaped to %2B
            Position::FormComponent => encoded.replace("%20", "+"),
            _ => encoded,
        }
    }
}

/// Format epoch milliseconds as an IMF-fixdate for the `Expires` attribute.
/// Returns `None` when the instant is outside the representable range.
pub fn http_date(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|instant| instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

/// RFC 9110 token: one or more tchar.
pub fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'.'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'|'
                        | b'~'
                )
        })
}

/// RFC 6265 cookie-octet run (may be empty).
pub fn is_cookie_octets(s: &str) -> bool {
    s.bytes().all(|b| {
        matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
    })
}

pub fn has_line_break(s: &str) -> bool {
    s.contains(['\r', '\n'])
}

/// RFC 9110 field-value: no control characters other than HTAB.
pub fn is_field_value(s: &str) -> bool {
    s.bytes().all(|b| b == b'\t' || !b.is_ascii_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(position: Position, raw: &str) -> String {
        PercentEncoder.encode(position, raw)
    }

    #[test]
    fn query_component_escapes_space_and_delimiters() {
        assert_eq!(enc(Position::QueryComponent, "a b"), "a%20b");
        assert_eq!(enc(Position::QueryComponent, "x=1&y"), "x%3D1%26y");
        assert_eq!(enc(Position::QueryComponent, "safe-._~"), "safe-._~");
    }

    #[test]
    fn path_segment_escapes_slash_but_keeps_sub_delims() {
        assert_eq!(enc(Position::PathSegment, "kingg22"), "kingg22");
        assert_eq!(enc(Position::PathSegment, "a/b"), "a%2Fb");
        assert_eq!(enc(Position::PathSegment, "v1:beta@x+y"), "v1:beta@x+y");
        assert_eq!(enc(Position::PathSegment, "caf\u{e9}"), "caf%C3%A9");
    }

    #[test]
    fn fragment_keeps_slash_and_question_mark() {
        assert_eq!(enc(Position::Fragment, "section/2?x y"), "section/2?x%20y");
    }

    #[test]
    fn header_value_escapes_only_controls() {
        assert_eq!(enc(Position::HeaderValue, "Bearer abc=="), "Bearer abc==");
        assert_eq!(enc(Position::HeaderValue, "a\r\nb"), "a%0D%0Ab");
    }

    #[test]
    fn cookie_value_escapes_separators() {
        assert_eq!(enc(Position::CookieValue, "abc123"), "abc123");
        assert_eq!(enc(Position::CookieValue, "a b;c,d"), "a%20b%3Bc%2Cd");
        assert_eq!(enc(Position::CookieValue, "100%"), "100%25");
    }

    #[test]
    fn form_component_uses_plus_for_space() {
        assert_eq!(enc(Position::FormComponent, "Bob Smith"), "Bob+Smith");
        assert_eq!(enc(Position::FormComponent, "1+1=2"), "1%2B1%3D2");
        assert_eq!(enc(Position::FormComponent, "a&b"), "a%26b");
    }

    #[test]
    fn http_date_formats_imf_fixdate() {
        assert_eq!(
            http_date(1_735_689_600_000).as_deref(),
            Some("Wed, 01 Jan 2025 00:00:00 GMT")
        );
        assert_eq!(http_date(0).as_deref(), Some("Thu, 01 Jan 1970 00:00:00 GMT"));
        assert!(http_date(i64::MAX).is_none());
    }

    #[test]
    fn token_grammar() {
        assert!(is_token("X-Request-ID"));
        assert!(is_token("SameSite"));
        assert!(!is_token(""));
        assert!(!is_token("Bad Name"));
        assert!(!is_token("a:b"));
    }

    #[test]
    fn field_value_grammar() {
        assert!(is_field_value("text/html; charset=utf-8"));
        assert!(is_field_value("a\tb"));
        assert!(is_field_value(""));
        assert!(!is_field_value("a\0b"));
        assert!(!is_field_value("a\r\nb"));
        assert!(!is_field_value("del\x7f"));
    }

    #[test]
    fn cookie_octet_grammar() {
        assert!(is_cookie_octets("abc123"));
        assert!(is_cookie_octets(""));
        assert!(!is_cookie_octets("a b"));
        assert!(!is_cookie_octets("a;b"));
        assert!(!is_cookie_octets("\"quoted\""));
    }
}
