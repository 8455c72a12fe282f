//! XML text helpers used by the renderers.

use std::borrow::Cow;

/// Escape the five XML-sensitive characters (`< > & ' "`).
///
/// Returns the input unchanged (borrowed) when nothing needs escaping.
pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(&['<', '>', '&', '\'', '"'][..]) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Whether `s` can be written as an element name.
///
/// Follows the XML `Name` production: a letter, `_` or `:` first, then
/// letters, digits, `-`, `.`, `_`, `:` or U+00B7. Non-ASCII alphanumerics
/// count as letters and digits.
pub fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start = |c: char| c.is_alphabetic() || c == '_' || c == ':';
    start(first)
        && chars.all(|c| start(c) || c.is_alphanumeric() || matches!(c, '-' | '.' | '\u{b7}'))
}

/// Append `<tag>escaped text</tag>` to `out`.
pub(crate) fn push_text_element(out: &mut String, tag: &str, text: &str) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(&escape(text));
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}
