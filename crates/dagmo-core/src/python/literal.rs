//! String literal evaluation and docstring helpers.

use tree_sitter::Node;

use super::tree::{named_children, text};

/// Split a string token into its lowercase prefix, quote delimiter and body.
fn split_literal(token: &str) -> Option<(String, &str, &str)> {
    let prefix_len = token.bytes().take_while(|c| c.is_ascii_alphabetic()).count();
    let prefix = token[..prefix_len].to_ascii_lowercase();
    let rest = &token[prefix_len..];

    let delimiter = ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find(|d| rest.starts_with(d) && rest.len() >= 2 * d.len() && rest.ends_with(d))?;
    let body = &rest[delimiter.len()..rest.len() - delimiter.len()];
    Some((prefix, delimiter, body))
}

/// Text between the quotes of a string token, unevaluated.
pub fn raw_body(token: &str) -> Option<&str> {
    split_literal(token).map(|(_, _, body)| body)
}

/// Evaluate a single string token.
///
/// Returns `None` for bytes literals and for f-strings that contain
/// replacement fields, since neither has a static text value.
pub fn string_value(token: &str) -> Option<String> {
    let (prefix, _, body) = split_literal(token)?;
    if prefix.contains('b') {
        return None;
    }

    let formatted = prefix.contains('f') || prefix.contains('t');
    if formatted && !format_fields(body).is_empty() {
        return None;
    }

    let value = if prefix.contains('r') {
        body.to_string()
    } else {
        unescape(body)
    };

    Some(if formatted {
        value.replace("{{", "{").replace("}}", "}")
    } else {
        value
    })
}

/// Static value of a `string` or `concatenated_string` node.
pub(crate) fn node_value(node: Node<'_>, source: &str) -> Option<String> {
    match node.kind() {
        "string" => string_value(text(node, source)),
        "concatenated_string" => concat_value(named_children(node).into_iter().map(|s| text(s, source))),
        _ => None,
    }
}

/// Evaluate implicitly concatenated string tokens (`"a" "b"`).
pub fn concat_value<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&string_value(token)?);
    }
    Some(out)
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            'x' | 'u' | 'U' => {
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = (0..width)
                    .filter_map(|_| chars.next_if(|d| d.is_ascii_hexdigit()))
                    .collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if digits.len() == width => out.push(decoded),
                    _ => {
                        out.push('\\');
                        out.push(next);
                        out.push_str(&digits);
                    }
                }
            }
            '0'..='7' => {
                let mut digits = String::from(next);
                while digits.len() < 3 {
                    match chars.next_if(|d| ('0'..='7').contains(d)) {
                        Some(d) => digits.push(d),
                        None => break,
                    }
                }
                match u32::from_str_radix(&digits, 8).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push_str(&digits);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    out
}

fn format_fields(body: &str) -> Vec<String> {
    let chars: Vec<char> = body.chars().collect();
    let mut fields = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => i += 2,
            '}' if chars.get(i + 1) == Some(&'}') => i += 2,
            '{' => {
                let (expr, next) = scan_field(&chars, i + 1);
                let expr = expr.trim();
                if !expr.is_empty() {
                    fields.push(expr.to_string());
                }
                i = next;
            }
            _ => i += 1,
        }
    }

    fields
}

/// Scan one replacement field starting after its `{`.
///
/// Returns the expression text and the index after the closing `}`.
fn scan_field(chars: &[char], start: usize) -> (String, usize) {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut expr_end: Option<usize> = None;
    let mut i = start;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '}' if depth > 0 => depth -= 1,
            '}' => {
                let end = expr_end.unwrap_or(i);
                return (chars[start..end].iter().collect(), i + 1);
            }
            '!' if depth == 0 && expr_end.is_none() && chars.get(i + 1) != Some(&'=') => {
                expr_end = Some(i);
            }
            ':' if depth == 0 && expr_end.is_none() => expr_end = Some(i),
            '=' if depth == 0
                && expr_end.is_none()
                && !matches!(chars.get(i + 1), Some('='))
                && !matches!(
                    i.checked_sub(1).and_then(|p| chars.get(p)),
                    Some('=' | '!' | '<' | '>')
                ) =>
            {
                expr_end = Some(i);
            }
            _ => {}
        }
        i += 1;
    }

    let end = expr_end.unwrap_or(chars.len());
    (chars[start..end].iter().collect(), chars.len())
}

/// Clean up indentation of a docstring (same rules as `inspect.cleandoc`).
///
/// Leading whitespace is removed from the first line, the common margin is
/// removed from the remaining lines, and leading and trailing blank lines
/// are dropped. Trailing whitespace is stripped from every line.
pub fn cleandoc(text: &str) -> String {
    let expanded = text.replace('\t', "        ");
    let lines: Vec<&str> = expanded.lines().collect();
    let Some((first, rest)) = lines.split_first() else {
        return String::new();
    };

    let margin = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    out.push(first.trim());
    for line in rest {
        if line.trim().is_empty() {
            out.push("");
        } else {
            out.push(line[margin..].trim_end());
        }
    }

    while out.first().is_some_and(|l| l.is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }

    out.join("\n")
}

/// Smallest indentation among the non-blank lines after the first.
fn rest_margin(text: &str) -> usize {
    text.lines()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0)
}

/// Render `text` as a triple-quoted docstring placed at `indent`.
///
/// The result evaluates (after [`cleandoc`]) back to `text` for any text
/// that is itself the output of [`cleandoc`].
pub fn docstring(text: &str, indent: &str) -> String {
    let mut escaped = text.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"");
    if escaped.ends_with('"') {
        escaped.pop();
        escaped.push_str("\\\"");
    }

    if !escaped.contains('\n') {
        return format!("\"\"\"{escaped}\"\"\"");
    }

    let mut out = String::from("\"\"\"");
    // A first line that is less indented than the rest would have its
    // relative indentation stripped; start on a fresh line instead.
    if rest_margin(text) > 0 {
        out.push('\n');
        out.push_str(indent);
    }
    for (i, line) in escaped.lines().enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(indent);
            }
        }
        out.push_str(line);
    }
    out.push('\n');
    out.push_str(indent);
    out.push_str("\"\"\"");
    out
}

/// Render `text` as a Python string literal, preferring double quotes.
pub fn quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_strings() {
        assert_eq!(string_value("'abc'").as_deref(), Some("abc"));
        assert_eq!(string_value("\"a\\nb\"").as_deref(), Some("a\nb"));
        assert_eq!(string_value("r'a\\nb'").as_deref(), Some("a\\nb"));
        assert_eq!(string_value("'''x\ny'''").as_deref(), Some("x\ny"));
        assert_eq!(string_value("'\\x41\\u00e9\\101'").as_deref(), Some("AéA"));
    }

    #[test]
    fn test_bytes_have_no_text_value() {
        assert_eq!(string_value("b'abc'"), None);
        assert_eq!(string_value("rb'abc'"), None);
    }

    #[test]
    fn test_fstrings() {
        assert_eq!(string_value("f'plain {{x}}'").as_deref(), Some("plain {x}"));
        assert_eq!(string_value("f'value {x}'"), None);
        assert_eq!(string_value("f'{d[\"k\"]:>10}'"), None);
    }

    #[test]
    fn test_concat() {
        assert_eq!(concat_value(["'a'", "\"b\""]).as_deref(), Some("ab"));
        assert_eq!(concat_value(["'a'", "f'{b}'"]), None);
    }

    #[test]
    fn test_cleandoc() {
        assert_eq!(cleandoc("\n    # Title\n\n    Body\n    "), "# Title\n\nBody");
        assert_eq!(cleandoc("Summary.\n\n    Details here.\n    "), "Summary.\n\nDetails here.");
        assert_eq!(cleandoc("  one line  "), "one line");
        assert_eq!(cleandoc(""), "");
    }

    #[test]
    fn test_docstring_single_line() {
        assert_eq!(docstring("Load data.", "    "), "\"\"\"Load data.\"\"\"");
        assert_eq!(docstring("say \"hi\"", ""), "\"\"\"say \"hi\\\"\"\"\"");
    }

    #[test]
    fn test_docstring_multi_line() {
        assert_eq!(
            docstring("Summary.\n\nDetails.", "    "),
            "\"\"\"Summary.\n\n    Details.\n    \"\"\""
        );
    }

    #[test]
    fn test_docstring_roundtrips_through_cleandoc() {
        for text in [
            "Summary.\n\nDetails.",
            "# Title\n    indented code",
            "back\\slash and \"\"\" quotes",
            "ends with quote\"",
        ] {
            let literal = docstring(text, "    ");
            let value = string_value(&literal).unwrap();
            assert_eq!(cleandoc(&value), text, "literal: {literal}");
        }
    }

    #[test]
    fn test_quoted() {
        assert_eq!(quoted("a\"b"), "\"a\\\"b\"");
        assert_eq!(string_value(&quoted("x\\y\n")).as_deref(), Some("x\\y\n"));
    }
}
