//! Minimal tagged-YAML reader for writing values by hand.
//!
//! Supports block sequences and mappings, inline `[a, b]` sequences, quoted
//! strings and the value tags `!present`, `!absent`, `!success`, `!failure`,
//! `!i64`, `!f64`, `!text`, `!bool`, `!date` and `!null`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};

use crate::option::Optional;
use crate::result::Fallible;
use crate::value::Value;

#[derive(Clone, Debug)]
enum Node {
    Scalar(String),
    Sequence(Vec<Node>),
    Mapping(BTreeMap<String, Node>),
    Tagged { tag: String, value: Box<Node> },
}

struct Line<'a> {
    indent: usize,
    content: &'a str,
}

fn preprocess(input: &str) -> Vec<Line<'_>> {
    input
        .lines()
        .filter_map(|raw| {
            let stripped = strip_comment(raw).trim_end();
            let trimmed = stripped.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('%') || trimmed == "---" {
                return None;
            }
            let indent = stripped.len() - trimmed.len();
            Some(Line {
                indent,
                content: trimmed,
            })
        })
        .collect()
}

// `#` inside a quoted string is text, not a comment.
fn strip_comment(raw: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (pos, ch) in raw.char_indices() {
        match ch {
            '\\' if in_quotes && !escaped => {
                escaped = true;
                continue;
            }
            '"' if !escaped => in_quotes = !in_quotes,
            '#' if !in_quotes => return &raw[..pos],
            _ => {}
        }
        escaped = false;
    }
    raw
}

fn parse_node(lines: &[Line<'_>], idx: &mut usize, indent: usize) -> Result<Node> {
    if *idx >= lines.len() {
        bail!("unexpected end of document");
    }
    let line = &lines[*idx];
    if line.indent < indent {
        bail!("invalid indentation at line {}", *idx + 1);
    }
    if line.content.starts_with("- ") || line.content == "-" {
        parse_sequence(lines, idx, line.indent)
    } else if is_mapping_entry(line.content) {
        parse_mapping(lines, idx, line.indent)
    } else {
        parse_scalar_node(lines, idx, indent)
    }
}

fn is_mapping_entry(content: &str) -> bool {
    if content.starts_with('!') || content.starts_with('"') || content.starts_with('[') {
        return false;
    }
    match content.find(':') {
        Some(pos) => !content[pos..].starts_with("://"),
        None => false,
    }
}

fn parse_sequence(lines: &[Line<'_>], idx: &mut usize, indent: usize) -> Result<Node> {
    let mut items = Vec::new();
    while *idx < lines.len() {
        let line = &lines[*idx];
        if line.indent != indent {
            break;
        }
        if !(line.content.starts_with("- ") || line.content == "-") {
            break;
        }
        let remainder = line.content[1..].trim_start();
        *idx += 1;
        let item = if remainder.is_empty() {
            parse_node(lines, idx, indent + 2)?
        } else {
            parse_tag_or_scalar(lines, idx, indent + 2, remainder)?
        };
        items.push(item);
    }
    Ok(Node::Sequence(items))
}

fn parse_mapping(lines: &[Line<'_>], idx: &mut usize, indent: usize) -> Result<Node> {
    let mut map = BTreeMap::new();
    while *idx < lines.len() {
        let line = &lines[*idx];
        if line.indent != indent || !is_mapping_entry(line.content) {
            break;
        }
        let (key, rest) = line
            .content
            .split_once(':')
            .ok_or_else(|| anyhow!("expected `key: value` at line {}", *idx + 1))?;
        let key = decode_string(key.trim())?;
        let rest = rest.trim_start();
        *idx += 1;
        let value = if rest.is_empty() {
            parse_node(lines, idx, indent + 2)?
        } else {
            parse_tag_or_scalar(lines, idx, indent + 2, rest)?
        };
        if map.contains_key(&key) {
            bail!("duplicate key `{key}` in mapping");
        }
        map.insert(key, value);
    }
    Ok(Node::Mapping(map))
}

fn parse_tag_or_scalar(
    lines: &[Line<'_>],
    idx: &mut usize,
    indent: usize,
    text: &str,
) -> Result<Node> {
    if let Some(rest) = text.strip_prefix('!') {
        let (tag, remainder) = match rest.split_once(char::is_whitespace) {
            Some((tag, remainder)) => (tag, remainder.trim()),
            None => (rest, ""),
        };
        if tag.is_empty() {
            bail!("missing tag after `!`");
        }
        let inner = if remainder.is_empty() {
            if *idx >= lines.len() || lines[*idx].indent < indent {
                Node::Scalar(String::new())
            } else {
                parse_node(lines, idx, indent)?
            }
        } else {
            parse_tag_or_scalar(lines, idx, indent, remainder)?
        };
        Ok(Node::Tagged {
            tag: tag.to_string(),
            value: Box::new(inner),
        })
    } else if let Some(items) = parse_inline_sequence(text)? {
        Ok(Node::Sequence(items))
    } else {
        Ok(Node::Scalar(text.to_string()))
    }
}

fn parse_inline_sequence(text: &str) -> Result<Option<Vec<Node>>> {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
        return Ok(None);
    };
    let mut items = Vec::new();
    for entry in split_inline(inner)? {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        items.push(parse_inline_item(entry)?);
    }
    Ok(Some(items))
}

fn parse_inline_item(entry: &str) -> Result<Node> {
    if let Some(rest) = entry.strip_prefix('!') {
        let (tag, remainder) = match rest.split_once(char::is_whitespace) {
            Some((tag, remainder)) => (tag, remainder.trim()),
            None => (rest, ""),
        };
        let inner = if remainder.is_empty() {
            Node::Scalar(String::new())
        } else {
            parse_inline_item(remainder)?
        };
        return Ok(Node::Tagged {
            tag: tag.to_string(),
            value: Box::new(inner),
        });
    }
    match parse_inline_sequence(entry)? {
        Some(items) => Ok(Node::Sequence(items)),
        None => Ok(Node::Scalar(entry.to_string())),
    }
}

// Split on top-level commas, leaving nested brackets and quoted text intact.
fn split_inline(inner: &str) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (pos, ch) in inner.char_indices() {
        if in_quotes {
            match ch {
                '\\' if !escaped => {
                    escaped = true;
                    continue;
                }
                '"' if !escaped => in_quotes = false,
                _ => {}
            }
            escaped = false;
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| anyhow!("unbalanced `]` in inline sequence"))?;
            }
            ',' if depth == 0 => {
                parts.push(&inner[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || in_quotes {
        bail!("unterminated inline sequence `[{inner}]`");
    }
    parts.push(&inner[start..]);
    Ok(parts)
}

fn parse_scalar_node(lines: &[Line<'_>], idx: &mut usize, indent: usize) -> Result<Node> {
    let content = lines[*idx].content;
    *idx += 1;
    parse_tag_or_scalar(lines, idx, indent, content)
}

fn decode_string(raw: &str) -> Result<String> {
    if raw.starts_with('"') {
        if raw.len() < 2 || !raw.ends_with('"') {
            bail!("unterminated string literal `{raw}`");
        }
        let mut result = String::new();
        let mut chars = raw[1..raw.len() - 1].chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                let next = chars.next().ok_or_else(|| anyhow!("incomplete escape"))?;
                match next {
                    'n' => result.push('\n'),
                    'r' => result.push('\r'),
                    't' => result.push('\t'),
                    '"' => result.push('"'),
                    '\\' => result.push('\\'),
                    other => bail!("unsupported escape `\\{other}`"),
                }
            } else {
                result.push(ch);
            }
        }
        Ok(result)
    } else {
        Ok(raw.to_string())
    }
}

/// Parse a YAML document into a single value.
pub fn parse_value_from_str(input: &str) -> Result<Value> {
    let lines = preprocess(input);
    if lines.is_empty() {
        return Ok(Value::Null);
    }
    let mut idx = 0;
    let node = parse_node(&lines, &mut idx, 0)?;
    if idx < lines.len() {
        bail!("unexpected content at line {}", idx + 1);
    }
    decode_value(node)
}

pub fn parse_value_from_file(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_value_from_str(&contents)
}

fn decode_value(node: Node) -> Result<Value> {
    match node {
        Node::Scalar(text) => parse_scalar_value(&text),
        Node::Tagged { tag, value } => decode_tagged(&tag, *value),
        Node::Sequence(items) => Ok(Value::Seq(
            items.into_iter().map(decode_value).collect::<Result<_>>()?,
        )),
        Node::Mapping(entries) => {
            let mut map = BTreeMap::new();
            for (key, node) in entries {
                map.insert(key, decode_value(node)?);
            }
            Ok(Value::Map(map))
        }
    }
}

fn decode_tagged(tag: &str, node: Node) -> Result<Value> {
    match tag {
        "present" => Ok(Optional::Present(decode_payload(tag, node)?).into()),
        "absent" => {
            expect_empty(tag, &node)?;
            Ok(Optional::<Value>::Absent.into())
        }
        "success" => Ok(Fallible::<Value, Value>::Success(decode_payload(tag, node)?).into()),
        "failure" => Ok(Fallible::<Value, Value>::Failure(decode_payload(tag, node)?).into()),
        "i64" => {
            let scalar = as_scalar(&node)?;
            let number: i64 = scalar
                .parse()
                .with_context(|| format!("invalid i64 `{scalar}`"))?;
            Ok(Value::Int(number))
        }
        "f64" => {
            let scalar = as_scalar(&node)?;
            let number: f64 = scalar
                .parse()
                .with_context(|| format!("invalid f64 `{scalar}`"))?;
            Ok(Value::Float(number))
        }
        "text" => Ok(Value::Text(as_scalar(&node)?)),
        "bool" => match as_scalar(&node)?.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => bail!("invalid bool `{other}`"),
        },
        "date" => {
            let scalar = as_scalar(&node)?;
            let ms: i64 = scalar
                .parse()
                .with_context(|| format!("date must be milliseconds since epoch, got `{scalar}`"))?;
            Ok(Value::Date(ms))
        }
        "null" => {
            expect_empty(tag, &node)?;
            Ok(Value::Null)
        }
        other => bail!("unsupported value tag `{other}`"),
    }
}

fn decode_payload(tag: &str, node: Node) -> Result<Value> {
    if matches!(&node, Node::Scalar(text) if text.is_empty()) {
        bail!("`!{tag}` requires a payload");
    }
    decode_value(node)
}

fn expect_empty(tag: &str, node: &Node) -> Result<()> {
    match node {
        Node::Scalar(text) if text.is_empty() => Ok(()),
        other => bail!("`!{tag}` takes no payload, found {:?}", other),
    }
}

fn parse_scalar_value(text: &str) -> Result<Value> {
    if text == "~" || text.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }
    match text {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }
    if let Ok(number) = text.parse::<i64>() {
        return Ok(Value::Int(number));
    }
    match text.parse::<f64>() {
        Ok(number) if looks_numeric(text) => return Ok(Value::Float(number)),
        _ => {}
    }
    Ok(Value::Text(decode_string(text)?))
}

// Words like `inf` or `NaN` stay text unless tagged `!f64`.
fn looks_numeric(text: &str) -> bool {
    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    let digits = unsigned.strip_prefix('.').unwrap_or(unsigned);
    digits.starts_with(|c: char| c.is_ascii_digit())
}

fn as_scalar(node: &Node) -> Result<String> {
    match node {
        Node::Scalar(text) => decode_string(text),
        other => bail!("expected scalar node, found {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tagged_sequence() -> Result<()> {
        let doc = r#"
- !present 1
- !absent
- !present !success "hello # not a comment"
- !failure
  code: 7
  reason: "bad input"
"#;
        let value = parse_value_from_str(doc)?;
        let Value::Seq(items) = value else {
            panic!("expected sequence");
        };
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], Value::from(Optional::Present(1i64)));
        assert_eq!(items[1], Value::from(Optional::<Value>::Absent));
        assert_eq!(
            items[2],
            Value::from(Optional::Present(Fallible::<&str, Value>::Success(
                "hello # not a comment"
            )))
        );
        let Some(Fallible::Failure(Value::Map(error))) = items[3].clone().into_fallible() else {
            panic!("expected failure with mapping payload");
        };
        assert_eq!(error.get("code"), Some(&Value::Int(7)));
        assert_eq!(error.get("reason"), Some(&Value::from("bad input")));
        Ok(())
    }

    #[test]
    fn parse_scalars_and_mapping() -> Result<()> {
        let doc = r#"
# comment line
when: !date 1700000000000
ratio: 0.5
flag: true
url: http://example.com
items: [1, !absent, [a, "b,c"]]
"#;
        let Value::Map(map) = parse_value_from_str(doc)? else {
            panic!("expected mapping");
        };
        assert_eq!(map.get("when"), Some(&Value::Date(1_700_000_000_000)));
        assert_eq!(map.get("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(map.get("flag"), Some(&Value::Bool(true)));
        assert_eq!(map.get("url"), Some(&Value::from("http://example.com")));
        assert_eq!(
            map.get("items"),
            Some(&Value::Seq(vec![
                Value::Int(1),
                Value::from(Optional::<Value>::Absent),
                Value::from(vec!["a", "b,c"]),
            ]))
        );
        Ok(())
    }

    #[test]
    fn single_tagged_root() -> Result<()> {
        let value = parse_value_from_str("!success !text \"a:b\"\n")?;
        assert_eq!(value, Value::from(Fallible::<&str, Value>::Success("a:b")));
        Ok(())
    }

    #[test]
    fn empty_document_is_null() -> Result<()> {
        assert_eq!(parse_value_from_str("# nothing\n")?, Value::Null);
        Ok(())
    }

    #[test]
    fn present_without_payload_fails() {
        assert!(parse_value_from_str("- !present\n").is_err());
    }

    #[test]
    fn float_words_stay_text() -> Result<()> {
        let value = parse_value_from_str("- inf\n- NaN\n- -infinity\n- -1.5\n- .5\n- 1e3\n")?;
        assert_eq!(
            value,
            Value::Seq(vec![
                Value::from("inf"),
                Value::from("NaN"),
                Value::from("-infinity"),
                Value::Float(-1.5),
                Value::Float(0.5),
                Value::Float(1000.0),
            ])
        );
        Ok(())
    }

    #[test]
    fn tagged_float_words_still_parse() -> Result<()> {
        let value = parse_value_from_str("!f64 inf\n")?;
        assert_eq!(value, Value::Float(f64::INFINITY));
        Ok(())
    }

    #[test]
    fn unknown_tag_fails() {
        let err = parse_value_from_str("- !maybe 1\n").unwrap_err();
        assert!(err.to_string().contains("unsupported value tag"));
    }
}
