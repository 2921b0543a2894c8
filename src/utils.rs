use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Parse a label selector string (`k=v,k2=v2`) into a BTreeMap.
pub fn parse_labels(sel_str: &str) -> anyhow::Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for pair in sel_str.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((key, value)) = pair.split_once('=') else {
            anyhow::bail!("Invalid label selector '{}': expected key=value", pair);
        };
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Invalid label selector '{}': empty key", pair);
        }
        map.insert(key.to_string(), value.trim().to_string());
    }
    if map.is_empty() {
        anyhow::bail!("Label selector '{}' has no key=value pairs", sel_str);
    }
    Ok(map)
}

/// Check that every selector entry is present in `labels` with the same value.
///
/// An empty selector selects nothing.
pub fn selector_matches(
    selector: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> bool {
    !selector.is_empty()
        && selector
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
}

/// Map every character outside `[A-Za-z0-9_]` to `_`.
pub fn sanitize_id(raw: &str) -> String {
    let id: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if id.is_empty() { "_".to_string() } else { id }
}

/// Escape characters that would end or confuse a quoted Mermaid label.
pub fn sanitize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '"' => out.push_str("#quot;"),
            '[' => out.push_str("#91;"),
            ']' => out.push_str("#93;"),
            '(' => out.push_str("#40;"),
            ')' => out.push_str("#41;"),
            '{' => out.push_str("#123;"),
            '}' => out.push_str("#125;"),
            '<' => out.push_str("#lt;"),
            '>' => out.push_str("#gt;"),
            '|' => out.push_str("#124;"),
            '`' => out.push_str("#96;"),
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

/// Six hex digits of SHA-256 over the length-prefixed parts.
///
/// Used to split colliding identifiers; stable across toolchains.
pub fn short_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    digest[..3].iter().map(|b| format!("{:02x}", b)).collect()
}
