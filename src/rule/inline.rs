use crate::core::{ProxyError, Result};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\$(?:->)?\{([^}]*)\}").unwrap();
    static ref RANGE: Regex = Regex::new(r"^\s*(\d+)\s*\.\.\s*(\d+)\s*$").unwrap();
}

/// Expands inline expressions such as `ds_${0..1}.t_order_${[a, b]}`.
///
/// Comma separated segments are expanded independently; every placeholder
/// inside one segment contributes a Cartesian factor.
pub fn expand(expression: &str) -> Result<Vec<String>> {
    let mut result = Vec::new();
    for segment in split_segments(expression) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        result.extend(expand_segment(segment)?);
    }
    Ok(result)
}

/// Splits on commas outside of `${...}`
fn split_segments(expression: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in expression.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                segments.push(&expression[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&expression[start..]);
    segments
}

fn expand_segment(segment: &str) -> Result<Vec<String>> {
    let mut results = vec![String::new()];
    let mut last = 0usize;

    for caps in PLACEHOLDER.captures_iter(segment) {
        let Some(whole) = caps.get(0) else { continue };
        let literal = &segment[last..whole.start()];
        let values = placeholder_values(&caps[1])?;

        let mut next = Vec::with_capacity(results.len() * values.len());
        for prefix in &results {
            for value in &values {
                next.push(format!("{}{}{}", prefix, literal, value));
            }
        }
        results = next;
        last = whole.end();
    }

    let tail = &segment[last..];
    if tail.contains("${") || tail.contains("$->{") {
        return Err(ProxyError::Rule(format!(
            "Unterminated inline expression in '{}'",
            segment
        )));
    }

    Ok(results.into_iter().map(|prefix| format!("{}{}", prefix, tail)).collect())
}

fn placeholder_values(body: &str) -> Result<Vec<String>> {
    if let Some(caps) = RANGE.captures(body) {
        let start: u64 = caps[1]
            .parse()
            .map_err(|_| ProxyError::Rule(format!("Invalid range start in '{}'", body)))?;
        let end: u64 = caps[2]
            .parse()
            .map_err(|_| ProxyError::Rule(format!("Invalid range end in '{}'", body)))?;
        if start > end {
            return Err(ProxyError::Rule(format!("Empty range '{}'", body)));
        }
        let width = caps[1].len();
        let padded = caps[1].starts_with('0') && width > 1;
        return Ok((start..=end)
            .map(|n| if padded { format!("{:0width$}", n, width = width) } else { n.to_string() })
            .collect());
    }

    let body = body.trim();
    let list = body
        .strip_prefix('[')
        .and_then(|b| b.strip_suffix(']'))
        .ok_or_else(|| ProxyError::Rule(format!("Unsupported inline expression '{}'", body)))?;

    let values: Vec<String> = list
        .split(',')
        .map(|v| v.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
        .filter(|v| !v.is_empty())
        .collect();

    if values.is_empty() {
        return Err(ProxyError::Rule(format!("Empty list in inline expression '{}'", body)));
    }
    Ok(values)
}
