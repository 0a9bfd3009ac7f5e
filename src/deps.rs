use std::path::PathBuf;

use crate::error::{Error, Result};

/// Trims a dependency name; `None` for blank entries.
pub fn normalize_name(raw: &str) -> Option<String> {
    let s = raw.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Appends names not already present, keeping first-seen order.
pub fn push_unique<I, S>(list: &mut Vec<String>, names: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for raw in names {
        let Some(name) = normalize_name(raw.as_ref()) else {
            continue;
        };
        if !list.contains(&name) {
            list.push(name);
        }
    }
}

/// Accepts:
/// - "JQuery"
/// - "JQuery/Define"
/// - "JQuery.Define"
///
/// and returns the relative path segments used for lookup.
pub fn name_segments(name: &str) -> Result<Vec<String>> {
    let s = name.trim();
    let parts: Vec<&str> = s.split(['/', '.', '\\']).collect();

    if s.is_empty() || parts.iter().any(|p| p.trim().is_empty()) {
        return Err(Error::Resolution {
            name: name.to_string(),
        });
    }

    Ok(parts.into_iter().map(|p| p.trim().to_string()).collect())
}

/// Spelling-independent key for a logical name: `JQuery.Define` and
/// `JQuery/Define` both become `JQuery/Define`.
pub fn canonical_name(name: &str) -> Result<String> {
    Ok(name_segments(name)?.join("/"))
}

/// Candidate files for a logical name under one base dir, in probe order:
/// `<dir>/<segments>.toml`, then `<dir>/<segments>/index.toml`.
pub fn candidate_files(base: &std::path::Path, segments: &[String]) -> [PathBuf; 2] {
    let mut dir = base.to_path_buf();
    for seg in segments {
        dir.push(seg);
    }
    [dir.with_extension("toml"), dir.join("index.toml")]
}

/// Renders a dependency chain for cycle reports, closing the loop on `name`.
pub fn cycle_chain(stack: &[String], name: &str) -> Vec<String> {
    let start = stack.iter().position(|n| n == name).unwrap_or(0);
    let mut chain: Vec<String> = stack[start..].to_vec();
    chain.push(name.to_string());
    chain
}
