//! Glob matching for pattern deletes on the local tier
//!
//! Supports the subset of Redis `MATCH` syntax the manager uses: `*` for any
//! run of characters and `?` for exactly one.

use survey_cache_core::{CacheError, Result};

/// Reject patterns that would match nothing useful or everything by accident
pub fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(CacheError::Pattern("empty pattern".to_string()));
    }
    if pattern.contains(['[', ']', '\\']) {
        return Err(CacheError::Pattern(format!(
            "unsupported character class or escape in {pattern:?}"
        )));
    }
    Ok(())
}

/// Match `text` against a `*`/`?` glob
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` and the text index it was tried against
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}
