use std::{borrow::Cow, collections::BTreeSet};
use tabula_core::native::StringOp;

/// Evaluate one string predicate against a stored string. A null pattern
/// matches no row, and neither does a null cell.
pub(crate) fn string_matches(
    op: StringOp,
    value: Option<&str>,
    pattern: Option<&str>,
    case_sensitive: bool,
) -> bool {
    let (Some(value), Some(pattern)) = (value, pattern) else {
        return false;
    };
    let value = fold(value, case_sensitive);
    let pattern = fold(pattern, case_sensitive);

    match op {
        StringOp::Contains => value.contains(pattern.as_ref()),
        StringOp::StartsWith => value.starts_with(pattern.as_ref()),
        StringOp::EndsWith => value.ends_with(pattern.as_ref()),
        StringOp::Like => like(&value, &pattern),
    }
}

/// Case-insensitive comparisons run over the lowercased text.
pub(crate) fn fold(s: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(s.to_lowercase())
    }
}

/// Wildcard match: `*` matches any run of characters, `?` exactly one.
pub(crate) fn like(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut v, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while let Some(&c) = value.get(v) {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, v));
                p += 1;
            }
            Some(&want) if want == '?' || want == c => {
                v += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, from)) => {
                    backtrack = Some((star, from + 1));
                    p = star + 1;
                    v = from + 1;
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Full-text match over word tokens.
///
/// Every term must appear as a token; `-term` must not appear; `term*`
/// matches any token with that prefix. Matching ignores case.
pub(crate) fn full_text(value: &str, terms: &str) -> bool {
    let tokens: BTreeSet<String> = tokenize(value).collect();

    terms.split_whitespace().all(|term| {
        let (excluded, term) = term
            .strip_prefix('-')
            .map_or((false, term), |rest| (true, rest));
        let prefix = term.ends_with('*');
        let word = term.trim_end_matches('*').to_lowercase();
        if word.is_empty() {
            return true;
        }

        let hit = if prefix {
            tokens.iter().any(|token| token.starts_with(&word))
        } else {
            tokens.contains(&word)
        };

        hit != excluded
    })
}

fn tokenize(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

///
/// TESTS
///
