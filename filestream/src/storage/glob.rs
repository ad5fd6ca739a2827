use common::{Error, Result};
use regex::Regex;

/// Matches object keys against a set of glob patterns.
///
/// Supported syntax: `*` (within one path segment), `**` (any number of
/// segments), `?`, `[...]` / `[!...]` classes and `{a,b}` alternation.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    patterns: Vec<Regex>,
    prefix: Option<String>,
}

impl GlobMatcher {
    pub fn new(globs: &[String]) -> Result<Self> {
        if globs.is_empty() {
            return Err(Error::ConfigValidation(
                "At least one glob pattern is required".into(),
            ));
        }

        let patterns = globs
            .iter()
            .map(|glob| Regex::new(&glob_to_regex(normalize(glob))))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let prefix = common_prefix(globs.iter().map(|g| literal_prefix(normalize(g))));

        Ok(Self { patterns, prefix })
    }

    pub fn is_match(&self, key: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(key))
    }

    /// Directory shared by every pattern, usable as a listing prefix.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

fn normalize(glob: &str) -> &str {
    glob.trim().trim_start_matches('/')
}

fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::with_capacity(glob.len() * 2 + 2);
    regex.push('^');

    let mut chars = glob.chars().peekable();
    let mut in_group = false;

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        regex.push_str("(?:.*/)?");
                    } else {
                        regex.push_str(".*");
                    }
                } else {
                    regex.push_str("[^/]*");
                }
            }
            '?' => regex.push_str("[^/]"),
            '{' => {
                in_group = true;
                regex.push_str("(?:");
            }
            '}' if in_group => {
                in_group = false;
                regex.push(')');
            }
            ',' if in_group => regex.push('|'),
            '[' => {
                let class: Vec<char> = chars.by_ref().take_while(|&c| c != ']').collect();
                push_class(&mut regex, &class);
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }

    regex.push('$');
    regex
}

/// Writes a glob class as a regex class. A leading `!` negates; `x-y` is a
/// range and every other character is literal.
fn push_class(regex: &mut String, class: &[char]) {
    let members = match class.split_first() {
        Some(('!', rest)) => {
            regex.push_str("[^");
            rest
        }
        _ => {
            regex.push('[');
            class
        }
    };

    let mut i = 0;
    while i < members.len() {
        push_class_member(regex, members[i]);
        if i + 2 < members.len() && members[i + 1] == '-' {
            regex.push('-');
            push_class_member(regex, members[i + 2]);
            i += 3;
        } else {
            i += 1;
        }
    }
    regex.push(']');
}

// The regex crate reads `&&`, `--` and `~~` inside a class as set operations.
fn push_class_member(regex: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '&' | '-' | '~' | '^') {
        regex.push('\\');
    }
    regex.push(c);
}

/// Directory part of a glob before its first wildcard.
fn literal_prefix(glob: &str) -> &str {
    let literal_end = glob.find(['*', '?', '[', '{']).unwrap_or(glob.len());
    match glob[..literal_end].rfind('/') {
        Some(idx) => &glob[..idx],
        None => "",
    }
}

fn common_prefix<'a>(prefixes: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut common: Option<Vec<&str>> = None;

    for prefix in prefixes {
        let segments: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
        common = Some(match common {
            None => segments,
            Some(current) => current
                .iter()
                .zip(segments.iter())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect(),
        });
    }

    common.filter(|segments| !segments.is_empty()).map(|s| s.join("/"))
}
