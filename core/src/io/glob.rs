//! Path pattern helpers shared by the filesystems and the job configuration.
use regex::Regex;

use crate::error::Result;

const ESCAPE_CHAR: char = '\\';
const COMMA: char = ',';

/// True when the string contains a glob metacharacter.
pub fn has_glob(pattern: &str) -> bool {
    pattern.chars().any(|c| matches!(c, '*' | '?' | '[' | '{'))
}

/// Compiles one path component glob into an anchored regex. Supports `*`,
/// `?`, `[...]` (with `^` or `!` negation) and `{a,b}` alternation.
pub fn glob_to_regex(glob: &str) -> Result<Regex> {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');
    let mut chars = glob.chars().peekable();
    let mut brace_depth = 0usize;
    let mut in_class = false;
    while let Some(c) = chars.next() {
        if in_class {
            match c {
                ']' => {
                    in_class = false;
                    out.push(']');
                }
                '\\' => out.push_str("\\\\"),
                _ => out.push(c),
            }
            continue;
        }
        match c {
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => out.push_str("\\\\"),
            },
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                in_class = true;
                out.push('[');
                if let Some(&next) = chars.peek() {
                    if next == '!' || next == '^' {
                        chars.next();
                        out.push('^');
                    }
                }
            }
            '{' => {
                brace_depth += 1;
                out.push_str("(?:");
            }
            '}' if brace_depth > 0 => {
                brace_depth -= 1;
                out.push(')');
            }
            ',' if brace_depth > 0 => out.push('|'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Ok(Regex::new(&out)?)
}

/// Splits a comma separated list of paths. Commas inside `{...}` belong to the
/// glob and do not separate paths.
pub fn split_path_strings(comma_separated: &str) -> Vec<String> {
    let mut curly_open = 0i32;
    let mut path_start = 0;
    let mut glob_pattern = false;
    let mut paths = Vec::new();

    for (i, ch) in comma_separated.char_indices() {
        match ch {
            '{' => {
                curly_open += 1;
                glob_pattern = true;
            }
            '}' => {
                curly_open -= 1;
                if curly_open == 0 && glob_pattern {
                    glob_pattern = false;
                }
            }
            COMMA if !glob_pattern => {
                paths.push(comma_separated[path_start..i].to_string());
                path_start = i + 1;
            }
            _ => {}
        }
    }
    paths.push(comma_separated[path_start..].to_string());
    paths
}

/// Escapes commas (and the escape character itself) so a path can be stored
/// in a comma separated list.
pub fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == COMMA || c == ESCAPE_CHAR {
            out.push(ESCAPE_CHAR);
        }
        out.push(c);
    }
    out
}

pub fn unescape_path(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE_CHAR {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Splits on commas that are not escaped. The pieces keep their escapes.
pub fn split_escaped(list: &str) -> Vec<String> {
    if list.is_empty() {
        return Vec::new();
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut chars = list.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE_CHAR => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            COMMA => pieces.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    pieces.push(current);
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_to_regex() {
        let re = glob_to_regex("part-*.csv").unwrap();
        assert!(re.is_match("part-0001.csv"));
        assert!(!re.is_match("part-0001.csv.gz"));

        let re = glob_to_regex("day={mon,tue}").unwrap();
        assert!(re.is_match("day=mon"));
        assert!(re.is_match("day=tue"));
        assert!(!re.is_match("day=wed"));

        let re = glob_to_regex("f[!0-4]?").unwrap();
        assert!(re.is_match("f7x"));
        assert!(!re.is_match("f3x"));

        let re = glob_to_regex("a.b").unwrap();
        assert!(!re.is_match("axb"));
    }

    #[test]
    fn test_split_path_strings_respects_braces() {
        assert_eq!(
            split_path_strings("/a,/b/{c,d},/e"),
            vec!["/a", "/b/{c,d}", "/e"]
        );
        assert_eq!(split_path_strings("/only"), vec!["/only"]);
    }

    #[test]
    fn test_escaped_list() {
        let stored = [escape_path("/x,y"), escape_path("/z")].join(",");
        assert_eq!(stored, "/x\\,y,/z");
        let pieces: Vec<String> = split_escaped(&stored)
            .iter()
            .map(|p| unescape_path(p))
            .collect();
        assert_eq!(pieces, vec!["/x,y", "/z"]);
        assert!(split_escaped("").is_empty());
        assert!(has_glob("/in/*"));
        assert!(!has_glob("/in/file"));
    }
}
