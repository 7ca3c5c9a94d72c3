//! `@file` argument expansion.
//!
//! A token `@path` is replaced by the arguments read from `path`. Inside the
//! file, arguments are separated by whitespace, may be quoted with single or
//! double quotes, and a `#` at the start of an argument comments out the
//! rest of the line. Expansion is recursive; a file that includes itself
//! (directly or not) is left as a literal token. `@@x` stands for the
//! literal `@x`, and a token naming a file that does not exist is kept as-is.
//! Tokens after the end-of-options delimiter are never expanded.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use argbind_core::ParseError;
use tracing::{debug, warn};

/// Expands every `@file` token in `args`.
///
/// # Errors
///
/// Returns [`ParseError::ArgumentFile`] when an existing file cannot be read.
pub fn expand(args: Vec<String>, delimiter: &str) -> Result<Vec<String>, ParseError> {
    let mut out = Vec::with_capacity(args.len());
    let mut active = HashSet::new();
    let mut literal = false;
    for arg in args {
        if literal {
            out.push(arg);
            continue;
        }
        if arg == delimiter {
            literal = true;
            out.push(arg);
            continue;
        }
        expand_token(arg, &mut out, &mut active)?;
    }
    Ok(out)
}

fn expand_token(
    token: String,
    out: &mut Vec<String>,
    active: &mut HashSet<PathBuf>,
) -> Result<(), ParseError> {
    if let Some(escaped) = token.strip_prefix("@@") {
        out.push(format!("@{escaped}"));
        return Ok(());
    }
    let Some(path) = token.strip_prefix('@').filter(|p| !p.is_empty()) else {
        out.push(token);
        return Ok(());
    };

    let path = Path::new(path);
    if !path.is_file() {
        debug!(path = %path.display(), "Argument file not found, keeping token");
        out.push(token);
        return Ok(());
    }
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if active.contains(&key) {
        warn!(path = %path.display(), "Recursive argument file, keeping token");
        out.push(token);
        return Ok(());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ParseError::ArgumentFile {
        path: path.to_path_buf(),
        source,
    })?;
    let words = split_words(&contents);
    debug!(path = %path.display(), count = words.len(), "Expanded argument file");

    active.insert(key.clone());
    for word in words {
        expand_token(word, out, active)?;
    }
    active.remove(&key);
    Ok(())
}

/// Splits argument-file contents into words.
pub(crate) fn split_words(contents: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut chars = contents.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };
        if first == '#' {
            while chars.next_if(|c| *c != '\n').is_some() {}
            continue;
        }

        let mut word = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
            match c {
                '"' | '\'' => {
                    for inner in chars.by_ref() {
                        if inner == c {
                            break;
                        }
                        word.push(inner);
                    }
                }
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        word.push(escaped);
                    }
                }
                _ => word.push(c),
            }
        }
        words.push(word);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words_handles_quotes_and_comments() {
        let text = "-v  # verbose\n--name \"John Smith\" 'a b'c\n# whole line\nlast\\ word";
        assert_eq!(
            split_words(text),
            vec!["-v", "--name", "John Smith", "a bc", "last word"]
        );
    }

    #[test]
    fn test_expand_reads_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("args");
        std::fs::write(&file, "-a\n-b 2\n").unwrap();

        let args = vec![
            "first".to_string(),
            format!("@{}", file.display()),
            "last".to_string(),
        ];
        assert_eq!(
            expand(args, "--").unwrap(),
            vec!["first", "-a", "-b", "2", "last"]
        );
    }

    #[test]
    fn test_expand_is_recursive_and_stops_on_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let outer = dir.path().join("outer");
        let inner = dir.path().join("inner");
        std::fs::write(&outer, format!("-x @{}", inner.display())).unwrap();
        std::fs::write(&inner, format!("-y @{}", outer.display())).unwrap();

        let expanded = expand(vec![format!("@{}", outer.display())], "--").unwrap();
        assert_eq!(expanded[..2], ["-x", "-y"]);
        assert_eq!(expanded[2], format!("@{}", outer.display()));
    }

    #[test]
    fn test_escapes_missing_files_and_delimiter() {
        let args = vec![
            "@@literal".to_string(),
            "@/definitely/not/here".to_string(),
            "--".to_string(),
            "@@after".to_string(),
        ];
        assert_eq!(
            expand(args, "--").unwrap(),
            vec!["@literal", "@/definitely/not/here", "--", "@@after"]
        );
    }
}
