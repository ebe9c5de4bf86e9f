//! Utility functions for secure path handling and text helpers

use std::io;
use std::path::{Path, PathBuf};

use crate::constants as C;

/// Join a relative export path under the destination directory
/// Returns an error if the path attempts to escape the base directory
pub fn secure_path(base: &Path, relative: &str) -> io::Result<PathBuf> {
    let mut result = base.to_path_buf();

    for component in relative.split(|c| c == '/' || c == '\\') {
        match component {
            "" | "." => continue,
            ".." => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "Path traversal detected: cannot escape destination directory",
                ));
            }
            _ => {
                // Windows drive prefixes such as `C:`
                if component.len() >= 2 && component.as_bytes()[1] == b':' {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "Absolute paths are not allowed",
                    ));
                }
                result.push(component);
            }
        }
    }

    // Resolved symlinks must still land inside the base
    if base.exists() && result.exists() {
        let canonical_base = dunce::canonicalize(base).unwrap_or_else(|_| base.to_path_buf());
        let canonical_result = dunce::canonicalize(&result).unwrap_or_else(|_| result.clone());
        if !canonical_result.starts_with(&canonical_base) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Path traversal detected: resolved path escapes destination directory",
            ));
        }
    }

    Ok(result)
}

/// Convert title to URL-safe slug
pub fn slugify(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    let mut prev_is_dash = false;

    for c in title.to_lowercase().chars() {
        if c.is_alphanumeric() {
            result.push(c);
            prev_is_dash = false;
        } else if !prev_is_dash && !result.is_empty() {
            result.push('-');
            prev_is_dash = true;
        }
    }

    result.trim_matches('-').to_string()
}

/// Shorten a single-line title to at most `max_chars` characters
///
/// Long titles are cut to leave room for the ellipsis, then the trailing
/// partial word is dropped. A title without spaces is cut hard.
pub fn truncate_title(line: &str, max_chars: usize) -> String {
    if line.chars().count() <= max_chars {
        return line.to_string();
    }

    let keep = max_chars.saturating_sub(C::TITLE_ELLIPSIS.chars().count());
    let cut: String = line.chars().take(keep).collect();
    let words = match cut.rfind(' ') {
        Some(index) if index > 0 => &cut[..index],
        _ => cut.as_str(),
    };

    format!("{}{}", words.trim_end(), C::TITLE_ELLIPSIS)
}

/// Display a path with forward slashes (cross-platform standard)
/// Converts Windows backslashes to forward slashes for consistent output
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_path_normal() {
        let base = PathBuf::from("/srv/site/content");
        let result = secure_path(&base, "graph/my-page/uuid-1").unwrap();
        assert_eq!(result, PathBuf::from("/srv/site/content/graph/my-page/uuid-1"));
    }

    #[test]
    fn test_secure_path_traversal_blocked() {
        let base = PathBuf::from("/srv/site/content");
        assert!(secure_path(&base, "graph/../../../etc/passwd").is_err());
    }

    #[test]
    fn test_secure_path_leading_slash_stays_inside() {
        let base = PathBuf::from("/srv/site/content");
        let result = secure_path(&base, "/graph/p1").unwrap();
        assert_eq!(result, PathBuf::from("/srv/site/content/graph/p1"));
    }

    #[test]
    fn test_secure_path_drive_prefix_blocked() {
        let base = PathBuf::from("/srv/site/content");
        assert!(secure_path(&base, "C:/Windows/System32").is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Test@Note#123"), "test-note-123");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn test_truncate_title_short() {
        assert_eq!(truncate_title("short title", 100), "short title");
    }

    #[test]
    fn test_truncate_title_drops_partial_word() {
        let line = "word ".repeat(30);
        let title = truncate_title(line.trim(), 100);
        assert!(title.ends_with("word..."));
        assert!(title.chars().count() <= 100);
        assert_eq!(title, format!("{}...", ["word"; 19].join(" ")));
    }

    #[test]
    fn test_truncate_title_without_spaces() {
        let line = "x".repeat(150);
        let title = truncate_title(&line, 100);
        assert_eq!(title, format!("{}...", "x".repeat(97)));
    }

    #[test]
    fn test_display_path() {
        assert_eq!(display_path(Path::new("graph\\p1")), "graph/p1");
    }
}
