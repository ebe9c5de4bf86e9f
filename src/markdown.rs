//! Markdown parsing utilities using pulldown-cmark
//!
//! Finds the link and image destinations of block text, and the asset files
//! they point at.

use pulldown_cmark::{Event, Parser, Tag};

use crate::constants as C;

/// Destinations of every inline link and image, in document order
pub fn extract_destinations(content: &str) -> Vec<String> {
    Parser::new(content)
        .filter_map(|event| match event {
            Event::Start(Tag::Link { dest_url, .. }) | Event::Start(Tag::Image { dest_url, .. }) => {
                Some(dest_url.into_string())
            }
            _ => None,
        })
        .filter(|dest| !dest.is_empty())
        .collect()
}

/// File name inside the assets folder that a destination points at
///
/// Accepts `../assets/NAME`, `assets/NAME` and `/assets/NAME`. Names that
/// would leave the assets folder are rejected.
pub fn asset_name(dest: &str) -> Option<&str> {
    let mut rest = dest.trim();
    while let Some(stripped) = rest.strip_prefix("../") {
        rest = stripped;
    }
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let name = rest.strip_prefix(C::ASSETS_FOLDER)?.strip_prefix('/')?;

    if name.is_empty() || name.split('/').any(|part| part.is_empty() || part == "..") {
        return None;
    }
    Some(name)
}

/// Names of every asset referenced by links or images in the content
pub fn extract_asset_names(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for dest in extract_destinations(content) {
        if let Some(name) = asset_name(&dest) {
            if !names.iter().any(|known| known == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_destinations() {
        let content = "See [my note](https://example.com) and ![a cat](../assets/cat.png). [empty]()";
        assert_eq!(
            extract_destinations(content),
            vec!["https://example.com", "../assets/cat.png"]
        );
    }

    #[test]
    fn test_asset_name() {
        assert_eq!(asset_name("../assets/cat.png"), Some("cat.png"));
        assert_eq!(asset_name("../../assets/cat.png"), Some("cat.png"));
        assert_eq!(asset_name("assets/cat.png"), Some("cat.png"));
        assert_eq!(asset_name("/assets/cat.png"), Some("cat.png"));
        assert_eq!(asset_name("https://example.com/assets/cat.png"), None);
        assert_eq!(asset_name("../assets/../secret.txt"), None);
        assert_eq!(asset_name("../assetsfoo/cat.png"), None);
    }

    #[test]
    fn test_extract_asset_names_dedup() {
        let content = "![one](../assets/a.png)\n\n[again](../assets/a.png) [pdf](../assets/doc.pdf)";
        assert_eq!(extract_asset_names(content), vec!["a.png", "doc.pdf"]);
    }

    #[test]
    fn test_extract_asset_names_ignores_code() {
        let content = "`![one](../assets/a.png)`\n\n    ![two](../assets/b.png)\n";
        assert!(extract_asset_names(content).is_empty());
    }
}
