//! Content rewriting
//!
//! Turns the raw text of a node into Hugo-ready markdown. The steps run in a
//! fixed order, each on the output of the previous one:
//!
//! 1. inline property lines (`key:: value`) are stripped
//! 2. relative asset links are made site-rooted
//! 3. page and block references, embeds and alias links are resolved against
//!    the graph, with every non-public target redacted
//! 4. media macros become Hugo shortcodes

use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::constants as C;
use crate::graph::Graph;
use crate::hierarchy::Hierarchy;
use crate::node::{Node, NodeId};
use crate::util;
use crate::visibility::Publicity;

static PROPERTY_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+::\s+\S").unwrap());

static ASSET_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(!?\[[^\]]*\])\((?:\.\./)*assets/([^)\s]+)\)").unwrap());

static SHORTCODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(youtube|vimeo|twitter)\s+([^{}\s]+)\s*\}\}").unwrap());

/// Page name inside `[[...]]`, allowing one level of nested `[[...]]`
const PAGE_NAME: &str = r"(?:[^\[\]]|\[\[[^\[\]]*\]\])+?";

static PAGE_EMBED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\{{\{{embed\s*\[\[\s*({})\s*\]\]\s*\}}\}}", PAGE_NAME)).unwrap()
});
static PAGE_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\[([^\[\]]*)\]\(\s*\[\[\s*({})\s*\]\]\s*\)", PAGE_NAME)).unwrap()
});
static PAGE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\[\[\s*({})\s*\]\]", PAGE_NAME)).unwrap());
static BLOCK_EMBED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{embed\s*\(\(\s*([0-9A-Za-z-]+)\s*\)\)\s*\}\}").unwrap());
static BLOCK_ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]\(\s*\(\(\s*([0-9A-Za-z-]+)\s*\)\)\s*\)").unwrap());
static BLOCK_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\(\s*([0-9A-Za-z-]+)\s*\)\)").unwrap());

/// Kinds of cross-reference, in matching priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefKind {
    PageEmbed,
    PageAlias,
    PageRef,
    BlockEmbed,
    BlockAlias,
    BlockRef,
}

const MATCHERS: [RefKind; 6] = [
    RefKind::PageEmbed,
    RefKind::PageAlias,
    RefKind::PageRef,
    RefKind::BlockEmbed,
    RefKind::BlockAlias,
    RefKind::BlockRef,
];

impl RefKind {
    fn regex(self) -> &'static Regex {
        match self {
            RefKind::PageEmbed => &*PAGE_EMBED,
            RefKind::PageAlias => &*PAGE_ALIAS,
            RefKind::PageRef => &*PAGE_REF,
            RefKind::BlockEmbed => &*BLOCK_EMBED,
            RefKind::BlockAlias => &*BLOCK_ALIAS,
            RefKind::BlockRef => &*BLOCK_REF,
        }
    }

    fn targets_page(self) -> bool {
        matches!(
            self,
            RefKind::PageEmbed | RefKind::PageAlias | RefKind::PageRef
        )
    }

    fn is_alias(self) -> bool {
        matches!(self, RefKind::PageAlias | RefKind::BlockAlias)
    }

    /// Capture group holding the page name or block key
    fn target_group(self) -> usize {
        if self.is_alias() {
            2
        } else {
            1
        }
    }
}

/// How resolved references are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Markdown links and Hugo embed shortcodes
    Link,
    /// Bare text, used for titles; `depth` bounds nested block labels
    Plain { depth: usize },
}

/// Rewrites node text against one immutable snapshot of the graph
pub struct Rewriter<'a> {
    graph: &'a Graph,
    publicity: &'a Publicity,
    hierarchy: &'a Hierarchy,
    /// Lowercased page name or alias → node
    pages: HashMap<String, NodeId>,
    /// External key → node
    blocks: HashMap<&'a str, NodeId>,
}

impl<'a> Rewriter<'a> {
    pub fn new(graph: &'a Graph, publicity: &'a Publicity, hierarchy: &'a Hierarchy) -> Self {
        let mut pages = HashMap::new();
        let mut blocks = HashMap::with_capacity(graph.len());

        // Names first so that an alias never shadows a real name
        for node in graph.nodes() {
            for name in [node.name.as_deref(), node.display_name.as_deref()]
                .into_iter()
                .flatten()
            {
                pages.entry(name.to_lowercase()).or_insert(node.id);
            }
            blocks.entry(node.external_key.as_str()).or_insert(node.id);
        }
        for node in graph.nodes() {
            for alias in node.alias_names() {
                pages.entry(alias.to_lowercase()).or_insert(node.id);
            }
        }

        Self {
            graph,
            publicity,
            hierarchy,
            pages,
            blocks,
        }
    }

    /// Look up a node by page name or alias, ignoring case
    pub fn find_page(&self, name: &str) -> Option<&'a Node> {
        let id = self.pages.get(&name.trim().to_lowercase())?;
        self.graph.get(*id)
    }

    /// Look up a node by its external key
    pub fn find_block(&self, key: &str) -> Option<&'a Node> {
        let id = self.blocks.get(key)?;
        self.graph.get(*id)
    }

    /// Apply every rewriting step to a node's text
    pub fn rewrite_node(&self, node: &Node) -> String {
        self.rewrite(node.text.as_deref().unwrap_or(""))
    }

    /// Apply every rewriting step to a piece of text
    pub fn rewrite(&self, text: &str) -> String {
        let text = strip_property_lines(text);
        let text = rewrite_asset_links(&text);
        let text = self.rewrite_references(&text, Mode::Link);
        rewrite_shortcodes(&text).into_owned()
    }

    /// Title of a node as it may appear in public output
    ///
    /// Pages use their display name. Blocks use the first line of their text
    /// with nested references reduced to plain labels, truncated to
    /// [`C::MAX_TITLE_LENGTH`]. Empty results become [`C::UNTITLED_TITLE`].
    pub fn display_text(&self, node: &Node) -> String {
        self.label(node, 0)
    }

    fn label(&self, node: &Node, depth: usize) -> String {
        if node.is_page() {
            return node.page_title().unwrap_or(C::UNTITLED_TITLE).to_string();
        }
        if depth >= C::MAX_LABEL_DEPTH {
            return C::TITLE_ELLIPSIS.to_string();
        }

        let text = strip_property_lines(node.text.as_deref().unwrap_or(""));
        let plain = self.rewrite_references(&text, Mode::Plain { depth });
        let first_line = plain.lines().next().unwrap_or("").trim();

        if first_line.is_empty() {
            C::UNTITLED_TITLE.to_string()
        } else {
            util::truncate_title(first_line, C::MAX_TITLE_LENGTH)
        }
    }

    /// Scan left to right; at each position the earliest match wins, ties go
    /// to the higher-priority matcher. A replaced span is never rescanned.
    fn rewrite_references(&self, text: &str, mode: Mode) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        let mut pending: Vec<Option<Captures<'_>>> = MATCHERS
            .iter()
            .map(|kind| kind.regex().captures_at(text, 0))
            .collect();

        loop {
            for (kind, slot) in MATCHERS.iter().zip(pending.iter_mut()) {
                if slot.as_ref().is_some_and(|caps| span(caps).start < pos) {
                    *slot = kind.regex().captures_at(text, pos);
                }
            }

            let next = pending
                .iter()
                .enumerate()
                .filter_map(|(index, caps)| caps.as_ref().map(|caps| (index, caps)))
                .min_by_key(|(index, caps)| (span(caps).start, *index));
            let Some((index, caps)) = next else {
                break;
            };

            let range = span(caps);
            out.push_str(&text[pos..range.start]);
            match self.render_reference(MATCHERS[index], caps, mode) {
                Some(rendered) => out.push_str(&rendered),
                None => out.push_str(&text[range.clone()]),
            }
            pos = range.end;
        }

        out.push_str(&text[pos..]);
        out
    }

    /// Render one matched reference, `None` to keep the original span
    fn render_reference(&self, kind: RefKind, caps: &Captures<'_>, mode: Mode) -> Option<String> {
        let target = caps.get(kind.target_group())?.as_str();
        let resolved = if kind.targets_page() {
            self.find_page(target)
        } else {
            self.find_block(target)
        };
        let Some(node) = resolved else {
            if target.contains("[[") {
                return Some(self.rewrite_nested_name(kind, caps, mode));
            }
            debug!(target, "unresolved reference left as is");
            return None;
        };

        let author_label = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let public = self.publicity.is_public(node.id);

        match mode {
            Mode::Link => {
                if !public {
                    return Some(redacted_link());
                }
                let path = self.hierarchy.export_path(node.id)?;
                Some(match kind {
                    RefKind::PageEmbed => {
                        format!("{{{{< links/page-embed \"/{}\" >}}}}", path)
                    }
                    RefKind::BlockEmbed => {
                        format!("{{{{< links/block-embed \"/{}\" >}}}}", path)
                    }
                    RefKind::PageAlias | RefKind::BlockAlias => {
                        format!("[{}](/{})", author_label, path)
                    }
                    RefKind::PageRef | RefKind::BlockRef => {
                        format!("[{}](/{})", escape_label(&self.label(node, 0)), path)
                    }
                })
            }
            Mode::Plain { depth } => {
                if !public {
                    return Some(C::REDACTED_LABEL.to_string());
                }
                if kind.is_alias() {
                    Some(author_label.to_string())
                } else {
                    Some(self.label(node, depth + 1))
                }
            }
        }
    }

    /// Keep an unresolved nested page name but rewrite the references inside it
    fn rewrite_nested_name(&self, kind: RefKind, caps: &Captures<'_>, mode: Mode) -> String {
        let whole = span(caps);
        let inner = caps
            .get(kind.target_group())
            .map(|m| m.range())
            .unwrap_or_default();
        let text = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let (start, end) = (inner.start - whole.start, inner.end - whole.start);
        format!(
            "{}{}{}",
            &text[..start],
            self.rewrite_references(&text[start..end], mode),
            &text[end..]
        )
    }
}

fn span(caps: &Captures<'_>) -> Range<usize> {
    caps.get(0).map(|m| m.range()).unwrap_or_default()
}

fn redacted_link() -> String {
    format!("[{}]({})", C::REDACTED_LABEL, C::REDACTED_PATH)
}

/// Escape square brackets so a label cannot close the link text early
fn escape_label(label: &str) -> Cow<'_, str> {
    if !label.contains(['[', ']']) {
        return Cow::Borrowed(label);
    }
    let mut escaped = String::with_capacity(label.len() + 2);
    for ch in label.chars() {
        if matches!(ch, '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    Cow::Owned(escaped)
}

/// Remove inline `key:: value` property lines
pub fn strip_property_lines(text: &str) -> String {
    text.split('\n')
        .filter(|line| !PROPERTY_LINE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Point relative `../assets/` links at the site-rooted assets folder
pub fn rewrite_asset_links(text: &str) -> Cow<'_, str> {
    ASSET_LINK.replace_all(text, |caps: &Captures<'_>| {
        format!("{}(/{}/{})", &caps[1], C::ASSETS_FOLDER, &caps[2])
    })
}

/// Replace `{{youtube}}`, `{{vimeo}}` and `{{twitter}}` macros with Hugo
/// shortcodes; macros whose URL yields no id are kept
pub fn rewrite_shortcodes(text: &str) -> Cow<'_, str> {
    SHORTCODE.replace_all(text, |caps: &Captures<'_>| {
        let url = &caps[2];
        let rendered = match &caps[1] {
            "twitter" => tweet_parts(url)
                .map(|(user, id)| format!("{{{{< tweet user=\"{}\" id=\"{}\" >}}}}", user, id)),
            name => video_id(url).map(|id| format!("{{{{< {} {} >}}}}", name, id)),
        };
        rendered.unwrap_or_else(|| caps[0].to_string())
    })
}

/// Media id of a video URL: the `v` query parameter, else the last path segment
fn video_id(url: &str) -> Option<&str> {
    if let Some((_, query)) = url.split_once('?') {
        let v = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("v="))
            .filter(|v| !v.is_empty());
        if v.is_some() {
            return v;
        }
    }
    url_path(url).rsplit('/').next().filter(|s| !s.is_empty())
}

/// `(user, id)` of a status URL such as `https://twitter.com/user/status/123`
fn tweet_parts(url: &str) -> Option<(&str, &str)> {
    let parts: Vec<&str> = url_path(url).split('/').collect();
    if parts.len() < 3 {
        return None;
    }
    Some((parts[parts.len() - 3], parts[parts.len() - 1]))
}

fn url_path(url: &str) -> &str {
    url.split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::VisibilityPolicy;

    const GRAPH: &str = r#"[
        {"db/id": 1, "block/uuid": "uuid-p1", "block/name": "p1", "block/original-name": "P1",
         "block/properties": {"public": true, "alias": "Pone"}},
        {"db/id": 2, "block/uuid": "uuid-b2", "block/parent": {"db/id": 1}, "block/page": {"db/id": 1},
         "block/content": "A thought\nsecond line"},
        {"db/id": 3, "block/uuid": "uuid-b3", "block/parent": {"db/id": 1}, "block/page": {"db/id": 1},
         "block/left": {"db/id": 2}, "block/content": "see ((uuid-b2))"},
        {"db/id": 4, "block/uuid": "uuid-p4", "block/name": "private diary", "block/original-name": "Private Diary"},
        {"db/id": 5, "block/uuid": "uuid-b5", "block/name": "b5-name", "block/parent": {"db/id": 4},
         "block/page": {"db/id": 4}, "block/content": "top secret line"},
        {"db/id": 6, "block/uuid": "uuid-b6", "block/parent": {"db/id": 1}, "block/page": {"db/id": 1},
         "block/left": {"db/id": 3}, "block/content": "about ((uuid-b5))"},
        {"db/id": 7, "block/uuid": "uuid-b7", "block/parent": {"db/id": 1}, "block/page": {"db/id": 1},
         "block/left": {"db/id": 6}, "block/content": "loop ((uuid-b7))"},
        {"db/id": 8, "block/uuid": "uuid-b8", "block/parent": {"db/id": 1}, "block/page": {"db/id": 1},
         "block/left": {"db/id": 7}, "block/content": "title:: hidden\n\n"},
        {"db/id": 9, "block/uuid": "uuid-p9", "block/name": "outer [[p1]]",
         "block/original-name": "Outer [[P1]]"},
        {"db/id": 10, "block/uuid": "uuid-b10", "block/parent": {"db/id": 1}, "block/page": {"db/id": 1},
         "block/left": {"db/id": 8}, "block/content": "x ] y [z"}
    ]"#;

    struct Fixture {
        graph: Graph,
        publicity: Publicity,
        hierarchy: Hierarchy,
    }

    impl Fixture {
        fn new() -> Self {
            let graph = Graph::from_json_str(GRAPH).unwrap();
            let publicity = Publicity::propagate(&graph, VisibilityPolicy::ExplicitOnly);
            let hierarchy = Hierarchy::resolve(&graph, &publicity);
            Self {
                graph,
                publicity,
                hierarchy,
            }
        }

        fn rewriter(&self) -> Rewriter<'_> {
            Rewriter::new(&self.graph, &self.publicity, &self.hierarchy)
        }
    }

    #[test]
    fn test_page_reference_to_public_page() {
        let f = Fixture::new();
        let r = f.rewriter();
        assert_eq!(r.rewrite("see [[P1]]"), "see [P1](/graph/p1)");
        // Case-insensitive, and through the alias property
        assert_eq!(r.rewrite("[[p1]] and [[pone]]"), "[P1](/graph/p1) and [P1](/graph/p1)");
    }

    #[test]
    fn test_dangling_block_reference_is_unchanged() {
        let f = Fixture::new();
        let text = "look ((B2-missing-uuid)) and [[Nowhere]]";
        assert_eq!(f.rewriter().rewrite(text), text);
    }

    #[test]
    fn test_private_target_is_redacted() {
        let f = Fixture::new();
        let r = f.rewriter();
        let out = r.rewrite("see [[b5-name]] and ((uuid-b5)) and [[Private Diary]]");
        assert_eq!(out, "see [redacted](-) and [redacted](-) and [redacted](-)");
        assert!(!out.contains("top secret"));
        assert!(!out.contains("uuid-p4"));
    }

    #[test]
    fn test_plain_prose_is_unchanged() {
        let f = Fixture::new();
        let text = "Just some prose.\nWith [a link](https://example.com) and (parens).\n";
        assert_eq!(f.rewriter().rewrite(text), text);
    }

    #[test]
    fn test_strip_property_lines() {
        assert_eq!(strip_property_lines("title:: My Page\nHello world"), "Hello world");
        assert_eq!(
            strip_property_lines("Hello\nid:: 1234\nworld"),
            "Hello\nworld"
        );
        // Not a property: no space after the separator
        assert_eq!(strip_property_lines("a::b"), "a::b");
    }

    #[test]
    fn test_block_reference_uses_first_line() {
        let f = Fixture::new();
        assert_eq!(
            f.rewriter().rewrite("((uuid-b2))"),
            "[A thought](/graph/p1/uuid-b2)"
        );
    }

    #[test]
    fn test_nested_labels_resolve_or_redact() {
        let f = Fixture::new();
        let r = f.rewriter();
        assert_eq!(r.rewrite("((uuid-b3))"), "[see A thought](/graph/p1/uuid-b3)");
        assert_eq!(r.rewrite("((uuid-b6))"), "[about redacted](/graph/p1/uuid-b6)");
    }

    #[test]
    fn test_self_reference_label_terminates() {
        let f = Fixture::new();
        assert_eq!(
            f.rewriter().rewrite("((uuid-b7))"),
            "[loop loop ...](/graph/p1/uuid-b7)"
        );
    }

    #[test]
    fn test_display_text() {
        let f = Fixture::new();
        let r = f.rewriter();
        assert_eq!(r.display_text(f.graph.get(1).unwrap()), "P1");
        assert_eq!(r.display_text(f.graph.get(2).unwrap()), "A thought");
        assert_eq!(r.display_text(f.graph.get(8).unwrap()), "Untitled");
    }

    #[test]
    fn test_link_label_brackets_are_escaped() {
        let f = Fixture::new();
        let r = f.rewriter();
        assert_eq!(
            r.rewrite("((uuid-b10))"),
            r"[x \] y \[z](/graph/p1/uuid-b10)"
        );
        // Titles stay unescaped
        assert_eq!(r.display_text(f.graph.get(10).unwrap()), "x ] y [z");
    }

    #[test]
    fn test_nested_page_names() {
        let f = Fixture::new();
        let r = f.rewriter();
        // The whole nested name is one reference, so a private outer page is redacted
        let out = r.rewrite("see [[Outer [[P1]]]] and [x]([[outer [[p1]]]])");
        assert_eq!(out, "see [redacted](-) and [redacted](-)");
        assert!(!out.contains("Outer"));

        // An unknown outer name is kept, with the inner reference still resolved
        assert_eq!(
            r.rewrite("[[Ghost [[P1]]]]"),
            "[[Ghost [P1](/graph/p1)]]"
        );
        assert_eq!(r.rewrite("[[Ghost [[Private Diary]]]]"), "[[Ghost [redacted](-)]]");
    }

    #[test]
    fn test_embeds() {
        let f = Fixture::new();
        let r = f.rewriter();
        assert_eq!(
            r.rewrite("{{embed [[P1]]}}"),
            r#"{{< links/page-embed "/graph/p1" >}}"#
        );
        assert_eq!(
            r.rewrite("{{embed ((uuid-b2))}}"),
            r#"{{< links/block-embed "/graph/p1/uuid-b2" >}}"#
        );
        assert_eq!(r.rewrite("{{embed ((uuid-b5))}}"), "[redacted](-)");
    }

    #[test]
    fn test_alias_links() {
        let f = Fixture::new();
        let r = f.rewriter();
        assert_eq!(r.rewrite("[my label]([[P1]])"), "[my label](/graph/p1)");
        assert_eq!(
            r.rewrite("[other]( ((uuid-b2)) )"),
            "[other](/graph/p1/uuid-b2)"
        );
        // The author label of a private target is dropped too
        assert_eq!(r.rewrite("[secret label]([[Private Diary]])"), "[redacted](-)");
    }

    #[test]
    fn test_higher_priority_match_is_not_rematched() {
        let f = Fixture::new();
        let r = f.rewriter();
        assert_eq!(
            r.rewrite("{{embed [[P1]]}} then [[P1]] then [x]([[P1]])"),
            r#"{{< links/page-embed "/graph/p1" >}} then [P1](/graph/p1) then [x](/graph/p1)"#
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let f = Fixture::new();
        let r = f.rewriter();
        let once = r.rewrite("a [[P1]] b ((uuid-b5)) ![img](../assets/pic.png) {{youtube https://youtu.be/abc}}");
        assert_eq!(r.rewrite(&once), once);
    }

    #[test]
    fn test_asset_links() {
        assert_eq!(
            rewrite_asset_links("![alt text](../assets/image_1.png)"),
            "![alt text](/assets/image_1.png)"
        );
        assert_eq!(
            rewrite_asset_links("[doc](../../assets/file.pdf)"),
            "[doc](/assets/file.pdf)"
        );
        assert_eq!(
            rewrite_asset_links("![x](https://example.com/assets/a.png)"),
            "![x](https://example.com/assets/a.png)"
        );
    }

    #[test]
    fn test_shortcodes() {
        assert_eq!(
            rewrite_shortcodes("{{youtube https://www.youtube.com/watch?v=dQw4w9WgXcQ}}"),
            "{{< youtube dQw4w9WgXcQ >}}"
        );
        assert_eq!(
            rewrite_shortcodes("{{youtube https://youtu.be/dQw4w9WgXcQ}}"),
            "{{< youtube dQw4w9WgXcQ >}}"
        );
        assert_eq!(
            rewrite_shortcodes("{{vimeo https://vimeo.com/76979871}}"),
            "{{< vimeo 76979871 >}}"
        );
        assert_eq!(
            rewrite_shortcodes("{{twitter https://twitter.com/SanDiegoZoo/status/1453110110599868418}}"),
            r#"{{< tweet user="SanDiegoZoo" id="1453110110599868418" >}}"#
        );
        assert_eq!(rewrite_shortcodes("{{twitter 12345}}"), "{{twitter 12345}}");
    }
}
