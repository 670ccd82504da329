//! Resource extraction from fetched markup.
//!
//! Strips link and script elements out of the detached source tree and
//! catalogs them on the application record, in document order. The walk is
//! two-pass — collect first, then remove — so removal never disturbs
//! traversal.

use crate::app::App;
use crate::element::{APP_BODY_TAG, APP_HEAD_TAG};
use fresco_platform::{Document, NodeId};
use fresco_types::{LinkEntry, ScriptEntry, inline_script_key};
use tracing::debug;

/// Renames the application's head and body regions to the private root
/// tags so they cannot collide with the host page's own. At most one of
/// each survives; any later duplicates are dropped.
pub(crate) fn rewrite_root_regions(doc: &mut Document, root: NodeId) {
    rename_first_drop_rest(doc, root, "head", APP_HEAD_TAG);
    rename_first_drop_rest(doc, root, "body", APP_BODY_TAG);
}

fn rename_first_drop_rest(doc: &mut Document, root: NodeId, tag: &str, private_tag: &str) {
    let mut found = Vec::new();
    collect_by_tag(doc, root, tag, &mut found);
    let mut found = found.into_iter();
    if let Some(first) = found.next() {
        doc.rename(first, private_tag);
    }
    for extra in found {
        doc.drop_subtree(extra);
    }
}

fn collect_by_tag(doc: &Document, node: NodeId, tag: &str, out: &mut Vec<NodeId>) {
    for child in doc.children(node) {
        if doc.tag(child) == Some(tag) {
            out.push(child);
        }
        collect_by_tag(doc, child, tag, out);
    }
}

enum Found {
    /// Any link element; only `rel=stylesheet` with an href is cataloged,
    /// but all of them leave the tree.
    Link { href: Option<String>, node: NodeId },
    ExternalScript { src: String, node: NodeId },
    InlineScript { code: String, node: NodeId },
    EmptyScript(NodeId),
    Style(NodeId),
}

/// Catalogs link/script resources on the record and removes their elements
/// from the tree. Style elements are left in place and returned so the
/// caller can scope them. Markup with no element structure simply yields
/// empty catalogs.
pub(crate) fn extract_sources(doc: &mut Document, root: NodeId, app: &mut App) -> Vec<NodeId> {
    let mut found = Vec::new();
    collect_resources(doc, root, &mut found);

    let mut styles = Vec::new();
    for item in found {
        match item {
            Found::Link { href, node } => {
                if let Some(href) = href {
                    app.source.links.insert(href, LinkEntry::default());
                }
                doc.drop_subtree(node);
            }
            Found::ExternalScript { src, node } => {
                app.source.scripts.insert(src, ScriptEntry::external());
                doc.drop_subtree(node);
            }
            Found::InlineScript { code, node } => {
                app.source
                    .scripts
                    .insert(inline_script_key(), ScriptEntry::inline(code));
                doc.drop_subtree(node);
            }
            Found::EmptyScript(node) => doc.drop_subtree(node),
            Found::Style(node) => styles.push(node),
        }
    }

    debug!(
        app = %app.name,
        links = app.source.links.len(),
        scripts = app.source.scripts.len(),
        styles = styles.len(),
        "Extracted sub-application resources"
    );
    styles
}

/// Pre-order walk, so catalogs fill in document order — the order script
/// execution must follow.
fn collect_resources(doc: &Document, node: NodeId, out: &mut Vec<Found>) {
    for child in doc.children(node) {
        match doc.tag(child) {
            Some("link") => {
                let href = match (doc.attr(child, "rel"), doc.attr(child, "href")) {
                    (Some("stylesheet"), Some(href)) if !href.is_empty() => {
                        Some(href.to_string())
                    }
                    _ => None,
                };
                out.push(Found::Link { href, node: child });
            }
            Some("script") => {
                if let Some(src) = doc.attr(child, "src").filter(|s| !s.is_empty()) {
                    out.push(Found::ExternalScript {
                        src: src.to_string(),
                        node: child,
                    });
                } else {
                    let code = doc.text_content(child);
                    if code.trim().is_empty() {
                        out.push(Found::EmptyScript(child));
                    } else {
                        out.push(Found::InlineScript { code, node: child });
                    }
                }
            }
            Some("style") => out.push(Found::Style(child)),
            _ => collect_resources(doc, child, out),
        }
    }
}

/// The application's private head region, created on demand when the
/// fetched markup had none — resolved stylesheet links attach here.
pub(crate) fn head_region(doc: &mut Document, root: NodeId) -> NodeId {
    if let Some(head) = doc.find_first(root, APP_HEAD_TAG) {
        return head;
    }
    let head = doc.create_element(APP_HEAD_TAG);
    doc.prepend_child(root, head);
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::Sandbox;
    use fresco_platform::{HostGlobal, MemoryGlobal};
    use fresco_types::AppConfig;
    use std::sync::Arc;

    fn test_app() -> App {
        let host = Arc::new(MemoryGlobal::new()) as Arc<dyn HostGlobal>;
        let mut doc = Document::new();
        let container = doc.create_element("div");
        App::new(
            AppConfig::new("shop", "https://apps.example/shop/"),
            Sandbox::new("shop", host),
            container,
        )
    }

    const PAGE: &str = concat!(
        "<html><head>",
        r#"<link rel="stylesheet" href="/main.css">"#,
        r#"<link rel="icon" href="/favicon.ico">"#,
        "<style>.a { color: red }</style>",
        "<script>window.x = 1</script>",
        "</head><body>",
        r#"<div id="root"></div>"#,
        r#"<script src="/main.js"></script>"#,
        "</body></html>",
    );

    #[test]
    fn root_regions_are_renamed_to_private_tags() {
        let mut doc = Document::new();
        let root = doc.parse_fragment(PAGE);
        rewrite_root_regions(&mut doc, root);

        assert!(doc.find_first(root, "head").is_none());
        assert!(doc.find_first(root, "body").is_none());
        assert!(doc.find_first(root, APP_HEAD_TAG).is_some());
        assert!(doc.find_first(root, APP_BODY_TAG).is_some());
    }

    #[test]
    fn duplicate_root_regions_do_not_survive() {
        let mut doc = Document::new();
        let root = doc.parse_fragment("<body>a</body><body>b</body>");
        rewrite_root_regions(&mut doc, root);

        let mut bodies = Vec::new();
        collect_by_tag(&doc, root, APP_BODY_TAG, &mut bodies);
        assert_eq!(bodies.len(), 1);
        assert_eq!(doc.text_content(bodies[0]), "a");
    }

    #[test]
    fn links_and_scripts_are_cataloged_and_removed() {
        let mut doc = Document::new();
        let mut app = test_app();
        let root = doc.parse_fragment(PAGE);
        rewrite_root_regions(&mut doc, root);

        let styles = extract_sources(&mut doc, root, &mut app);

        assert_eq!(app.source.links.len(), 1);
        assert!(app.source.links.contains_key("/main.css"));

        assert_eq!(app.source.scripts.len(), 2);
        let entries: Vec<_> = app.source.scripts.values().collect();
        assert!(!entries[0].is_external); // inline first, document order
        assert_eq!(entries[0].code, "window.x = 1");
        assert!(entries[1].is_external);
        assert!(app.source.scripts.contains_key("/main.js"));

        // All link/script elements left the tree; the style stayed.
        assert!(doc.find_first(root, "link").is_none());
        assert!(doc.find_first(root, "script").is_none());
        assert_eq!(styles.len(), 1);
        assert_eq!(doc.tag(styles[0]), Some("style"));
    }

    #[test]
    fn non_stylesheet_links_are_removed_but_not_cataloged() {
        let mut doc = Document::new();
        let mut app = test_app();
        let root = doc.parse_fragment(r#"<link rel="icon" href="/favicon.ico">"#);
        extract_sources(&mut doc, root, &mut app);

        assert!(app.source.links.is_empty());
        assert!(doc.find_first(root, "link").is_none());
    }

    #[test]
    fn empty_scripts_are_dropped_silently() {
        let mut doc = Document::new();
        let mut app = test_app();
        let root = doc.parse_fragment("<script></script>");
        extract_sources(&mut doc, root, &mut app);

        assert!(app.source.scripts.is_empty());
        assert!(doc.find_first(root, "script").is_none());
    }

    #[test]
    fn markup_without_structure_yields_empty_catalogs() {
        let mut doc = Document::new();
        let mut app = test_app();
        let root = doc.parse_fragment("not really markup");
        let styles = extract_sources(&mut doc, root, &mut app);

        assert!(app.source.links.is_empty());
        assert!(app.source.scripts.is_empty());
        assert!(styles.is_empty());
    }

    #[test]
    fn head_region_is_created_on_demand() {
        let mut doc = Document::new();
        let root = doc.parse_fragment("<div>no head here</div>");
        let head = head_region(&mut doc, root);

        assert_eq!(doc.tag(head), Some(APP_HEAD_TAG));
        assert_eq!(doc.children(root)[0], head);
        // Second call finds the same region.
        assert_eq!(head_region(&mut doc, root), head);
    }
}
