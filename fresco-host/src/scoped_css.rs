//! Style scoping engine.
//!
//! Rewrites a stylesheet rule tree so every selector is confined to one
//! application's mount point. The scoping prefix is an attribute selector
//! on the application tag, e.g. `fresco-app[name=shop]`; canonical root
//! selectors (`html`, `body`, `:root` and their descendant forms) map onto
//! the mount point itself rather than being prefixed.
//!
//! Re-scoping already-scoped text is a precondition violation: callers
//! scope each style element exactly once, either synchronously or through
//! the one-shot deferred path in [`ensure_scoped`].

use crate::element::APP_TAG;
use fresco_platform::{CssRule, Document, NodeId, StyleTemplate};
use regex::{Captures, Regex};
use std::sync::{Arc, LazyLock, Mutex};

/// Selector that is nothing but a page root: `html body`, `html`, `body`
/// or `:root`, possibly joined by combinators.
static ROOT_SELECTOR_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((html[\s>~,]+body)|(html|body|:root))$").expect("valid root selector pattern")
});

/// A root token embedded in a longer selector, as a whole token only:
/// `body > .app` matches, `body.foo` and `body#id` do not. The trailing
/// combinator is captured and re-inserted on replacement.
static EMBEDDED_ROOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|\s+)((html[\s>~]+body)|(html|body|:root))([\s>~]+|$)")
        .expect("valid embedded root pattern")
});

/// The scoping prefix for one application.
pub fn prefix_for(app_name: &str) -> String {
    format!("{APP_TAG}[name={app_name}]")
}

/// Rewrites a rule tree into flat CSS text confined to `prefix`.
pub fn scope_rules(rules: &[CssRule], prefix: &str) -> String {
    let mut out = String::new();
    for rule in rules {
        match rule {
            CssRule::Style { selector, body } => {
                out.push_str(&scope_style_rule(selector, body, prefix));
            }
            CssRule::Media { condition, rules } => {
                out.push_str(&format!(
                    "@media {condition} {{{}}}",
                    scope_rules(rules, prefix)
                ));
            }
            CssRule::Supports { condition, rules } => {
                out.push_str(&format!(
                    "@supports {condition} {{{}}}",
                    scope_rules(rules, prefix)
                ));
            }
            CssRule::Other { raw } => out.push_str(raw),
        }
    }
    out
}

/// Materializes raw stylesheet text through the scratch template and
/// scopes it.
pub fn scope_stylesheet(template: &mut StyleTemplate, text: &str, prefix: &str) -> String {
    scope_rules(&template.materialize(text), prefix)
}

/// Scopes one style element for `app_name`, covering both input timings:
/// text already present is scoped synchronously through the template;
/// an empty element gets a one-shot content observer that scopes on the
/// first text change and never fires again.
pub fn ensure_scoped(
    doc: &mut Document,
    style: NodeId,
    app_name: &str,
    template: Arc<Mutex<StyleTemplate>>,
) {
    let prefix = prefix_for(app_name);
    let text = doc.text_content(style);

    if !text.trim().is_empty() {
        let scoped = {
            let mut template = template.lock().unwrap();
            scope_stylesheet(&mut template, &text, &prefix)
        };
        doc.set_text(style, scoped);
    } else {
        doc.observe_text_once(style, move |doc, id| {
            let text = doc.text_content(id);
            let scoped = {
                let mut template = template.lock().unwrap();
                scope_stylesheet(&mut template, &text, &prefix)
            };
            doc.set_text(id, scoped);
        });
    }
}

fn scope_style_rule(selector: &str, body: &str, prefix: &str) -> String {
    let selector = selector.trim();

    // A pure page-root selector maps onto the mount point itself.
    if ROOT_SELECTOR_ONLY.is_match(selector) {
        return format!("{prefix} {{{body}}}");
    }
    if selector == "*" {
        return format!("{prefix} * {{{body}}}");
    }

    let rewritten: Vec<String> = split_selector_list(selector)
        .into_iter()
        .map(|part| {
            let part = part.trim();
            if EMBEDDED_ROOT.is_match(part) {
                EMBEDDED_ROOT
                    .replace(part, |caps: &Captures| {
                        format!("{}{}{}", &caps[1], prefix, &caps[5])
                    })
                    .into_owned()
            } else {
                format!("{prefix} {part}")
            }
        })
        .collect();

    format!("{} {{{body}}}", rewritten.join(", "))
}

/// Splits a selector list on top-level commas, leaving commas inside
/// parentheses, brackets and quoted strings alone.
fn split_selector_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(&list[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&list[start..]);
    parts
}
