//! The style rule tree.
//!
//! Raw stylesheet text is materialized into a flat list of [`CssRule`]
//! objects. Only the three kinds the scoping engine rewrites are
//! discriminated — plain style rules and the two conditional groups; every
//! other construct is carried through as raw text.

/// One parsed stylesheet rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssRule {
    /// `selector { declarations }`
    Style { selector: String, body: String },
    /// `@media condition { rules }`
    Media {
        condition: String,
        rules: Vec<CssRule>,
    },
    /// `@supports condition { rules }`
    Supports {
        condition: String,
        rules: Vec<CssRule>,
    },
    /// Any other rule, passed through verbatim.
    Other { raw: String },
}

/// Parses stylesheet text into a rule list. Parsing is tolerant: an
/// unterminated block yields the content seen so far, and stray text
/// between rules is dropped.
pub fn parse_rules(text: &str) -> Vec<CssRule> {
    let stripped = strip_comments(text);
    parse_block(&stripped)
}

fn parse_block(text: &str) -> Vec<CssRule> {
    let mut rules = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('@') {
            let (rule, remainder) = parse_at_rule(after);
            rules.push(rule);
            rest = remainder.trim_start();
        } else {
            match rest.find('{') {
                Some(open) => {
                    let selector = rest[..open].trim().to_string();
                    let (body, remainder) = read_balanced(&rest[open + 1..]);
                    if !selector.is_empty() {
                        rules.push(CssRule::Style {
                            selector,
                            body: body.trim().to_string(),
                        });
                    }
                    rest = remainder.trim_start();
                }
                None => break,
            }
        }
    }
    rules
}

/// Parses one at-rule whose `@` has already been consumed.
fn parse_at_rule(rest: &str) -> (CssRule, &str) {
    let name_end = rest
        .find(|c: char| c.is_whitespace() || c == '{' || c == ';')
        .unwrap_or(rest.len());
    let name = &rest[..name_end];

    // Statement at-rules (@import, @charset, ...) end at the semicolon.
    let block_start = match rest.find('{') {
        Some(open) if rest[..open].find(';').is_none() => open,
        _ => {
            let end = rest.find(';').map(|i| i + 1).unwrap_or(rest.len());
            let raw = format!("@{}", &rest[..end]);
            return (CssRule::Other { raw }, &rest[end..]);
        }
    };

    let condition = rest[name_end..block_start].trim().to_string();
    let (inner, remainder) = read_balanced(&rest[block_start + 1..]);

    let rule = match name {
        "media" => CssRule::Media {
            condition,
            rules: parse_block(&inner),
        },
        "supports" => CssRule::Supports {
            condition,
            rules: parse_block(&inner),
        },
        _ => CssRule::Other {
            raw: format!("@{name} {condition} {{{inner}}}"),
        },
    };
    (rule, remainder)
}

/// Reads up to the brace closing an already-open block, honoring nesting
/// and quoted strings. Returns the block content and the remaining input.
fn read_balanced(text: &str) -> (String, &str) {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return (text[..i].to_string(), &text[i + 1..]);
                    }
                }
                _ => {}
            },
        }
    }
    (text.to_string(), "")
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = match rest[start + 2..].find("*/") {
            Some(end) => &rest[start + 2 + end + 2..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

/// Reusable scratch materializer for stylesheet text that is not attached
/// to any surface yet. Mirrors a permanently disabled template style node:
/// text is staged into the scratch buffer, materialized into a rule tree,
/// and the buffer is cleared again so the next caller finds it empty.
/// Callers use it serially; one materialization completes before the next
/// begins.
#[derive(Debug, Default)]
pub struct StyleTemplate {
    scratch: String,
}

impl StyleTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materializes raw text into a rule tree through the scratch buffer.
    pub fn materialize(&mut self, text: &str) -> Vec<CssRule> {
        self.scratch.push_str(text);
        let rules = parse_rules(&self.scratch);
        self.scratch.clear();
        rules
    }
}
