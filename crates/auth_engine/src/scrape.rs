use std::sync::LazyLock;

use auth_core::normalize_candidate;
use auth_logging::{auth_debug, redact};
use ego_tree::NodeRef;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Inputs shorter than this are never taken for a token.
pub const MIN_INPUT_TOKEN_LEN: usize = 30;

/// Script for browser adapters that evaluate the page in place. It applies the
/// same rules as [`HeuristicTokenScraper`]; feed its result to
/// [`crate::AuthSession::submit_candidate`].
pub const EXTRACTION_SCRIPT: &str = include_str!("../assets/extract_token.js");

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .expect("uuid pattern compiles")
});

const HIDDEN_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// Elements a rendered page separates from their neighbours with a line break.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputRecord {
    /// Lowercased `type` attribute; `text` when absent.
    pub input_type: String,
    pub readonly: bool,
    pub value: String,
}

impl InputRecord {
    pub fn new(input_type: &str, readonly: bool, value: impl Into<String>) -> Self {
        Self {
            input_type: input_type.to_ascii_lowercase(),
            readonly,
            value: value.into(),
        }
    }

    fn is_text(&self) -> bool {
        self.input_type == "text"
    }

    fn is_password(&self) -> bool {
        self.input_type == "password"
    }

    fn is_long(&self) -> bool {
        self.value.chars().count() > MIN_INPUT_TOKEN_LEN
    }
}

/// Serialized content of one rendered page, detached from any browser engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageSnapshot {
    pub visible_text: String,
    pub inputs: Vec<InputRecord>,
    /// Values of `data-api-key` attributes in document order.
    pub data_tokens: Vec<String>,
    /// Text of `code` and `pre` elements in document order.
    pub code_blocks: Vec<String>,
}

impl PageSnapshot {
    pub fn from_html(html: &str) -> Self {
        let doc = Html::parse_document(html);

        let mut visible_text = String::new();
        collect_visible_text(*doc.root_element(), &mut visible_text);

        let inputs = select_all(&doc, "input")
            .map(|input| {
                let element = input.value();
                InputRecord::new(
                    element.attr("type").unwrap_or("text"),
                    element.attr("readonly").is_some(),
                    element.attr("value").unwrap_or_default(),
                )
            })
            .collect();

        let data_tokens = select_all(&doc, "[data-api-key]")
            .filter_map(|el| el.value().attr("data-api-key"))
            .map(ToOwned::to_owned)
            .collect();

        let code_blocks = select_all(&doc, "code, pre")
            .map(|el| el.text().collect::<String>())
            .collect();

        Self {
            visible_text,
            inputs,
            data_tokens,
            code_blocks,
        }
    }
}

fn select_all<'a>(doc: &'a Html, css: &str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let selector = Selector::parse(css).ok();
    selector
        .into_iter()
        .flat_map(move |sel| doc.select(&sel).collect::<Vec<_>>())
}

fn collect_visible_text(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(text),
        Node::Element(element) if HIDDEN_TEXT_TAGS.contains(&element.name()) => {}
        Node::Element(element) if BLOCK_TAGS.contains(&element.name()) => {
            out.push('\n');
            for child in node.children() {
                collect_visible_text(child, out);
            }
            out.push('\n');
        }
        _ => {
            for child in node.children() {
                collect_visible_text(child, out);
            }
        }
    }
}

pub trait TokenScraper: Send + Sync {
    fn scrape(&self, page: &PageSnapshot) -> Option<String>;

    fn scrape_html(&self, html: &str) -> Option<String> {
        self.scrape(&PageSnapshot::from_html(html))
    }
}

/// Ordered fallbacks, first hit wins. The settings page markup is not stable,
/// so each rule covers a layout the page has used or might use:
/// 1. read-only text input longer than 30 chars
/// 2. UUID anywhere in the visible text
/// 3. `data-api-key` attribute
/// 4. text/password input longer than 30 chars made of hex digits and dashes
/// 5. UUID inside `code`/`pre`
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicTokenScraper;

impl TokenScraper for HeuristicTokenScraper {
    fn scrape(&self, page: &PageSnapshot) -> Option<String> {
        let rules: [(&str, fn(&PageSnapshot) -> Option<String>); 5] = [
            ("readonly input", readonly_text_input),
            ("uuid in text", uuid_in_visible_text),
            ("data attribute", data_attribute),
            ("hex input", hex_input),
            ("uuid in code block", uuid_in_code_block),
        ];

        for (name, rule) in rules {
            if let Some(token) = rule(page) {
                auth_debug!("Token {} found by rule '{}'", redact(&token), name);
                return Some(token);
            }
        }
        auth_debug!(
            "No token found ({} inputs, {} chars of text)",
            page.inputs.len(),
            page.visible_text.len()
        );
        None
    }
}

fn readonly_text_input(page: &PageSnapshot) -> Option<String> {
    page.inputs
        .iter()
        .filter(|input| input.is_text() && input.readonly && input.is_long())
        .find_map(|input| normalize_candidate(&input.value))
}

fn uuid_in_visible_text(page: &PageSnapshot) -> Option<String> {
    find_uuid(&page.visible_text)
}

fn data_attribute(page: &PageSnapshot) -> Option<String> {
    page.data_tokens
        .iter()
        .find_map(|value| normalize_candidate(value))
}

fn hex_input(page: &PageSnapshot) -> Option<String> {
    page.inputs
        .iter()
        .filter(|input| (input.is_text() || input.is_password()) && input.is_long())
        .filter(|input| {
            input
                .value
                .trim()
                .chars()
                .all(|c| c.is_ascii_hexdigit() || c == '-')
        })
        .find_map(|input| normalize_candidate(&input.value))
}

fn uuid_in_code_block(page: &PageSnapshot) -> Option<String> {
    page.code_blocks.iter().find_map(|block| find_uuid(block))
}

fn find_uuid(text: &str) -> Option<String> {
    UUID_PATTERN
        .find(text)
        .and_then(|m| normalize_candidate(m.as_str()))
}
