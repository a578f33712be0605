// src/scraper/extract.rs
//! Named, ordered extraction strategies.
//!
//! Each field of a page is described by a priority list of strategies. The
//! first strategy that locates an element *and* yields a usable value wins.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// How a strategy finds its candidate element.
#[derive(Clone, Copy)]
pub enum Locate {
    /// First element matching a CSS selector
    Css(&'static str),
    /// Arbitrary lookup for structures CSS cannot express
    Custom(fn(&Html) -> Option<ElementRef<'_>>),
}

#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub locate: Locate,
}

impl Strategy {
    pub const fn css(name: &'static str, selector: &'static str) -> Self {
        Self {
            name,
            locate: Locate::Css(selector),
        }
    }

    pub const fn custom(name: &'static str, find: fn(&Html) -> Option<ElementRef<'_>>) -> Self {
        Self {
            name,
            locate: Locate::Custom(find),
        }
    }

    pub fn find<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        match self.locate {
            Locate::Css(css) => {
                let selector = parse_selector(css)?;
                let found = document.select(&selector).next();
                found
            }
            Locate::Custom(find) => find(document),
        }
    }
}

/// Run `strategies` in order, returning the first value `extract` accepts.
pub fn first_with<'a, T, F>(
    document: &'a Html,
    field: &str,
    strategies: &[Strategy],
    extract: F,
) -> Option<T>
where
    F: Fn(ElementRef<'a>) -> Option<T>,
{
    for strategy in strategies {
        if let Some(value) = strategy.find(document).and_then(&extract) {
            debug!("Extracted {} via '{}'", field, strategy.name);
            return Some(value);
        }
    }
    debug!("No strategy matched for {}", field);
    None
}

/// First non-empty single-line text among `strategies`.
pub fn first_text(document: &Html, field: &str, strategies: &[Strategy]) -> Option<String> {
    first_with(document, field, strategies, |element| {
        Some(element_text(element)).filter(|text| !text.is_empty())
    })
}

pub fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Invalid selector '{}': {:?}", css, e);
            None
        }
    }
}

/// First descendant of `scope` matching `css`.
pub fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = parse_selector(css)?;
    let found = scope.select(&selector).next();
    found
}

/// Text content with all whitespace runs collapsed to single spaces.
pub fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text content keeping the line structure: text nodes are joined with line
/// breaks and the outer whitespace is trimmed.
pub fn multiline_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Value of the first present, non-blank attribute in `names`.
pub fn first_attr(element: ElementRef<'_>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| element.value().attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Whether the element's class attribute satisfies `predicate` (lowercased).
pub fn class_matches(element: ElementRef<'_>, predicate: impl Fn(&str) -> bool) -> bool {
    element
        .value()
        .attr("class")
        .map(|class| predicate(&class.to_lowercase()))
        .unwrap_or(false)
}
