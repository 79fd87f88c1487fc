pub mod content;
pub mod listing;
pub mod menu;
pub mod script;

use scraper::{ElementRef, Selector};

/// Compile a selector known at build time.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

/// Concatenated text of an element and its descendants, untouched.
pub(crate) fn element_text(el: &ElementRef) -> String {
    el.text().collect()
}
