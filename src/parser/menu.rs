use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{element_text, selector};
use crate::resource::{CatalogMenu, SubcategoryRef};
use crate::utils::sanitize;

static HEADING_BLOCK: LazyLock<Selector> = LazyLock::new(|| selector("div#heading1"));
static HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h4"));
static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));

/// Parse the landing page navigation into category -> subcategories.
///
/// Each heading block names a category; the anchors inside the `div`s that
/// follow it as siblings become its subcategories. Missing markup yields
/// nothing for that block instead of an error.
pub fn parse(html: &str) -> CatalogMenu {
    let doc = Html::parse_document(html);
    let mut menu = CatalogMenu::new();

    for block in doc.select(&HEADING_BLOCK) {
        let Some(h4) = block.select(&HEADING).next() else {
            debug!("menu heading block without <h4>, skipped");
            continue;
        };
        let category = sanitize(element_text(&h4).replace('\n', "").trim());
        menu.ensure_category(&category);

        let siblings = block
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "div");

        for sibling in siblings {
            for li in sibling.select(&LIST_ITEM) {
                let Some(a) = li.select(&ANCHOR).next() else {
                    continue;
                };
                let Some(href) = a.value().attr("href") else {
                    continue;
                };
                // anchor text carries the template's indentation and line breaks
                let name = sanitize(element_text(&a).trim());
                menu.push(&category, SubcategoryRef::new(name, href));
            }
        }
    }

    menu
}

// ── Tests ──
