use std::ops::RangeInclusive;
use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::{element_text, selector};
use crate::error::{CrawlError, Result};
use crate::resource::{ItemResource, ResourceCollection};

/// Page size requested from the listing endpoint. Large pages cut the number
/// of listing requests by roughly 8x compared to the site default of 12.
pub const ITEMS_PER_PAGE: u32 = 100;
const PAGINATION_FRAGMENT: &str = "#list";

const USAGES_MARKER: &str = "#usages";
const SECTION_ID_MARKER: &str = "#sectionId";

static TILE: LazyLock<Selector> = LazyLock::new(|| selector("div.partTile"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static RESULT_COUNT: LazyLock<Selector> = LazyLock::new(|| selector("span.resultCount"));

/// Item links of one listing page, in document order.
///
/// Cross-reference (`#usages`) tiles are dropped. Tiles pointing at a section
/// of an item are cut at the fragment and skipped when they repeat the item
/// accepted right before them.
pub fn parse(html: &str) -> ResourceCollection {
    let doc = Html::parse_document(html);
    let mut resources = ResourceCollection::new();
    let mut prev_url: Option<String> = None;

    for tile in doc.select(&TILE) {
        let Some(href) = tile
            .select(&ANCHOR)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };

        if href.contains(USAGES_MARKER) {
            continue;
        }

        let url = if href.contains(SECTION_ID_MARKER) {
            let base = href.split('#').next().unwrap_or(href);
            if prev_url.as_deref() == Some(base) {
                continue;
            }
            base
        } else {
            href
        };

        prev_url = Some(url.to_string());
        resources.push(ItemResource::new(url));
    }

    resources
}

/// Number of listing pages needed for the result count shown on the page.
///
/// The count is the second-to-last word of the `resultCount` element,
/// e.g. `Showing 1 - 24 of 1,234 results`.
pub fn num_pages(html: &str) -> Result<u32> {
    let doc = Html::parse_document(html);
    let text = doc
        .select(&RESULT_COUNT)
        .next()
        .map(|span| element_text(&span))
        .ok_or_else(|| CrawlError::BadPageCount("no result count element".into()))?;

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let raw = tokens
        .len()
        .checked_sub(2)
        .map(|i| tokens[i])
        .ok_or_else(|| CrawlError::BadPageCount(format!("too few words in {:?}", text.trim())))?;

    let count: u32 = raw
        .replace(',', "")
        .parse()
        .map_err(|_| CrawlError::BadPageCount(format!("{raw:?} is not a number")))?;

    Ok(count.div_ceil(ITEMS_PER_PAGE))
}

/// Page numbers to request, `1..=num_pages`.
pub fn page_range(num_pages: u32) -> RangeInclusive<u32> {
    1..=num_pages
}

/// Listing URL for one page. The endpoint expects exactly
/// `{base}/{page size}/{page}#list`.
pub fn page_url(base: &str, page: u32) -> String {
    format!("{base}/{ITEMS_PER_PAGE}/{page}{PAGINATION_FRAGMENT}")
}

// ── Tests ──
