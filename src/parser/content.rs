use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::{element_text, script, selector};
use crate::error::{CrawlError, Result};
use crate::resource::{Section, Sections, XhrParams};

static PRODUCT_NAME: LazyLock<Selector> = LazyLock::new(|| selector("h2#productName"));
static PRODUCT_NUMBER: LazyLock<Selector> = LazyLock::new(|| selector("span#productPartNumber"));
static DETAIL_IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img.bdr.img-responsive"));
static SCRIPT: LazyLock<Selector> = LazyLock::new(|| selector("script"));
static FILTER_FORM: LazyLock<Selector> = LazyLock::new(|| selector("div.form-group.search-filed"));
static INPUT: LazyLock<Selector> = LazyLock::new(|| selector("input"));
static PANEL_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h4.panel-title"));

/// Filter-form inputs that identify the item and vehicle for the related
/// parts query.
const XHR_FIELDS: [&str; 7] = [
    "partnumber",
    "vehicleId",
    "parent_category_rn",
    "categoryId",
    "catalogId",
    "langId",
    "storeId",
];
const SECTION_ID_PARAM: &str = "sectionId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContent {
    pub title: String,
    pub identifier: String,
    pub slider_images: Vec<String>,
    pub sections: Sections,
}

/// Parse an item detail page.
///
/// Fails with [`CrawlError::MissingElement`] when the product name or number
/// is absent; such an item cannot be archived.
pub fn parse(html: &str) -> Result<ParsedContent> {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&PRODUCT_NAME)
        .next()
        .map(|h2| element_text(&h2).replace('\n', "").trim().to_string())
        .ok_or(CrawlError::MissingElement("h2#productName"))?;

    let number_text = doc
        .select(&PRODUCT_NUMBER)
        .next()
        .map(|span| element_text(&span))
        .ok_or(CrawlError::MissingElement("span#productPartNumber"))?;
    let identifier = number_text
        .split('\n')
        .map(str::trim)
        .find(|token| !token.is_empty())
        .ok_or(CrawlError::MissingElement("span#productPartNumber"))?
        .to_string();

    let images: Vec<String> = doc
        .select(&DETAIL_IMAGE)
        .filter_map(|img| img.value().attr("src"))
        .map(str::to_string)
        .collect();

    let scripts: Vec<String> = doc.select(&SCRIPT).map(|s| element_text(&s)).collect();
    let slider_images = script::find_slider_payload(&scripts)
        .map(script::extract_slider_images)
        .unwrap_or_default();
    let section_ids = script::find_section_payload(&scripts)
        .map(script::extract_section_ids)
        .unwrap_or_default();

    let template = xhr_template(&doc);

    // Ids and images are paired by position only; the shorter list wins.
    let mut sections = Sections::default();
    for (section_id, image) in section_ids.into_iter().zip(images) {
        let mut xhr_params = template.clone();
        xhr_params.insert(SECTION_ID_PARAM.to_string(), section_id.clone());
        sections.insert(
            section_id,
            Section {
                image,
                xhr_params,
                text: String::new(),
            },
        );
    }

    Ok(ParsedContent {
        title,
        identifier,
        slider_images,
        sections,
    })
}

/// Related-parts query parameters shared by every section of the page.
/// Fields missing from the form are left out.
fn xhr_template(doc: &Html) -> XhrParams {
    let mut params = XhrParams::new();
    let Some(form) = doc.select(&FILTER_FORM).next() else {
        return params;
    };
    for input in form.select(&INPUT) {
        let attrs = input.value();
        let (Some(name), Some(value)) = (attrs.attr("name"), attrs.attr("value")) else {
            continue;
        };
        if XHR_FIELDS.iter().any(|field| name.contains(field)) {
            params.insert(name.to_string(), value.to_string());
        }
    }
    params
}

/// Text of the related-parts side channel response: one line per panel title
/// with all spaces, tabs and newlines removed.
pub fn parse_related_parts(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    doc.select(&PANEL_TITLE)
        .map(|h4| {
            let mut line: String = element_text(&h4)
                .chars()
                .filter(|c| !matches!(c, '\n' | ' ' | '\t'))
                .collect();
            line.push('\n');
            line
        })
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL: &str = r#"
        <html><head>
        <script type="text/javascript">
            var imageServicesList = [];
            imageServicesList = {
            "imageData": [
                {
                    "imageFolder": "047",
                    "imagePath": "https://parts.ford.com/images/photo-images/047/",
                    "imageName": "56047.jpg",
                    "imageSequence": "1.0"
                }
                ]
            };
        </script>
        <script>
            usageItemsList = [
            {
                "xads_5sectionid": "4093766",
                "name": "Bracket",
            },
            {
                "xads_5sectionid": "4067933",
            }
            ];
        </script>
        </head><body>
        <h2 id="productName">
Bracket,
Anti-Lock Brakes  </h2>
        <span id="productPartNumber">
            BC3Z-2C405-A
            Ford
        </span>
        <div class="form-group search-filed">
            <input name="partnumber" value="BC3Z2C405A">
            <input name="vehicleId" value="77">
            <input name="storeId" value="10151">
            <input name="searchTerm" value="ignored">
            <input name="catalogId">
        </div>
        <img class="bdr img-responsive" src="/f020808502.png">
        <img class="bdr img-responsive" src="https://cdn/f022372602.png">
        <img class="bdr img-responsive" src="/f0999.png">
        <img class="thumb" src="/unrelated.png">
        </body></html>
    "#;

    #[test]
    fn title_and_identifier() {
        let c = parse(DETAIL).unwrap();
        assert_eq!(c.title, "Bracket,Anti-Lock Brakes");
        assert_eq!(c.identifier, "BC3Z-2C405-A");
    }

    #[test]
    fn slider_images_from_script() {
        let c = parse(DETAIL).unwrap();
        assert_eq!(
            c.slider_images,
            vec!["https://parts.ford.com/images/photo-images/047/56047.jpg"]
        );
    }

    #[test]
    fn sections_pair_ids_with_images_positionally() {
        let c = parse(DETAIL).unwrap();
        assert_eq!(c.sections.ids().collect::<Vec<_>>(), vec!["4093766", "4067933"]);
        let first = c.sections.get("4093766").unwrap();
        assert_eq!(first.image, "/f020808502.png");
        assert!(first.text.is_empty());
        assert_eq!(
            c.sections.get("4067933").unwrap().image,
            "https://cdn/f022372602.png"
        );
    }

    #[test]
    fn xhr_params_copy_template_with_section_id() {
        let c = parse(DETAIL).unwrap();
        let params = &c.sections.get("4067933").unwrap().xhr_params;
        assert_eq!(params.get("partnumber").map(String::as_str), Some("BC3Z2C405A"));
        assert_eq!(params.get("vehicleId").map(String::as_str), Some("77"));
        assert_eq!(params.get("storeId").map(String::as_str), Some("10151"));
        assert_eq!(params.get("sectionId").map(String::as_str), Some("4067933"));
        assert!(!params.contains_key("searchTerm"));
        assert!(!params.contains_key("catalogId"));
        assert!(!params.contains_key("langId"));
        let other = &c.sections.get("4093766").unwrap().xhr_params;
        assert_eq!(other.get("sectionId").map(String::as_str), Some("4093766"));
    }

    #[test]
    fn repeated_section_id_keeps_later_image() {
        let html = r#"
            <h2 id="productName">Pad</h2><span id="productPartNumber">P1</span>
            <script>
                "xads_5sectionid": "7",
                "xads_5sectionid": "7",
            </script>
            <img class="bdr img-responsive" src="/a.png">
            <img class="bdr img-responsive" src="/b.png">
        "#;
        let c = parse(html).unwrap();
        assert_eq!(c.sections.len(), 1);
        assert_eq!(c.sections.get("7").unwrap().image, "/b.png");
    }

    #[test]
    fn no_scripts_means_no_sections() {
        let html = r#"<h2 id="productName">Pad</h2><span id="productPartNumber">P1</span>
                      <img class="bdr img-responsive" src="/a.png">"#;
        let c = parse(html).unwrap();
        assert!(c.sections.is_empty());
        assert!(c.slider_images.is_empty());
    }

    #[test]
    fn missing_title_or_number_fails() {
        let no_title = r#"<span id="productPartNumber">P1</span>"#;
        assert!(matches!(parse(no_title), Err(CrawlError::MissingElement(_))));
        let no_number = r#"<h2 id="productName">Pad</h2>"#;
        assert!(matches!(parse(no_number), Err(CrawlError::MissingElement(_))));
        let blank_number =
            "<h2 id=\"productName\">Pad</h2><span id=\"productPartNumber\">\n \n</span>";
        assert!(parse(blank_number).is_err());
    }

    #[test]
    fn related_parts_text() {
        let html = concat!(
            "<div class=\"panel\"><h4 class=\"panel-title\">",
            "\n  <a>W 7 0 0 1 2 3 - S</a>\n</h4></div>",
            "<h4 class=\"panel-title\">\tBolt\t</h4><h4>Ignored</h4>",
        );
        assert_eq!(parse_related_parts(html), "W700123-S\nBolt\n");
        assert_eq!(parse_related_parts("<p>nothing</p>"), "");
    }
}
