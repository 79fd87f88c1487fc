use std::collections::BTreeMap;
use std::fmt;

use crate::parser::content::ParsedContent;
use crate::utils::sanitize;

/// Query parameters identifying item + vehicle + section for the
/// related-parts side channel.
pub type XhrParams = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub image: String,
    pub xhr_params: XhrParams,
    /// Empty until the side channel answered.
    pub text: String,
}

/// Ordered section map keyed by section id. Re-inserting an id replaces the
/// earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections(Vec<(String, Section)>);

impl Sections {
    pub fn insert(&mut self, id: String, section: Section) {
        match self.0.iter_mut().find(|(k, _)| *k == id) {
            Some(slot) => slot.1 = section,
            None => self.0.push((id, section)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Section> {
        self.0.iter().find(|(k, _)| k == id).map(|(_, s)| s)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Section> {
        self.0.iter_mut().find(|(k, _)| k == id).map(|(_, s)| s)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.0.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One catalog item. Only `url` is known after the listing stage; the content
/// stage fills in everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResource {
    pub url: String,
    pub title: Option<String>,
    pub identifier: Option<String>,
    pub directory_name: Option<String>,
    pub slider_images: Vec<String>,
    pub sections: Sections,
}

impl ItemResource {
    pub fn new(url: impl Into<String>) -> Self {
        ItemResource {
            url: url.into(),
            title: None,
            identifier: None,
            directory_name: None,
            slider_images: Vec::new(),
            sections: Sections::default(),
        }
    }

    pub fn apply_content(&mut self, content: ParsedContent) {
        self.directory_name = Some(sanitize(&format!(
            "{}_{}",
            content.title, content.identifier
        )));
        self.title = Some(content.title);
        self.identifier = Some(content.identifier);
        self.slider_images = content.slider_images;
        self.sections = content.sections;
    }

    /// Whether the content stage completed for this item.
    pub fn is_populated(&self) -> bool {
        self.directory_name.is_some()
    }
}

/// Items of one subcategory in listing order. Duplicates are filtered by the
/// listing parser, never here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceCollection {
    items: Vec<ItemResource>,
}

impl ResourceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ItemResource) {
        self.items.push(item);
    }

    /// Append every item of `other`, keeping its order.
    pub fn merge(&mut self, other: ResourceCollection) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ItemResource> {
        self.items.iter()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ItemResource> {
        self.items.get_mut(index)
    }
}

impl<'a> IntoIterator for &'a ResourceCollection {
    type Item = &'a ItemResource;
    type IntoIter = std::slice::Iter<'a, ItemResource>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for ResourceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let urls: Vec<&str> = self.items.iter().map(|r| r.url.as_str()).collect();
        write!(f, "[{}]", urls.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcategoryRef {
    pub name: String,
    pub listing_url: String,
    pub resources: ResourceCollection,
}

impl SubcategoryRef {
    pub fn new(name: impl Into<String>, listing_url: impl Into<String>) -> Self {
        SubcategoryRef {
            name: name.into(),
            listing_url: listing_url.into(),
            resources: ResourceCollection::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub subcategories: Vec<SubcategoryRef>,
}

/// Category name -> subcategories, in menu order. Names arrive sanitized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogMenu {
    categories: Vec<Category>,
}

impl CatalogMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subcategory under `category`, creating the entry on first
    /// sight. A repeated heading keeps accumulating into the same entry.
    pub fn push(&mut self, category: &str, sub: SubcategoryRef) {
        self.category_entry(category).subcategories.push(sub);
    }

    /// Register a category with no subcategories yet.
    pub fn ensure_category(&mut self, category: &str) {
        self.category_entry(category);
    }

    fn category_entry(&mut self, category: &str) -> &mut Category {
        let idx = match self.categories.iter().position(|c| c.name == category) {
            Some(idx) => idx,
            None => {
                self.categories.push(Category {
                    name: category.to_string(),
                    subcategories: Vec::new(),
                });
                self.categories.len() - 1
            }
        };
        &mut self.categories[idx]
    }

    pub fn get(&self, category: &str) -> Option<&[SubcategoryRef]> {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.subcategories.as_slice())
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn categories_mut(&mut self) -> &mut [Category] {
        &mut self.categories
    }

    pub fn subcategories(&self) -> impl Iterator<Item = &SubcategoryRef> {
        self.categories.iter().flat_map(|c| c.subcategories.iter())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.subcategories().map(|s| s.resources.len()).sum()
    }
}

// ── Tests ──
