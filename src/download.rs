use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::credentials::Credentials;
use crate::dirs::{ensure_dir, ensure_unique_dir};
use crate::error::{CrawlError, Result};
use crate::fetch::Fetch;
use crate::resource::ItemResource;
use crate::utils::{basename, sanitize, svg_variant};

const SOURCE_URL_FILE: &str = "www";
const RELATED_PARTS_FILE: &str = "related_parts";

/// Where item files come from and how to reach them.
pub struct DownloadContext<'a> {
    pub fetcher: &'a dyn Fetch,
    pub credentials: &'a Credentials,
    /// Base for section images referenced by relative path.
    pub section_images_url: &'a str,
}

/// Write one item under `subcategory_dir`:
///
/// ```text
/// <title_identifier>/
///     www
///     <slider images>
///     related_parts, <section image>[, <section image>.svg]   one section
///     1/related_parts, 1/<section image>, 2/...                several sections
/// ```
///
/// Returns the item directory. Items that have not been through the content
/// stage are refused with [`CrawlError::NotParsed`].
pub async fn download_item(
    ctx: &DownloadContext<'_>,
    item: &ItemResource,
    subcategory_dir: &Path,
) -> Result<PathBuf> {
    let Some(dir_name) = item.directory_name.as_deref() else {
        return Err(CrawlError::NotParsed(item.url.clone()));
    };
    let item_dir = ensure_unique_dir(subcategory_dir, &sanitize(dir_name))?;
    debug!("{} -> {}", item.url, item_dir.display());

    for image in &item.slider_images {
        let file_name = basename(image);
        if file_name.is_empty() {
            debug!("slider image {} has no file name", image);
            continue;
        }
        let dest = item_dir.join(sanitize(&file_name));
        let status = ctx.fetcher.download(image, ctx.credentials, &dest).await?;
        if status != 200 {
            warn!("slider image {} answered {}, skipped", image, status);
        }
    }

    tokio::fs::write(item_dir.join(SOURCE_URL_FILE), &item.url).await?;

    let single = item.sections.len() == 1;
    for (ordinal, (section_id, section)) in item.sections.iter().enumerate() {
        let image_url = resolve_section_image(&section.image, ctx.section_images_url);

        let section_dir = if single {
            item_dir.clone()
        } else {
            ensure_unique_dir(&item_dir, &(ordinal + 1).to_string())?
        };
        tokio::fs::write(section_dir.join(RELATED_PARTS_FILE), &section.text).await?;

        let file_name = basename(&image_url);
        if file_name.is_empty() {
            debug!("section {} has no image file name", section_id);
            continue;
        }
        let image_path = section_dir.join(file_name);
        let status = ctx
            .fetcher
            .download(&image_url, ctx.credentials, &image_path)
            .await?;
        if status != 200 {
            warn!("section image {} answered {}, skipped", image_url, status);
            continue;
        }

        // vector drawings exist for some illustrations only
        let svg_path = image_path.with_extension("svg");
        let svg_status = ctx
            .fetcher
            .download(&svg_variant(&image_url), ctx.credentials, &svg_path)
            .await?;
        if svg_status == 200 {
            debug!("saved svg variant {}", svg_path.display());
        }
    }

    Ok(item_dir)
}

/// Category and subcategory directories for one subcategory, created if
/// absent.
pub fn subcategory_dir(base: &Path, category: &str, subcategory: &str) -> Result<PathBuf> {
    let category_dir = ensure_dir(base, category)?;
    Ok(ensure_dir(&category_dir, subcategory)?)
}

fn resolve_section_image(image: &str, section_images_url: &str) -> String {
    let image = image.trim_start_matches('/');
    if image.contains("http") {
        image.to_string()
    } else if section_images_url.ends_with('/') {
        format!("{}{}", section_images_url, image)
    } else {
        format!("{}/{}", section_images_url, image)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::fetch::testing::FakeFetcher;
    use crate::parser::content::ParsedContent;
    use crate::resource::{Section, Sections};

    const SECTION_BASE: &str = "https://parts.test/images/section-images/";

    fn item(sections: &[(&str, &str, &str)]) -> ItemResource {
        let mut s = Sections::default();
        for (id, image, text) in sections {
            s.insert(
                id.to_string(),
                Section {
                    image: image.to_string(),
                    text: text.to_string(),
                    ..Default::default()
                },
            );
        }
        let mut item = ItemResource::new("https://parts.test/p/bracket");
        item.apply_content(ParsedContent {
            title: "Bracket".into(),
            identifier: "BC3Z/2C405".into(),
            slider_images: vec!["https://parts.test/photo/047/56047.jpg".into()],
            sections: s,
        });
        item
    }

    #[test]
    fn section_image_resolution() {
        assert_eq!(
            resolve_section_image("/f0208.png", SECTION_BASE),
            "https://parts.test/images/section-images/f0208.png"
        );
        assert_eq!(
            resolve_section_image("f0208.png", "https://x/imgs"),
            "https://x/imgs/f0208.png"
        );
        assert_eq!(
            resolve_section_image("https://cdn/f0208.png", SECTION_BASE),
            "https://cdn/f0208.png"
        );
    }

    #[tokio::test]
    async fn single_section_lands_in_item_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = FakeFetcher::new()
            .file("https://parts.test/photo/047/56047.jpg", b"jpg")
            .file("https://parts.test/images/section-images/f0208.png", b"png")
            .file("https://parts.test/images/section-images/f0208.svg", b"<svg/>");
        let creds = Credentials::default();
        let ctx = DownloadContext {
            fetcher: &fake,
            credentials: &creds,
            section_images_url: SECTION_BASE,
        };

        let dir = download_item(&ctx, &item(&[("7", "/f0208.png", "W1\n")]), tmp.path())
            .await
            .unwrap();

        assert_eq!(dir, tmp.path().join("Bracket_BC3Z-2C405"));
        assert_eq!(fs::read_to_string(dir.join("www")).unwrap(), "https://parts.test/p/bracket");
        assert_eq!(fs::read(dir.join("56047.jpg")).unwrap(), b"jpg");
        assert_eq!(fs::read_to_string(dir.join("related_parts")).unwrap(), "W1\n");
        assert_eq!(fs::read(dir.join("f0208.png")).unwrap(), b"png");
        assert_eq!(fs::read(dir.join("f0208.svg")).unwrap(), b"<svg/>");
        assert!(!dir.join("1").exists());
    }

    #[tokio::test]
    async fn several_sections_get_numbered_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = FakeFetcher::new()
            .file("https://parts.test/images/section-images/a.png", b"a")
            .file("https://cdn.test/b.png", b"b");
        let creds = Credentials::default();
        let ctx = DownloadContext {
            fetcher: &fake,
            credentials: &creds,
            section_images_url: SECTION_BASE,
        };
        let it = item(&[("9", "/a.png", "A\n"), ("3", "https://cdn.test/b.png", "B\n")]);

        let dir = download_item(&ctx, &it, tmp.path()).await.unwrap();

        assert_eq!(fs::read_to_string(dir.join("1/related_parts")).unwrap(), "A\n");
        assert_eq!(fs::read(dir.join("1/a.png")).unwrap(), b"a");
        assert_eq!(fs::read_to_string(dir.join("2/related_parts")).unwrap(), "B\n");
        assert_eq!(fs::read(dir.join("2/b.png")).unwrap(), b"b");
        // no svg variants served
        assert!(!dir.join("1/a.svg").exists());
        // slider image missing upstream: nothing written, item still archived
        assert!(!dir.join("56047.jpg").exists());
        assert!(!dir.join("related_parts").exists());
    }

    #[tokio::test]
    async fn same_item_twice_gets_suffixed_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = FakeFetcher::new();
        let creds = Credentials::default();
        let ctx = DownloadContext {
            fetcher: &fake,
            credentials: &creds,
            section_images_url: SECTION_BASE,
        };
        let it = item(&[]);
        let first = download_item(&ctx, &it, tmp.path()).await.unwrap();
        let second = download_item(&ctx, &it, tmp.path()).await.unwrap();
        assert_eq!(second, tmp.path().join("Bracket_BC3Z-2C405-1"));
        assert_ne!(first, second);
        assert!(second.join("www").is_file());
    }

    #[tokio::test]
    async fn transport_failure_abandons_item() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = FakeFetcher::new().fail("https://parts.test/photo/047/56047.jpg");
        let creds = Credentials::default();
        let ctx = DownloadContext {
            fetcher: &fake,
            credentials: &creds,
            section_images_url: SECTION_BASE,
        };
        let err = download_item(&ctx, &item(&[]), tmp.path()).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn unparsed_item_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = FakeFetcher::new();
        let creds = Credentials::default();
        let ctx = DownloadContext {
            fetcher: &fake,
            credentials: &creds,
            section_images_url: SECTION_BASE,
        };
        let err = download_item(&ctx, &ItemResource::new("https://parts.test/p/x"), tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::NotParsed(ref url) if url == "https://parts.test/p/x"));
        assert!(!err.is_transport());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn slider_entry_without_file_name_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = FakeFetcher::new()
            .file("https://parts.test/photo/047/", b"listing")
            .file("https://parts.test/images/section-images/f0208.png", b"png");
        let creds = Credentials::default();
        let ctx = DownloadContext {
            fetcher: &fake,
            credentials: &creds,
            section_images_url: SECTION_BASE,
        };
        let mut it = item(&[("7", "/f0208.png", "W1\n")]);
        it.slider_images = vec!["https://parts.test/photo/047/".into()];

        let dir = download_item(&ctx, &it, tmp.path()).await.unwrap();

        assert!(dir.join("www").is_file());
        assert_eq!(fs::read_to_string(dir.join("related_parts")).unwrap(), "W1\n");
        assert_eq!(fs::read(dir.join("f0208.png")).unwrap(), b"png");
        assert!(fake
            .requests()
            .iter()
            .all(|(url, _)| url != "https://parts.test/photo/047/"));
    }

    #[test]
    fn hierarchy_dirs_are_reused() {
        let tmp = tempfile::tempdir().unwrap();
        let a = subcategory_dir(tmp.path(), "Brakes", "Pads").unwrap();
        let b = subcategory_dir(tmp.path(), "Brakes", "Pads").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, tmp.path().join("Brakes").join("Pads"));
    }
}
