use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::config::Settings;
use crate::credentials::Credentials;
use crate::download::{self, DownloadContext};
use crate::error::{CrawlError, Result};
use crate::fetch::Fetch;
use crate::parser::content::{self, ParsedContent};
use crate::parser::{listing, menu};
use crate::resource::{CatalogMenu, ItemResource, ResourceCollection};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    pub ok: usize,
    pub errors: usize,
}

impl StageStats {
    fn record(&mut self, ok: bool) {
        if ok {
            self.ok += 1;
        } else {
            self.errors += 1;
        }
    }
}

/// Per-stage counters of a run. Errors are units of work that were
/// abandoned; the run itself never fails because of them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub listing_pages: StageStats,
    pub items: StageStats,
    pub related_parts: StageStats,
    pub downloads: StageStats,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Listing pages", self.listing_pages),
            ("Items", self.items),
            ("Related parts", self.related_parts),
            ("Downloads", self.downloads),
        ];
        for (name, s) in rows {
            writeln!(f, "{:<14} {:>6} ok {:>6} errors", name, s.ok, s.errors)?;
        }
        Ok(())
    }
}

/// Four-stage crawl: menu, listings, content, download. Each stage finishes
/// for the whole catalog before the next one starts; inside a stage up to
/// `concurrency` requests run at once.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn Fetch>,
    credentials: Arc<Credentials>,
    settings: Arc<Settings>,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn Fetch>, credentials: Credentials, settings: Settings) -> Self {
        Pipeline {
            fetcher,
            credentials: Arc::new(credentials),
            settings: Arc::new(settings),
        }
    }

    /// Run every stage over the full catalog. Individual failures are logged
    /// and counted, never returned.
    pub async fn run(&self) -> RunStats {
        let mut stats = RunStats::default();

        info!("Stage 1/4: menu");
        let mut menu = match self.menu_stage().await {
            Ok(menu) => menu,
            Err(e) => {
                self.abandon("menu", &self.settings.base_url, &e).await;
                CatalogMenu::new()
            }
        };
        info!(
            "Menu: {} categories, {} subcategories",
            menu.len(),
            menu.subcategories().count()
        );

        info!("Stage 2/4: listings");
        self.listing_stage(&mut menu, &mut stats).await;
        info!("Listings: {} items", menu.item_count());

        info!("Stage 3/4: content");
        self.content_stage(&mut menu, &mut stats).await;

        info!("Stage 4/4: download");
        self.download_stage(&menu, &mut stats).await;

        stats
    }

    pub async fn menu_stage(&self) -> Result<CatalogMenu> {
        let html = self.fetch_page(&self.settings.base_url, &[]).await?;
        Ok(menu::parse(&html))
    }

    /// Fill every subcategory's resources from all of its listing pages.
    pub async fn listing_stage(&self, menu: &mut CatalogMenu, stats: &mut RunStats) {
        // (category, subcategory, listing url)
        let subs: Vec<(usize, usize, String)> = menu
            .categories()
            .iter()
            .enumerate()
            .flat_map(|(ci, cat)| {
                cat.subcategories
                    .iter()
                    .enumerate()
                    .map(move |(si, sub)| (ci, si, sub.listing_url.clone()))
            })
            .collect();

        // Page counts first, then every page of every subcategory.
        let this = self.clone();
        let counts = fan_out(self.concurrency(), subs.clone(), "page counts", move |(_, _, url)| {
            let this = this.clone();
            async move { this.page_count(&url).await }
        })
        .await;

        let mut pages: Vec<(usize, usize, String)> = Vec::new();
        for ((ci, si, url), count) in subs.into_iter().zip(counts) {
            for page in listing::page_range(count.flatten().unwrap_or(0)) {
                pages.push((ci, si, listing::page_url(&url, page)));
            }
        }

        let this = self.clone();
        let parsed = fan_out(
            self.concurrency(),
            pages.clone(),
            "listing pages",
            move |(_, _, url)| {
                let this = this.clone();
                async move { this.listing_page(&url).await }
            },
        )
        .await;

        for ((ci, si, _), collection) in pages.into_iter().zip(parsed) {
            let collection = collection.flatten();
            stats.listing_pages.record(collection.is_some());
            if let Some(collection) = collection {
                menu.categories_mut()[ci].subcategories[si]
                    .resources
                    .merge(collection);
            }
        }
    }

    /// Parse every item page and fetch the related-parts text of its sections.
    pub async fn content_stage(&self, menu: &mut CatalogMenu, stats: &mut RunStats) {
        // (category, subcategory, item, url)
        let mut jobs: Vec<(usize, usize, usize, String)> = Vec::new();
        for (ci, cat) in menu.categories().iter().enumerate() {
            for (si, sub) in cat.subcategories.iter().enumerate() {
                for (ii, item) in sub.resources.iter().enumerate() {
                    jobs.push((ci, si, ii, item.url.clone()));
                }
            }
        }

        let this = self.clone();
        let results = fan_out(self.concurrency(), jobs.clone(), "items", move |(_, _, _, url)| {
            let this = this.clone();
            async move { this.item_content(&url).await }
        })
        .await;

        for ((ci, si, ii, _), result) in jobs.into_iter().zip(results) {
            let Some(Some((content, related))) = result else {
                stats.items.record(false);
                continue;
            };
            stats.items.record(true);
            stats.related_parts.ok += related.ok;
            stats.related_parts.errors += related.errors;
            if let Some(item) = menu.categories_mut()[ci].subcategories[si]
                .resources
                .get_mut(ii)
            {
                item.apply_content(content);
            }
        }
    }

    /// Write the archive tree for every item that made it through the
    /// content stage.
    pub async fn download_stage(&self, menu: &CatalogMenu, stats: &mut RunStats) {
        let mut jobs: Vec<(ItemResource, PathBuf)> = Vec::new();
        for cat in menu.categories() {
            for sub in &cat.subcategories {
                let dir = match download::subcategory_dir(
                    &self.settings.output_dir,
                    &cat.name,
                    &sub.name,
                ) {
                    Ok(dir) => dir,
                    Err(e) => {
                        warn!("Cannot create directory for {}/{}: {}", cat.name, sub.name, e);
                        stats.downloads.errors += sub.resources.len();
                        continue;
                    }
                };
                for item in &sub.resources {
                    if item.is_populated() {
                        jobs.push((item.clone(), dir.clone()));
                    } else {
                        warn!("No content for {}, not archived", item.url);
                        stats.downloads.record(false);
                    }
                }
            }
        }

        let this = self.clone();
        let results = fan_out(self.concurrency(), jobs, "downloads", move |(item, dir)| {
            let this = this.clone();
            async move { this.archive_item(&item, &dir).await }
        })
        .await;

        for result in results {
            stats.downloads.record(matches!(result, Some(true)));
        }
    }

    // ── Units of work ──
    // Each returns None (after logging and backing off) when abandoned.

    async fn page_count(&self, url: &str) -> Option<u32> {
        info!("List url: {}", url);
        let html = match self.fetch_page(url, &[]).await {
            Ok(html) => html,
            Err(e) => {
                self.abandon("listing", url, &e).await;
                return None;
            }
        };
        match listing::num_pages(&html) {
            Ok(n) => Some(n),
            Err(e) => {
                self.abandon("pagination of", url, &e).await;
                None
            }
        }
    }

    async fn listing_page(&self, url: &str) -> Option<ResourceCollection> {
        info!("List url (page): {}", url);
        match self.fetch_page(url, &[]).await {
            Ok(html) => Some(listing::parse(&html)),
            Err(e) => {
                self.abandon("listing page", url, &e).await;
                None
            }
        }
    }

    async fn item_content(&self, url: &str) -> Option<(ParsedContent, StageStats)> {
        info!("Resource url: {}", url);
        let parsed = match self.fetch_page(url, &[]).await {
            Ok(html) => content::parse(&html),
            Err(e) => Err(e),
        };
        let mut parsed = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                self.abandon("item", url, &e).await;
                return None;
            }
        };
        let related = self.augment_sections(&mut parsed).await;
        Some((parsed, related))
    }

    /// Fill `Section::text` from the side channel. A failed query leaves the
    /// text empty.
    async fn augment_sections(&self, parsed: &mut ParsedContent) -> StageStats {
        let mut stats = StageStats::default();
        let ids: Vec<String> = parsed.sections.ids().map(str::to_string).collect();
        for id in ids {
            let Some(section) = parsed.sections.get_mut(&id) else {
                continue;
            };
            let query: Vec<(String, String)> = section
                .xhr_params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            match self.fetch_page(&self.settings.xhr_url, &query).await {
                Ok(html) => {
                    section.text = content::parse_related_parts(&html);
                    stats.record(true);
                }
                Err(e) => {
                    self.abandon("related parts of section", &id, &e).await;
                    stats.record(false);
                }
            }
        }
        stats
    }

    async fn archive_item(&self, item: &ItemResource, dir: &Path) -> bool {
        let ctx = DownloadContext {
            fetcher: self.fetcher.as_ref(),
            credentials: &self.credentials,
            section_images_url: &self.settings.section_images_url,
        };
        match download::download_item(&ctx, item, dir).await {
            Ok(path) => {
                info!("Saved {} -> {}", item.url, path.display());
                true
            }
            Err(e) => {
                self.abandon("download of", &item.url, &e).await;
                false
            }
        }
    }

    // ── Helpers ──

    async fn fetch_page(&self, url: &str, query: &[(String, String)]) -> Result<String> {
        self.fetcher
            .get(url, &self.credentials, query)
            .await?
            .into_body()
    }

    /// Log an abandoned unit of work; transport failures also pause for the
    /// configured backoff before the caller moves on.
    async fn abandon(&self, what: &str, target: &str, err: &CrawlError) {
        warn!("Giving up on {} {}: {}", what, target, err);
        if err.is_transport() {
            tokio::time::sleep(self.settings.backoff()).await;
        }
    }

    fn concurrency(&self) -> usize {
        self.settings.concurrency.max(1)
    }
}

/// Run `work` over `jobs` with at most `concurrency` in flight. Results come
/// back in job order; `None` marks a task that died without answering.
async fn fan_out<J, R, F, Fut>(
    concurrency: usize,
    jobs: Vec<J>,
    label: &str,
    work: F,
) -> Vec<Option<R>>
where
    J: Send + 'static,
    R: Send + 'static,
    F: Fn(J) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let total = jobs.len();
    let mut results: Vec<Option<R>> = (0..total).map(|_| None).collect();
    if total == 0 {
        return results;
    }

    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg:>14} [{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_message(label.to_string());

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let work = Arc::new(work);
    let (tx, mut rx) = mpsc::channel::<(usize, R)>(concurrency * 2);

    for (idx, job) in jobs.into_iter().enumerate() {
        let sem = Arc::clone(&semaphore);
        let work = Arc::clone(&work);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire_owned().await else {
                return;
            };
            let out = work(job).await;
            let _ = tx.send((idx, out)).await;
        });
    }

    // rx closes once every task has finished
    drop(tx);

    while let Some((idx, out)) = rx.recv().await {
        results[idx] = Some(out);
        pb.inc(1);
    }

    pb.finish_and_clear();
    results
}

// ── Tests ──
