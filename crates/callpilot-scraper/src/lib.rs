//! Website crawling and knowledge-file preparation.
//!
//! The crawl side ([`ScrapeOrchestrator`] over two [`CrawlBackend`]s) turns a
//! business website into [`ScrapedPage`]s. The content side ([`clean_page`]
//! and [`ContentPacker`]) turns those pages into size-bounded text files.

pub mod backend;
pub mod clean;
pub mod error;
pub mod hosted;
pub(crate) mod html;
pub mod http_crawler;
pub mod orchestrator;
pub mod pack;
pub mod types;
pub(crate) mod urls;

pub use backend::CrawlBackend;
pub use clean::{clean_page, clean_text};
pub use error::ScraperError;
pub use hosted::HostedCrawler;
pub use http_crawler::HttpCrawler;
pub use orchestrator::{ScrapeOrchestrator, ScrapeReport};
pub use pack::{
    business_slug, ContentPacker, PackPlan, PackedFile, PlannedFile, DEFAULT_MAX_FILE_BYTES,
};
pub use types::{CrawlLimits, CrawlOutput, ScrapedPage};
