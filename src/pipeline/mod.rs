//! Pipeline stages for one source.
//!
//! - `normalize`: raw items to validated articles
//! - `crawl`: pagination controller
//! - `merge`: append-only history merge
//! - `order`: newest-first feed ordering
//! - `run`: per-site pipeline and batch runner

pub mod crawl;
pub mod merge;
pub mod normalize;
pub mod order;
pub mod run;

pub use crawl::CrawlController;
pub use merge::{MergeResult, merge};
pub use normalize::{ArticleNormalizer, FallbackDates, RejectReason};
pub use order::{order, order_by};
pub use run::{BatchReport, RunOptions, run_all, run_all_with, run_site, select_sites};
