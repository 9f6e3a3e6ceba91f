// src/models/mod.rs

//! Domain models for the feed crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod article;
mod config;
mod crawl;
mod site;

// Re-export all public types
pub use article::{Article, RawItem, StoredArticle};
pub use config::{
    Config, CrawlerConfig, DepthConfig, FeedConfig, NormalizeConfig, PathsConfig,
};
pub use crawl::{CrawlDepth, CrawlOutcome, CrawlState, RunSummary, StopReason};
pub use site::{
    AdapterConfig, FeedMeta, HtmlAdapterConfig, JsonApiConfig, JsonFields, SiteConfig,
};
