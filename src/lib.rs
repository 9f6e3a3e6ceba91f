// src/lib.rs

//! feedcrawl: incremental crawl-and-merge RSS feed generator

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
