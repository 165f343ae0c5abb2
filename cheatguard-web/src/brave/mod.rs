//! Brave Search API (web vertical) as a [`crate::search::SearchProvider`].

mod client;
mod types;

pub use client::{BRAVE_API_BASE, BraveSearch};
pub use types::{ResultItem, SearchResult, WebResults, WebSearchApiResponse};
