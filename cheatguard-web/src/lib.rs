//! Web discovery and acquisition utilities.
//!
//! - Query dispatch with site filters over a pluggable [`search::SearchProvider`]
//! - Brave Search API client (`brave`) as the production provider
//! - Page fetching behind the [`fetch::PageFetcher`] trait
//! - Heuristic HTML-to-excerpt extraction (`extract`)

pub mod brave;
pub mod extract;
pub mod fetch;
pub mod search;

pub use extract::{ContentExtractor, ExtractConfig, extract_text};
pub use fetch::{FetchError, HttpPageFetcher, PageFetcher};
pub use search::{
    QueryDispatcher, SearchError, SearchProvider, SearchRequest, StaticSearch, build_site_query,
};
