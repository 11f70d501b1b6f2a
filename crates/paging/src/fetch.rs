//! Sequential page-chain traversal
//!
//! Each request's URL comes from the previous response, so pages are fetched
//! one at a time. The chain is assumed finite and forward-only; an upstream
//! that breaks that contract (a cycle, or an endless chain) is reported as
//! [`Error::PaginationViolation`] instead of being followed forever.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::page::next_reference;
use crate::transport::PageTransport;

/// Page count above which a chain is treated as runaway.
pub const DEFAULT_MAX_PAGES: usize = 1000;

#[derive(Clone)]
pub struct PaginatedFetcher {
    transport: Arc<dyn PageTransport>,
    max_pages: usize,
}

impl PaginatedFetcher {
    pub fn new(transport: Arc<dyn PageTransport>) -> Self {
        Self {
            transport,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Override the page bound. Zero is clamped to one.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Fetch a single non-paginated document.
    pub async fn fetch_one(&self, bearer: &str, url: &str) -> Result<Value> {
        self.transport.get_json(url, bearer).await
    }

    /// Fetch every page of a resource starting at `initial_url`.
    ///
    /// Returns raw page bodies in arrival order. Stops after the first page
    /// whose `next` reference is absent. Issues exactly one request per page.
    pub async fn fetch_all(&self, bearer: &str, initial_url: &str) -> Result<Vec<Value>> {
        let mut pages = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut next = Some(initial_url.to_string());

        while let Some(url) = next.take() {
            if seen.contains(&url) {
                warn!(url, pages = pages.len(), "pagination cycle detected");
                metrics::counter!("paging_violations_total", "kind" => "cycle").increment(1);
                return Err(Error::PaginationViolation(format!(
                    "next reference {url} was already fetched"
                )));
            }
            if pages.len() >= self.max_pages {
                warn!(
                    max_pages = self.max_pages,
                    "pagination chain exceeded page bound"
                );
                metrics::counter!("paging_violations_total", "kind" => "page_bound").increment(1);
                return Err(Error::PaginationViolation(format!(
                    "chain from {initial_url} exceeded {} pages",
                    self.max_pages
                )));
            }

            let page = self.transport.get_json(&url, bearer).await?;
            metrics::counter!("paging_pages_fetched_total").increment(1);

            next = next_reference(&page).map(str::to_string);
            debug!(
                index = pages.len(),
                url,
                has_next = next.is_some(),
                "fetched page"
            );
            seen.insert(url);
            pages.push(page);
        }

        Ok(pages)
    }
}
