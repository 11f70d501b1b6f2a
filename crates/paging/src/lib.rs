//! Paginated REST collection traversal
//!
//! Walks a chain of result pages linked by a `next` reference and flattens
//! them into one ordered collection. Split in two halves:
//!
//! - [`PaginatedFetcher`] does the I/O: one authenticated GET per page,
//!   strictly sequential, guarded against cycles and runaway chains
//! - [`assemble`] / [`assemble_items`] are pure: raw pages in, typed items out
//!
//! The transport is a trait so traversal logic can be tested without a server.

pub mod assemble;
pub mod error;
pub mod fetch;
pub mod page;
pub mod transport;

pub use assemble::{assemble, assemble_items};
pub use error::{Error, Result};
pub use fetch::{DEFAULT_MAX_PAGES, PaginatedFetcher};
pub use page::next_reference;
pub use transport::{HttpTransport, PageTransport};
