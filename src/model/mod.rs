//! Core data types for queries and scan results.
//!
//! - [`Query`] - A search target and its inferred [`QueryType`]
//! - [`PartialResult`] - One module's outcome for one query
//! - [`Findings`] - Module-specific data inside a partial result
//! - [`ScanResult`] - All partial results of one scan
//!
//! # Example
//!
//! ```
//! use osintwatch::model::{Query, QueryType};
//!
//! let query = Query::parse("user@example.com").unwrap();
//! assert_eq!(query.query_type(), QueryType::Email);
//! ```

mod query;
mod result;

pub use query::*;
pub use result::*;
