#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Query engine shared by every catalog list endpoint.
//!
//! Translates loosely-typed `key:value` filter tokens, `field:DIR` sort
//! tokens and offset pagination into a validated [`QueryPlan`], and wraps
//! results as a [`Page`] with a content-range descriptor.

pub mod error;
pub mod filter;
pub mod limits;
pub mod page;
pub mod pagination;
pub mod plan;
pub mod schema;
pub mod sort;
pub mod value;

pub use error::QueryError;
pub use filter::{FilterClause, FilterNode, FilterOp, FilterParam, parse_filters, parse_token};
pub use limits::QueryLimits;
pub use page::{ContentRange, Page};
pub use pagination::Pagination;
pub use plan::{ListRequest, QueryPlan};
pub use schema::{EntitySchema, FieldDef, FieldKind, Record};
pub use sort::{SortClause, SortDir, compare_records, parse_sorts};
pub use value::Value;
