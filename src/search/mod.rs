//! Ad-hoc search: query-string predicates parsed into a filter expression.

pub mod parser;
mod predicate;

pub use parser::{is_search, parse, SEARCH_MARKER};
pub use predicate::{FilterExpression, Operator, Predicate};
