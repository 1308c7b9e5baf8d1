//! Provider selection: pluggable routing strategies over the healthy
//! candidate set, plus model-name-based candidate narrowing

mod error;
mod filter;
mod strategy;

pub use error::RouteError;
pub use filter::ModelFilter;
pub use strategy::{Candidate, Strategy};
