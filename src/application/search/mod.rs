//! Progressive recipe search: summary matching first, full documents only
//! when needed.

mod engine;
mod normalize;
mod query;

pub use engine::{MatchResult, search};
pub use normalize::normalize;
pub use query::{QUICK_MAX_TOTAL_MINUTES, SearchConstraints, extract_minutes, parse_query};
