pub mod executor;
pub mod planner;

pub use executor::{search, FileMatch, LineMatch, SearchRequest, SearchResults};
pub use planner::SearchPlan;
