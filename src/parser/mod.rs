pub mod detail;
pub mod listing;

pub use detail::parse_level;
pub use listing::{ListingPage, ListingParser};
