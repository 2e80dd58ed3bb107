//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PaginationState`: Tracks a listing walk (loading, products found, and
//!   the terminal empty / blocked / no-more-pages / done states)

mod pagination_state;

pub use pagination_state::PaginationState;
