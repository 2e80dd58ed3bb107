//! Markup extraction
//!
//! Pure functions that turn one page of markup into product records or
//! review entries. No I/O happens here; the crawler hands in markup it has
//! already fetched or snapshotted.
//!
//! # Components
//!
//! - `fields`: the declarative field table machinery
//! - `layout`: per-site selector tables compiled into a `SiteLayout`
//! - `listing`: listing pages into `ProductRecord`s
//! - `reviews`: review page snapshots into `ReviewEntry`s

mod fields;
mod layout;
mod listing;
mod reviews;

pub use fields::{extract_fields, Field, FieldRule, FieldSpec, FieldValues, Source, Transform};
pub use layout::{Css, ListingLayout, ReviewLayout, SiteLayout, StarSource};
pub use listing::{extract_products, parse_listing, ListingPage};
pub use reviews::{expandable_blocks, extract_review_page, overlay_present, parse_review_date};
