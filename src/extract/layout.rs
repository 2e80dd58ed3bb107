//! Per-site selector tables
//!
//! Everything site-specific about the markup lives here. The extraction code
//! in `listing` and `reviews` is shared and only ever sees a compiled
//! `SiteLayout`.

use crate::extract::fields::{compile_selector, Field, FieldRule, FieldSpec, Source, Transform};
use crate::url::Site;
use crate::ShelfError;
use scraper::Selector;

const AMAZON_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: Field::Id,
        selector: None,
        source: Source::Attr("data-asin"),
        transform: Transform::Identity,
    },
    FieldSpec {
        field: Field::Name,
        selector: Some("h2"),
        source: Source::Text,
        transform: Transform::Identity,
    },
    FieldSpec {
        field: Field::PriceWhole,
        selector: Some("span.a-price-whole"),
        source: Source::Text,
        transform: Transform::Identity,
    },
    FieldSpec {
        field: Field::PriceFraction,
        selector: Some("span.a-price-fraction"),
        source: Source::Text,
        transform: Transform::Identity,
    },
    FieldSpec {
        field: Field::Rating,
        selector: Some("span.a-icon-alt"),
        source: Source::Text,
        transform: Transform::Identity,
    },
    FieldSpec {
        field: Field::Link,
        selector: Some("a.a-link-normal.s-no-outline"),
        source: Source::Attr("href"),
        transform: Transform::Identity,
    },
];

const IHERB_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: Field::Id,
        selector: Some("div.product.ga-product"),
        source: Source::Attr("id"),
        transform: Transform::StripPrefix("pid_"),
    },
    FieldSpec {
        field: Field::Name,
        selector: Some("a.absolute-link.product-link"),
        source: Source::Attr("title"),
        transform: Transform::Identity,
    },
    FieldSpec {
        field: Field::Link,
        selector: Some("a.absolute-link.product-link"),
        source: Source::Attr("href"),
        transform: Transform::Identity,
    },
    FieldSpec {
        field: Field::Rating,
        selector: Some("a.stars.scroll-to"),
        source: Source::Attr("title"),
        transform: Transform::BeforeSeparator(" - "),
    },
    FieldSpec {
        field: Field::Price,
        selector: Some("span.price bdi"),
        source: Source::Text,
        transform: Transform::Identity,
    },
];

/// A selector kept alongside its source text
///
/// Live sessions take CSS strings, while snapshot extraction needs the
/// compiled form.
#[derive(Debug, Clone)]
pub struct Css {
    pub raw: &'static str,
    pub selector: Selector,
}

impl Css {
    fn compile(raw: &'static str) -> Result<Self, ShelfError> {
        Ok(Self {
            raw,
            selector: compile_selector(raw)?,
        })
    }

    fn compile_opt(raw: Option<&'static str>) -> Result<Option<Self>, ShelfError> {
        raw.map(Self::compile).transpose()
    }
}

/// How a review's star count is read
#[derive(Debug, Clone)]
pub enum StarSource {
    /// Number of matching nodes (filled star icons)
    CountMatches(Selector),
    /// Leading number of the first matching node's text ("5.0 out of 5 stars")
    LeadingNumber(Selector),
}

/// Listing page selectors
#[derive(Debug, Clone)]
pub struct ListingLayout {
    pub container: Css,
    pub item: Selector,
    pub rules: Vec<FieldRule>,
    /// Next-page controls in priority order; empty for URL-template paging
    pub next_page: Vec<Selector>,
}

/// Review page selectors
#[derive(Debug, Clone)]
pub struct ReviewLayout {
    /// Waited for after navigation
    pub container: Css,
    pub block: Css,
    /// Review text candidates in priority order (expanded text first)
    pub text: Vec<Selector>,
    pub date: Option<Selector>,
    pub stars: Option<StarSource>,
    /// "Read more" control inside a block
    pub expand: Option<Css>,
    /// Anti-automation overlay that swallows clicks
    pub overlay: Option<Css>,
    /// Cap on blocks read from one page
    pub limit: Option<usize>,
}

/// All selectors for one site, compiled once per run
#[derive(Debug, Clone)]
pub struct SiteLayout {
    pub site: Site,
    pub listing: ListingLayout,
    pub reviews: ReviewLayout,
    /// Body substrings identifying a full-page anti-automation challenge
    pub block_markers: Vec<String>,
}

impl SiteLayout {
    /// Compiles the layout for a site
    ///
    /// `max_reviews` caps the number of review blocks read from an Amazon
    /// product page; iHerb review pages are read in full.
    pub fn for_site(site: Site, max_reviews: usize) -> Result<Self, ShelfError> {
        match site {
            Site::Amazon => Self::amazon(max_reviews),
            Site::Iherb => Self::iherb(),
        }
    }

    fn amazon(max_reviews: usize) -> Result<Self, ShelfError> {
        Ok(Self {
            site: Site::Amazon,
            listing: ListingLayout {
                container: Css::compile("div.s-main-slot")?,
                item: compile_selector(r#"div[data-component-type="s-search-result"]"#)?,
                rules: compile_rules(AMAZON_FIELDS)?,
                next_page: vec![
                    compile_selector(r#"a[aria-label*="Next"]"#)?,
                    compile_selector("li.a-last a")?,
                    compile_selector("a.s-pagination-next")?,
                ],
            },
            reviews: ReviewLayout {
                container: Css::compile(r#"div[data-hook="review"]"#)?,
                block: Css::compile(r#"div[data-hook="review"]"#)?,
                text: vec![compile_selector(r#"span[data-hook="review-body"]"#)?],
                date: Some(compile_selector(r#"span[data-hook="review-date"]"#)?),
                stars: Some(StarSource::LeadingNumber(compile_selector(
                    r#"i[data-hook="review-star-rating"] span.a-icon-alt, i[data-hook="cmps-review-star-rating"] span.a-icon-alt"#,
                )?)),
                expand: None,
                overlay: None,
                limit: Some(max_reviews),
            },
            block_markers: vec!["Enter the characters you see below".to_string()],
        })
    }

    fn iherb() -> Result<Self, ShelfError> {
        Ok(Self {
            site: Site::Iherb,
            listing: ListingLayout {
                container: Css::compile("#FilteredProducts")?,
                item: compile_selector("div.product-cell-container")?,
                rules: compile_rules(IHERB_FIELDS)?,
                next_page: Vec::new(),
            },
            reviews: ReviewLayout {
                container: Css::compile("#reviews")?,
                block: Css::compile("div#reviews div.MuiBox-root.css-1v71s4n")?,
                text: vec![
                    compile_selector("div.review-full-text")?,
                    compile_selector("span.__react-ellipsis-js-content")?,
                ],
                date: Some(compile_selector(
                    r#"span.MuiTypography-root.MuiTypography-body2.css-1fktd33, span[data-testid="review-posted-date"]"#,
                )?),
                stars: Some(StarSource::CountMatches(compile_selector(
                    r##"ul[data-testid="review-rating"] li svg path[fill="#FAC627"]"##,
                )?)),
                expand: Css::compile_opt(Some(
                    "span.MuiTypography-root.MuiTypography-body2.css-ptz5k",
                ))?,
                overlay: Css::compile_opt(Some("#px-captcha-wrapper"))?,
                limit: None,
            },
            block_markers: vec!["Access to this page has been denied".to_string()],
        })
    }

    /// Whether the site paginates listings by following a next-page control
    pub fn follows_next_control(&self) -> bool {
        !self.listing.next_page.is_empty()
    }
}

fn compile_rules(table: &[FieldSpec]) -> Result<Vec<FieldRule>, ShelfError> {
    table.iter().map(FieldRule::compile).collect()
}
