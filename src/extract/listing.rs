//! Listing page extraction
//!
//! Turns one listing page into products plus the next-page href, using the
//! site's field table.

use crate::extract::fields::{extract_fields, Field, FieldValues};
use crate::extract::layout::SiteLayout;
use crate::records::ProductRecord;
use crate::url::resolve_href;
use scraper::Html;
use url::Url;

/// What one listing page yielded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    /// Whether the product container exists at all
    ///
    /// A well-formed page with zero items and a malformed page both yield no
    /// products; this tells them apart.
    pub container_present: bool,

    /// Products in page order
    pub products: Vec<ProductRecord>,

    /// Resolved href of the first next-page control found
    pub next_page: Option<String>,
}

/// Parses a listing page
///
/// Relative product links and the next-page href are resolved against
/// `base`, the URL the page was served from.
pub fn parse_listing(layout: &SiteLayout, markup: &str, base: &Url) -> ListingPage {
    let document = Html::parse_document(markup);
    let listing = &layout.listing;

    let Some(container) = document.select(&listing.container.selector).next() else {
        return ListingPage::default();
    };

    let products = container
        .select(&listing.item)
        .filter_map(|item| build_record(extract_fields(item, &listing.rules), base))
        .collect();

    let next_page = listing
        .next_page
        .iter()
        .find_map(|selector| {
            document
                .select(selector)
                .find_map(|control| control.value().attr("href"))
        })
        .and_then(|href| resolve_href(href, base));

    ListingPage {
        container_present: true,
        products,
        next_page,
    }
}

/// Extracts the products on a listing page
///
/// Returns an empty vector when the container is missing or holds no items.
pub fn extract_products(layout: &SiteLayout, markup: &str, base: &Url) -> Vec<ProductRecord> {
    parse_listing(layout, markup, base).products
}

fn build_record(mut values: FieldValues, base: &Url) -> Option<ProductRecord> {
    let link = values
        .take(Field::Link)
        .and_then(|href| resolve_href(&href, base));

    let price = values.take(Field::Price).or_else(|| {
        match (values.get(Field::PriceWhole), values.get(Field::PriceFraction)) {
            (Some(whole), Some(fraction)) => Some(format!("${}{}", whole, fraction)),
            _ => None,
        }
    });

    let id = match values.take(Field::Id).or_else(|| link.clone()) {
        Some(id) => id,
        None => {
            tracing::debug!("Dropping listing item with neither id nor link");
            return None;
        }
    };

    let name = values
        .take(Field::Name)
        .unwrap_or_else(|| crate::records::NO_PRODUCT_NAME.to_string());

    Some(ProductRecord::new(
        id,
        name,
        price,
        values.take(Field::Rating),
        link,
    ))
}
