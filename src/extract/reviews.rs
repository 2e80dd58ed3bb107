//! Review page extraction

use crate::extract::fields::collapse_whitespace;
use crate::extract::layout::{SiteLayout, StarSource};
use crate::records::{ReviewEntry, NO_REVIEW_TEXT};
use chrono::NaiveDate;
use scraper::{ElementRef, Html};

const DATE_FORMATS: &[&str] = &["%b %d, %Y", "%B %d, %Y", "%d %B %Y"];

/// Extracts the review entries on a review page snapshot
///
/// Blocks beyond the layout's limit are ignored. A block with no text node
/// gets the "No Review Text" placeholder rather than being skipped.
pub fn extract_review_page(layout: &SiteLayout, markup: &str) -> Vec<ReviewEntry> {
    let document = Html::parse_document(markup);
    let reviews = &layout.reviews;

    review_blocks(layout, &document)
        .map(|block| {
            let text = reviews
                .text
                .iter()
                .find_map(|selector| {
                    block
                        .select(selector)
                        .map(|node| collapse_whitespace(&node.text().collect::<String>()))
                        .find(|text| !text.is_empty())
                })
                .unwrap_or_else(|| NO_REVIEW_TEXT.to_string());

            let posted_date = reviews.date.as_ref().and_then(|selector| {
                block
                    .select(selector)
                    .next()
                    .and_then(|node| parse_review_date(&node.text().collect::<String>()))
            });

            let star_count = reviews.stars.as_ref().and_then(|source| read_stars(block, source));

            ReviewEntry {
                text,
                posted_date,
                star_count,
            }
        })
        .collect()
}

/// Indices of review blocks carrying an expand ("read more") control
pub fn expandable_blocks(layout: &SiteLayout, markup: &str) -> Vec<usize> {
    let Some(expand) = &layout.reviews.expand else {
        return Vec::new();
    };

    let document = Html::parse_document(markup);
    review_blocks(layout, &document)
        .enumerate()
        .filter(|(_, block)| block.select(&expand.selector).next().is_some())
        .map(|(index, _)| index)
        .collect()
}

/// Whether an anti-automation overlay currently covers the page
pub fn overlay_present(layout: &SiteLayout, markup: &str) -> bool {
    match &layout.reviews.overlay {
        Some(overlay) => Html::parse_document(markup)
            .select(&overlay.selector)
            .next()
            .is_some(),
        None => false,
    }
}

fn review_blocks<'a>(
    layout: &'a SiteLayout,
    document: &'a Html,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let limit = layout.reviews.limit.unwrap_or(usize::MAX);
    document.select(&layout.reviews.block.selector).take(limit)
}

fn read_stars(block: ElementRef<'_>, source: &StarSource) -> Option<u8> {
    match source {
        StarSource::CountMatches(selector) => {
            let filled = block.select(selector).count().min(5);
            Some(filled as u8)
        }
        StarSource::LeadingNumber(selector) => {
            let text = block.select(selector).next()?.text().collect::<String>();
            let number: String = text
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            let value: f64 = number.parse().ok()?;
            if (0.0..=5.0).contains(&value) {
                Some(value.floor() as u8)
            } else {
                None
            }
        }
    }
}

/// Parses the date out of a review's date line
///
/// Handles "Posted on Mar 3, 2024" and "Reviewed in the United States on
/// March 3, 2024": the date is whatever follows the last " on ".
pub fn parse_review_date(text: &str) -> Option<NaiveDate> {
    let text = collapse_whitespace(text);
    let date_part = match text.rfind(" on ") {
        Some(pos) => &text[pos + 4..],
        None => text.strip_prefix("Posted ").unwrap_or(&text),
    };

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part.trim(), format).ok())
}
