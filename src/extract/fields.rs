//! Declarative field extraction
//!
//! A site's listing layout is a table of `FieldSpec` rows: which field, where
//! to look relative to the listing item, whether to read text or an
//! attribute, and how to tidy the value. `extract_fields` walks the table
//! once per item. A missing node simply leaves the field unset.

use crate::ShelfError;
use scraper::{ElementRef, Selector};
use std::collections::HashMap;

/// Product fields a listing table can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    /// Price as one display string
    Price,
    /// Integer part of a split price (Amazon renders "19." and "99" separately)
    PriceWhole,
    PriceFraction,
    Rating,
    Link,
}

/// Where a field's value comes from once its node is found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Whitespace-collapsed text content
    Text,
    /// Value of the named attribute
    Attr(&'static str),
}

/// Cleanup applied to a raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Identity,
    /// Drop a fixed prefix ("pid_123" -> "123")
    StripPrefix(&'static str),
    /// Keep the part before a separator ("4.6/5 - 120 Reviews" -> "4.6/5")
    BeforeSeparator(&'static str),
}

/// One row of a site's field table
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    /// CSS selector relative to the item; `None` reads the item itself
    pub selector: Option<&'static str>,
    pub source: Source,
    pub transform: Transform,
}

/// A `FieldSpec` with its selector compiled
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: Field,
    selector: Option<Selector>,
    source: Source,
    transform: Transform,
}

impl FieldRule {
    pub fn compile(spec: &FieldSpec) -> Result<Self, ShelfError> {
        let selector = spec.selector.map(compile_selector).transpose()?;
        Ok(Self {
            field: spec.field,
            selector,
            source: spec.source,
            transform: spec.transform,
        })
    }

    fn read(&self, item: ElementRef<'_>) -> Option<String> {
        let node = match &self.selector {
            Some(selector) => item.select(selector).next()?,
            None => item,
        };

        let raw = match self.source {
            Source::Text => collapse_whitespace(&node.text().collect::<String>()),
            Source::Attr(name) => node.value().attr(name)?.trim().to_string(),
        };

        let value = match self.transform {
            Transform::Identity => raw,
            Transform::StripPrefix(prefix) => {
                raw.strip_prefix(prefix).unwrap_or(&raw).to_string()
            }
            Transform::BeforeSeparator(separator) => raw
                .split(separator)
                .next()
                .unwrap_or_default()
                .trim()
                .to_string(),
        };

        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Values found for one listing item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    values: HashMap<Field, String>,
}

impl FieldValues {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn take(&mut self, field: Field) -> Option<String> {
        self.values.remove(&field)
    }
}

/// Applies every rule in the table to one item
///
/// The first rule that yields a value for a field wins, so a table may list
/// fallbacks for the same field in priority order.
pub fn extract_fields(item: ElementRef<'_>, rules: &[FieldRule]) -> FieldValues {
    let mut values = HashMap::new();
    for rule in rules {
        if values.contains_key(&rule.field) {
            continue;
        }
        if let Some(value) = rule.read(item) {
            values.insert(rule.field, value);
        }
    }
    FieldValues { values }
}

pub(crate) fn compile_selector(css: &str) -> Result<Selector, ShelfError> {
    Selector::parse(css).map_err(|e| ShelfError::Selector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const TABLE: &[FieldSpec] = &[
        FieldSpec {
            field: Field::Id,
            selector: Some("div.product"),
            source: Source::Attr("id"),
            transform: Transform::StripPrefix("pid_"),
        },
        FieldSpec {
            field: Field::Name,
            selector: Some("h2"),
            source: Source::Text,
            transform: Transform::Identity,
        },
        FieldSpec {
            field: Field::Rating,
            selector: Some("a.stars"),
            source: Source::Attr("title"),
            transform: Transform::BeforeSeparator(" - "),
        },
        FieldSpec {
            field: Field::Price,
            selector: Some("span.sale"),
            source: Source::Text,
            transform: Transform::Identity,
        },
        FieldSpec {
            field: Field::Price,
            selector: Some("span.price"),
            source: Source::Text,
            transform: Transform::Identity,
        },
    ];

    fn rules() -> Vec<FieldRule> {
        TABLE.iter().map(|s| FieldRule::compile(s).unwrap()).collect()
    }

    fn first_item(html: &str) -> FieldValues {
        let doc = Html::parse_fragment(html);
        let item_sel = Selector::parse("div.item").unwrap();
        let item = doc.select(&item_sel).next().unwrap();
        extract_fields(item, &rules())
    }

    #[test]
    fn test_extracts_text_and_attributes() {
        let values = first_item(
            r#"<div class="item">
                <div class="product" id="pid_579"></div>
                <h2>  Omega-3
                    Fish Oil </h2>
                <a class="stars" title="4.7/5 - 1,234 Reviews"></a>
                <span class="price">$12.50</span>
            </div>"#,
        );

        assert_eq!(values.get(Field::Id), Some("579"));
        assert_eq!(values.get(Field::Name), Some("Omega-3 Fish Oil"));
        assert_eq!(values.get(Field::Rating), Some("4.7/5"));
        assert_eq!(values.get(Field::Price), Some("$12.50"));
    }

    #[test]
    fn test_missing_nodes_leave_fields_unset() {
        let values = first_item(r#"<div class="item"><h2>Only a name</h2></div>"#);
        assert_eq!(values.get(Field::Name), Some("Only a name"));
        assert_eq!(values.get(Field::Id), None);
        assert_eq!(values.get(Field::Rating), None);
        assert_eq!(values.get(Field::Price), None);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let values = first_item(
            r#"<div class="item"><span class="sale">$9.00</span><span class="price">$12.50</span></div>"#,
        );
        assert_eq!(values.get(Field::Price), Some("$9.00"));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let values = first_item(r#"<div class="item"><h2>   </h2></div>"#);
        assert_eq!(values.get(Field::Name), None);
    }

    #[test]
    fn test_item_itself_as_source() {
        let spec = FieldSpec {
            field: Field::Id,
            selector: None,
            source: Source::Attr("data-asin"),
            transform: Transform::Identity,
        };
        let rule = FieldRule::compile(&spec).unwrap();
        let doc = Html::parse_fragment(r#"<div class="item" data-asin="B0001"></div>"#);
        let item_sel = Selector::parse("div.item").unwrap();
        let item = doc.select(&item_sel).next().unwrap();
        assert_eq!(extract_fields(item, &[rule]).get(Field::Id), Some("B0001"));
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let spec = FieldSpec {
            field: Field::Name,
            selector: Some("h2[["),
            source: Source::Text,
            transform: Transform::Identity,
        };
        assert!(matches!(
            FieldRule::compile(&spec),
            Err(ShelfError::Selector { .. })
        ));
    }
}
