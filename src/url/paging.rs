use crate::url::Site;
use crate::UrlError;
use url::Url;

/// Builds the URL of listing page `page` (1-based) for URL-template paging
///
/// Any existing `p` parameter is replaced; other parameters keep their order.
///
/// # Examples
///
/// ```
/// use shelf_sentiment::url::listing_page_url;
/// use url::Url;
///
/// let base = Url::parse("https://www.iherb.com/c/fish-oil?sr=2").unwrap();
/// assert_eq!(
///     listing_page_url(&base, 3).as_str(),
///     "https://www.iherb.com/c/fish-oil?sr=2&p=3"
/// );
/// ```
pub fn listing_page_url(base: &Url, page: u32) -> Url {
    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(k, _)| k != "p")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = base.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &retained {
            pairs.append_pair(k, v);
        }
        pairs.append_pair("p", &page.to_string());
    }
    url
}

/// Builds the URL of review page `page` (1-based) for a product
///
/// iHerb serves reviews under `/r/` instead of the product's `/pr/` path,
/// newest first with translations shown. Amazon reviews are read from the
/// product page itself, so only page 1 exists; later pages return `Ok(None)`.
pub fn review_page_url(site: Site, product_link: &str, page: u32) -> Result<Option<Url>, UrlError> {
    let mut url = Url::parse(product_link).map_err(|e| UrlError::Parse(e.to_string()))?;

    match site {
        Site::Amazon => {
            if page > 1 {
                return Ok(None);
            }
            Ok(Some(url))
        }
        Site::Iherb => {
            let path = url.path().to_string();
            if let Some(rest) = path.strip_prefix("/pr/") {
                url.set_path(&format!("/r/{}", rest));
            }
            url.set_query(Some(&format!("sort=6&isshowtranslated=true&p={}", page)));
            Ok(Some(url))
        }
    }
}
