use crate::UrlError;
use url::Url;

/// Query parameters that never change which resource is served
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
];

/// Normalizes a parsed URL in place so equal resources compare equal
///
/// # Normalization Steps
///
/// 1. Reject anything that is not HTTP or HTTPS
/// 2. Reject URLs without a host
/// 3. Remove the fragment
/// 4. Remove tracking query parameters, sort the rest, drop an empty `?`
///
/// Host lowercasing and dot-segment removal are already done by the `url`
/// parser. Trailing slashes are significant on listing and detail paths and
/// are left untouched.
pub fn normalize(url: &mut Url) -> Result<(), UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(())
}

/// Parses and normalizes an absolute URL string
///
/// # Examples
///
/// ```
/// use quote_harvest::url::normalize_url;
///
/// let url = normalize_url("https://Quotes.Example.com/page/2/#top").unwrap();
/// assert_eq!(url.as_str(), "https://quotes.example.com/page/2/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize(&mut url)?;
    Ok(url)
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
