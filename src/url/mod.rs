//! URL handling module for Quote-Harvest
//!
//! Every fetchable resource is addressed by a [`Reference`]: an absolute,
//! normalized URL. Two references are equal exactly when their normalized
//! strings are equal, which is what the detail cache and the pagination
//! revisit guard key on.

mod normalize;

pub use normalize::{normalize, normalize_url};

use crate::UrlError;
use serde::{Serialize, Serializer};
use std::fmt;
use url::Url;

/// An absolute, normalized URL identifying a listing or detail page
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference(Url);

impl Reference {
    /// Parses and normalizes an absolute URL
    pub fn parse(url: &str) -> Result<Self, UrlError> {
        normalize_url(url).map(Self)
    }

    /// Resolves a link found on this page against this page's URL
    ///
    /// # Examples
    ///
    /// ```
    /// use quote_harvest::Reference;
    ///
    /// let page = Reference::parse("https://quotes.example.com/page/1/").unwrap();
    /// let author = page.join("/author/Jane-Austen").unwrap();
    /// assert_eq!(author.as_str(), "https://quotes.example.com/author/Jane-Austen");
    /// ```
    pub fn join(&self, href: &str) -> Result<Self, UrlError> {
        let href = href.trim();
        if href.is_empty() {
            return Err(UrlError::Parse("empty link".to_string()));
        }

        let mut url = self
            .0
            .join(href)
            .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
        normalize(&mut url)?;
        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
