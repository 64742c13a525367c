//! HTTP implementations of the saga collaborators, talking to the sibling
//! cart and products services.

mod cart;
mod products;

pub use cart::HttpCartStore;
pub use products::HttpStockLedger;

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Deserialize;

/// Base URL and credentials of one sibling service.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl ServiceEndpoint {
    /// Creates an endpoint rooted at `base_url`.
    ///
    /// Timeouts are taken from `client`.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            auth_token: None,
        }
    }

    /// Attaches a bearer token to every request sent to this endpoint.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Returns the base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a request to the base URL extended by `segments`.
    ///
    /// Each segment is percent-encoded, so ids cannot escape their position
    /// in the path.
    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = match self.url(segments) {
            Some(url) => self.client.request(method, url),
            // Reported by reqwest as a builder error on send.
            None => self.client.request(method, self.base_url.as_str()),
        };
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn url(&self, segments: &[&str]) -> Option<Url> {
        let mut url = Url::parse(&self.base_url).ok()?;
        url.path_segments_mut().ok()?.pop_if_empty().extend(segments);
        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(base_url: &str) -> ServiceEndpoint {
        ServiceEndpoint::new(Client::new(), base_url)
    }

    #[test]
    fn test_url_appends_segments_to_base_path() {
        let url = endpoint("http://cart:3002/").url(&["api", "cart", "u1"]).unwrap();
        assert_eq!(url.as_str(), "http://cart:3002/api/cart/u1");

        let url = endpoint("http://gateway/cart").url(&["api", "cart", "u1"]).unwrap();
        assert_eq!(url.as_str(), "http://gateway/cart/api/cart/u1");
    }

    #[test]
    fn test_url_encodes_reserved_characters_in_segments() {
        let url = endpoint("http://products:3001")
            .url(&["api", "products", "a/b?c#d"])
            .unwrap();
        assert_eq!(url.path(), "/api/products/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_url_rejects_unparseable_base() {
        assert!(endpoint("not a url").url(&["api"]).is_none());
    }
}

/// Response envelope shared by the sibling services.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Option<T> {
        if self.success { self.data } else { None }
    }
}
