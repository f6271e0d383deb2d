//! Blocking HTTP transport.
//!
//! Ingestors only need `GET url?query → (status, body)`, so that is the whole
//! trait. `HttpTransport` is the live implementation; tests swap in
//! `StaticTransport`, which replays canned responses.

#[cfg(test)]
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::DataError;

/// Status code and raw body of a GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn not_found() -> Self {
        Self::new(404, Vec::new())
    }

    /// Body of a successful, non-empty response; anything else is a retrieval failure.
    pub fn into_body(self, what: &str) -> Result<Vec<u8>, DataError> {
        match self.status {
            404 => Err(DataError::Retrieval(format!(
                "{what}: not found (404), check the request parameters"
            ))),
            200..=299 if self.body.iter().all(u8::is_ascii_whitespace) => {
                Err(DataError::Retrieval(format!("{what}: empty response body")))
            }
            200..=299 => Ok(self.body),
            status => Err(DataError::Retrieval(format!("{what}: request failed with status {status}"))),
        }
    }
}

pub trait Transport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<RawResponse, DataError>;
}

impl<T: Transport + ?Sized> Transport for Rc<T> {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<RawResponse, DataError> {
        (**self).get(url, query)
    }
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Retrieval(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<RawResponse, DataError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| DataError::Retrieval(format!("GET {url} failed: {e}")))?;

        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .map_err(|e| DataError::Retrieval(format!("failed to read response from {url}: {e}")))?;

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
struct Route {
    url: String,
    param: Option<(String, String)>,
    response: RawResponse,
}

/// Canned responses keyed by URL and, optionally, a query parameter.
///
/// A route with a parameter matches when the request carries that key and its
/// value contains the given text. Unmatched requests get a 404. Every request is
/// recorded as `url` plus its `key=value` pairs.
#[cfg(test)]
#[derive(Default)]
pub struct StaticTransport {
    routes: Vec<Route>,
    requests: RefCell<Vec<String>>,
}

#[cfg(test)]
impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, response: RawResponse) -> Self {
        self.routes.push(Route {
            url: url.to_string(),
            param: None,
            response,
        });
        self
    }

    pub fn route_with_param(mut self, url: &str, key: &str, contains: &str, response: RawResponse) -> Self {
        self.routes.push(Route {
            url: url.to_string(),
            param: Some((key.to_string(), contains.to_string())),
            response,
        });
        self
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

#[cfg(test)]
impl Transport for StaticTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<RawResponse, DataError> {
        let mut line = url.to_string();
        for (k, v) in query {
            line.push_str(&format!(" {k}={v}"));
        }
        self.requests.borrow_mut().push(line);

        let matched = self.routes.iter().find(|route| {
            route.url == url
                && match &route.param {
                    None => true,
                    Some((key, contains)) => query.iter().any(|(k, v)| k == key && v.contains(contains.as_str())),
                }
        });

        Ok(matched.map_or_else(RawResponse::not_found, |route| route.response.clone()))
    }
}
