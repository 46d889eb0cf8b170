// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use url::Url;

use crate::auth::Credentials;
use crate::error::LibraryError;
use crate::http::{ApiRequest, HttpClient};
use crate::progress::{ProgressEvent, SharedProgressReporter};

use super::parse::{Audiobook, parse_library_page};

/// Largest page the library endpoint hands out
pub const DEFAULT_PAGE_SIZE: usize = 1000;

const RESPONSE_GROUPS: &str = "contributors,product_desc,product_attrs";

/// Build the library listing URL for one page
pub fn library_url(domain: &str, page: usize, page_size: usize) -> Result<Url, LibraryError> {
    let url = Url::parse_with_params(
        &format!("https://api.audible.{}/1.0/library", domain),
        &[
            ("response_groups", RESPONSE_GROUPS.to_string()),
            ("num_results", page_size.to_string()),
            ("sort_by", "PurchaseDate".to_string()),
            ("page", page.to_string()),
        ],
    )?;
    Ok(url)
}

/// Fetch the whole library, page by page
///
/// Paging stops at the first page holding fewer than `page_size` items.
pub async fn fetch_library<C: HttpClient>(
    client: &C,
    credentials: &Credentials,
    page_size: usize,
    reporter: &SharedProgressReporter,
) -> Result<Vec<Audiobook>, LibraryError> {
    let domain = credentials.domain()?;
    let page_size = page_size.max(1);
    let mut books = Vec::new();

    for page in 1.. {
        reporter.report(ProgressEvent::FetchingLibrary { page });

        let url = library_url(domain, page, page_size)?;
        let request = credentials.authorize(ApiRequest::new(url.clone()));

        let response =
            client
                .get_bytes(&request)
                .await
                .map_err(|e| LibraryError::RequestFailed {
                    url: url.to_string(),
                    source: e,
                })?;

        if response.status >= 400 {
            return Err(LibraryError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        let page_books = parse_library_page(&response.body)?;
        let page_len = page_books.len();
        tracing::debug!(page, items = page_len, "library page received");
        books.extend(page_books);

        if page_len < page_size {
            break;
        }
    }

    reporter.report(ProgressEvent::LibraryFetched {
        total_books: books.len(),
    });

    Ok(books)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::http::{BodyResponse, HttpResponse, RedirectResponse};
    use crate::progress::NoopReporter;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    /// Serves `pages[n]` for `page=n+1`
    struct MockHttpClient {
        pages: Vec<String>,
        status: u16,
        requested: Mutex<Vec<Url>>,
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get_bytes(&self, request: &ApiRequest) -> Result<BodyResponse, reqwest::Error> {
            self.requested.lock().unwrap().push(request.url.clone());
            let page: usize = request
                .url
                .query_pairs()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse().ok())
                .unwrap();
            let body = self
                .pages
                .get(page - 1)
                .cloned()
                .unwrap_or_else(|| r#"{"items": []}"#.to_string());
            Ok(BodyResponse {
                status: self.status,
                body: Bytes::from(body),
            })
        }

        async fn get_location(
            &self,
            _request: &ApiRequest,
        ) -> Result<RedirectResponse, reqwest::Error> {
            unreachable!()
        }

        async fn post_form(
            &self,
            _url: &str,
            _form: &[(&str, &str)],
        ) -> Result<BodyResponse, reqwest::Error> {
            unreachable!()
        }

        async fn get_stream(&self, _url: &str) -> Result<HttpResponse, reqwest::Error> {
            unreachable!()
        }
    }

    fn page_of(asins: &[&str]) -> String {
        let items: Vec<_> = asins
            .iter()
            .map(|a| serde_json::json!({"asin": a, "title": format!("Title {}", a)}))
            .collect();
        serde_json::json!({ "items": items }).to_string()
    }

    fn credentials() -> Credentials {
        serde_json::from_str(r#"{"access_token": "tok", "locale_code": "us"}"#).unwrap()
    }

    #[test]
    fn library_url_carries_query() {
        let url = library_url("co.uk", 2, 1000).unwrap();
        assert_eq!(url.host_str(), Some("api.audible.co.uk"));
        assert_eq!(url.path(), "/1.0/library");
        let query: Vec<_> = url.query_pairs().collect();
        assert!(query.iter().any(|(k, v)| k == "sort_by" && v == "PurchaseDate"));
        assert!(query.iter().any(|(k, v)| k == "page" && v == "2"));
        assert!(
            query
                .iter()
                .any(|(k, v)| k == "response_groups" && v == RESPONSE_GROUPS)
        );
    }

    #[tokio::test]
    async fn follows_pages_until_short_page() {
        let client = MockHttpClient {
            pages: vec![page_of(&["A1", "A2"]), page_of(&["A3", "A4"]), page_of(&["A5"])],
            status: 200,
            requested: Mutex::new(Vec::new()),
        };

        let books = fetch_library(&client, &credentials(), 2, &NoopReporter::shared())
            .await
            .unwrap();

        let asins: Vec<_> = books.iter().map(|b| b.asin.as_str()).collect();
        assert_eq!(asins, vec!["A1", "A2", "A3", "A4", "A5"]);
        assert_eq!(client.requested.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn exact_multiple_fetches_one_empty_page() {
        let client = MockHttpClient {
            pages: vec![page_of(&["A1", "A2"])],
            status: 200,
            requested: Mutex::new(Vec::new()),
        };

        let books = fetch_library(&client, &credentials(), 2, &NoopReporter::shared())
            .await
            .unwrap();

        assert_eq!(books.len(), 2);
        assert_eq!(client.requested.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn http_error_fails_listing() {
        let client = MockHttpClient {
            pages: vec![],
            status: 401,
            requested: Mutex::new(Vec::new()),
        };

        let result = fetch_library(&client, &credentials(), 10, &NoopReporter::shared()).await;
        assert!(matches!(
            result,
            Err(LibraryError::HttpStatus { status: 401, .. })
        ));
    }
}
