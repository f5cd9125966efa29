//! Remote barcode lookup: fetch candidate barcode values for a product code.
//! Two upstream body shapes are accepted:
//!   [ { "barcode": "...", "amount": 1.5 }, ... ]
//!   { "barcodes": [ { "id": 3, "barcode": "..." }, ... ] }

use std::time::Duration;

use reqwest::Url;
use serde_json::Value;
use thiserror::Error;

/// One candidate barcode for a product code.
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeOption {
    pub id: String,
    pub value: String,
    pub amount: Option<f64>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("No product found with this code")]
    NotFound,

    #[error("Unable to fetch product data. Please try again.")]
    Failed,
}

/// HTTP client for the product-code endpoint.
#[derive(Debug, Clone)]
pub struct LookupClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LookupClient {
    pub fn new(base_url: &str, timeout: Duration) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::Error::Config(format!("http client: {e}")))?;
        let base_url = Url::parse(base_url).map_err(|e| crate::Error::Config(format!("lookup base url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(crate::Error::Config(format!("lookup base url {base_url} cannot take a path")));
        }
        Ok(Self { http, base_url })
    }

    /// `<base_url>/<product_code>`, with the code as one encoded path segment.
    pub fn endpoint(&self, product_code: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(product_code.trim());
        }
        url
    }

    /// GET the candidates for `product_code`.
    pub async fn lookup(&self, product_code: &str) -> Result<Vec<BarcodeOption>, LookupError> {
        let url = self.endpoint(product_code);
        tracing::debug!("Looking up barcodes at {}", url);

        let resp = self.http.get(url).send().await.map_err(|e| {
            tracing::warn!("Lookup request failed: {}", e);
            LookupError::Failed
        })?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            tracing::warn!("Lookup body read failed: {}", e);
            LookupError::Failed
        })?;

        let result = interpret_response(status, &body);
        match &result {
            Ok(opts) => tracing::info!("Lookup {} returned {} barcode(s)", product_code, opts.len()),
            Err(e) => tracing::warn!("Lookup {} failed with status {}: {}", product_code, status, e),
        }
        result
    }
}

/// Map an upstream status + body to barcode options.
/// Bodies that are neither shape yield an empty list rather than an error.
pub fn interpret_response(status: u16, body: &str) -> Result<Vec<BarcodeOption>, LookupError> {
    if status == 404 {
        return Err(LookupError::NotFound);
    }
    if !(200..300).contains(&status) {
        return Err(LookupError::Failed);
    }
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return Ok(Vec::new());
    };

    let opts = match &json {
        Value::Array(records) => records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                Some(BarcodeOption {
                    id: i.to_string(),
                    value: barcode_of(r)?,
                    amount: r.get("amount").and_then(Value::as_f64),
                })
            })
            .collect(),
        Value::Object(map) => match map.get("barcodes") {
            Some(Value::Array(records)) => records
                .iter()
                .enumerate()
                .filter_map(|(i, r)| {
                    let id = match r.get("id") {
                        Some(Value::String(s)) => s.clone(),
                        Some(Value::Number(n)) => n.to_string(),
                        _ => i.to_string(),
                    };
                    Some(BarcodeOption {
                        id,
                        value: barcode_of(r)?,
                        amount: r.get("amount").and_then(Value::as_f64),
                    })
                })
                .collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    Ok(opts)
}

fn barcode_of(record: &Value) -> Option<String> {
    match record.get("barcode")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Selectable candidate list plus the last user-visible lookup message.
#[derive(Debug, Clone, Default)]
pub struct BarcodeChoices {
    options: Vec<BarcodeOption>,
    message: Option<String>,
}

impl BarcodeChoices {
    pub fn options(&self) -> &[BarcodeOption] {
        &self.options
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Replace the list wholesale, or clear it and keep the error message.
    pub fn apply(&mut self, result: Result<Vec<BarcodeOption>, LookupError>) {
        match result {
            Ok(opts) => {
                self.options = opts;
                self.message = None;
            }
            Err(e) => {
                self.options.clear();
                self.message = Some(e.to_string());
            }
        }
    }

    /// Run a lookup and apply it. An empty code clears the list without a request.
    pub async fn refresh(&mut self, client: &LookupClient, product_code: &str) {
        if product_code.trim().is_empty() {
            self.options.clear();
            self.message = None;
            return;
        }
        let result = client.lookup(product_code).await;
        self.apply(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_a_message() {
        let mut choices = BarcodeChoices::default();
        choices.apply(Ok(vec![BarcodeOption { id: "0".into(), value: "1".into(), amount: None }]));
        choices.apply(interpret_response(404, ""));
        assert!(choices.options().is_empty());
        assert_eq!(choices.message(), Some("No product found with this code"));
    }

    #[test]
    fn other_failures_are_generic() {
        assert_eq!(interpret_response(500, "[]"), Err(LookupError::Failed));
        assert_eq!(interpret_response(301, ""), Err(LookupError::Failed));
        let mut choices = BarcodeChoices::default();
        choices.apply(interpret_response(503, "oops"));
        assert!(choices.options().is_empty());
        assert_eq!(choices.message(), Some("Unable to fetch product data. Please try again."));
    }

    #[test]
    fn array_body_with_amounts() {
        let body = r#"[{"barcode":"2000001","amount":1.25},{"barcode":"2000002"}]"#;
        let opts = interpret_response(200, body).unwrap();
        assert_eq!(opts.len(), 2);
        assert_eq!(opts[0], BarcodeOption { id: "0".into(), value: "2000001".into(), amount: Some(1.25) });
        assert_eq!(opts[1].value, "2000002");
        assert_eq!(opts[1].amount, None);
    }

    #[test]
    fn object_body_keeps_upstream_order_and_ids() {
        let body = r#"{"barcodes":[{"id":9,"barcode":"B"},{"id":"x1","barcode":"A"},{"id":3}]}"#;
        let opts = interpret_response(200, body).unwrap();
        let got: Vec<_> = opts.iter().map(|o| (o.id.as_str(), o.value.as_str())).collect();
        assert_eq!(got, vec![("9", "B"), ("x1", "A")]);
    }

    #[test]
    fn malformed_bodies_give_empty_list() {
        for body in ["", "not json", "42", "\"str\"", "{}", r#"{"barcodes":"nope"}"#, "null"] {
            assert_eq!(interpret_response(200, body), Ok(Vec::new()), "body {body:?}");
        }
    }

    #[test]
    fn success_replaces_list_and_clears_message() {
        let mut choices = BarcodeChoices::default();
        choices.apply(Err(LookupError::NotFound));
        choices.apply(interpret_response(200, r#"[{"barcode":"1"}]"#));
        assert_eq!(choices.options().len(), 1);
        assert_eq!(choices.message(), None);
    }

    #[test]
    fn endpoint_encodes_code() {
        let client = LookupClient::new("http://localhost:8080/api/products/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint("AB 12/3").as_str(), "http://localhost:8080/api/products/AB%2012%2F3");
        let bare = LookupClient::new("http://localhost:8080/api/products", Duration::from_secs(1)).unwrap();
        assert_eq!(bare.endpoint(" 42 ").as_str(), "http://localhost:8080/api/products/42");
    }

    #[test]
    fn unusable_base_urls_are_config_errors() {
        for base in ["not a url", "mailto:shop@example.com"] {
            let err = LookupClient::new(base, Duration::from_secs(1)).unwrap_err();
            assert!(matches!(err, crate::Error::Config(_)), "{base}");
        }
    }

    // One-shot HTTP server answering every request with `status_line`.
    async fn serve_once(status_line: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let resp = format!("HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            sock.write_all(resp.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
        });
        format!("http://{addr}/api/products")
    }

    #[tokio::test]
    async fn http_404_reports_not_found() {
        let base = serve_once("404 Not Found").await;
        let client = LookupClient::new(&base, Duration::from_secs(5)).unwrap();
        assert_eq!(client.lookup("4006381333931").await, Err(LookupError::NotFound));

        let base = serve_once("404 Not Found").await;
        let client = LookupClient::new(&base, Duration::from_secs(5)).unwrap();
        let mut choices = BarcodeChoices::default();
        choices.refresh(&client, "4006381333931").await;
        assert!(choices.options().is_empty());
        assert_eq!(choices.message(), Some("No product found with this code"));
    }

    #[tokio::test]
    async fn http_500_reports_generic_failure() {
        let base = serve_once("500 Internal Server Error").await;
        let client = LookupClient::new(&base, Duration::from_secs(5)).unwrap();
        let mut choices = BarcodeChoices::default();
        choices.refresh(&client, "4006381333931").await;
        assert!(choices.options().is_empty());
        assert_eq!(choices.message(), Some("Unable to fetch product data. Please try again."));
    }

    #[tokio::test]
    async fn empty_code_skips_request() {
        let client = LookupClient::new("http://127.0.0.1:9", Duration::from_millis(50)).unwrap();
        let mut choices = BarcodeChoices::default();
        choices.apply(Err(LookupError::Failed));
        choices.refresh(&client, "  ").await;
        assert!(choices.options().is_empty());
        assert_eq!(choices.message(), None);
    }
}
