//! Remote spreadsheet service backend.
//!
//! Talks to a sheet service exposing whole-worksheet reads and writes:
//!
//! - `GET  {base}/worksheets/{name}` → `200` with a JSON [`Table`], or `404`
//! - `PUT  {base}/worksheets/{name}` with a JSON [`Table`] body
//!
//! Uses the blocking reqwest client. Construct and drop it outside async
//! contexts; the record store only calls it from the blocking pool.

use crate::storage::backend::{BackendError, SheetBackend};
use crate::storage::table::Table;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{StatusCode, Url};
use std::time::Duration;

/// Remote worksheet backend.
#[derive(Debug, Clone)]
pub struct HttpSheetBackend {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpSheetBackend {
    /// Create a backend for the service at `base_url`.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::Unavailable(format!("invalid base URL: {}", e)))?;

        if base_url.cannot_be_a_base() {
            return Err(BackendError::Unavailable(format!(
                "invalid base URL: {}",
                base_url
            )));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// URL of a worksheet resource.
    pub fn worksheet_url(&self, worksheet: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("worksheets").push(worksheet);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Map a response status onto the backend taxonomy.
///
/// `Ok(false)` means the worksheet does not exist.
pub fn classify_status(status: StatusCode) -> Result<bool, BackendError> {
    if status.is_success() {
        return Ok(true);
    }
    match status {
        StatusCode::NOT_FOUND => Ok(false),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BackendError::Unavailable(
            format!("authorization rejected ({})", status),
        )),
        _ => Err(BackendError::Unavailable(format!(
            "sheet service returned {}",
            status
        ))),
    }
}

impl SheetBackend for HttpSheetBackend {
    fn read(&self, worksheet: &str) -> Result<Option<Table>, BackendError> {
        let response = self
            .authorize(self.http.get(self.worksheet_url(worksheet)))
            .send()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        if !classify_status(response.status())? {
            return Ok(None);
        }

        response
            .json::<Table>()
            .map(Some)
            .map_err(|e| BackendError::Corrupt(e.to_string()))
    }

    fn write(&self, worksheet: &str, table: &Table) -> Result<(), BackendError> {
        let response = self
            .authorize(self.http.put(self.worksheet_url(worksheet)))
            .json(table)
            .send()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        match classify_status(response.status()) {
            Ok(true) => Ok(()),
            Ok(false) => Err(BackendError::Unavailable(format!(
                "worksheet '{}' rejected by sheet service",
                worksheet
            ))),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
