//! Integration tests for the remote sheet backend against a local stub service.
//!
//! The blocking HTTP client is built and dropped outside the runtime, so
//! these are plain tests that drive the async store on a private runtime.

use std::future::Future;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trainlog::session::builder::{RawFields, SessionEntryBuilder};
use trainlog::session::types::Phase;
use trainlog::storage::backend::{BackendError, SheetBackend};
use trainlog::storage::http::HttpSheetBackend;
use trainlog::storage::record_store::{RecordStore, StoreError};
use trainlog::LogEntry;

/// Sheet service answering each connection with the next canned response.
struct StubService {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubService {
    fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}/api/", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        std::thread::spawn(move || {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let request = read_request(&mut stream);
                seen.lock().unwrap().push(request);

                let reason = match status {
                    200 => "OK",
                    404 => "Not Found",
                    _ => "Service Unavailable",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        Self { base_url, requests }
    }

    fn backend(&self, token: Option<&str>) -> HttpSheetBackend {
        HttpSheetBackend::new(
            &self.base_url,
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Request line, lowercased headers and body of one request.
fn read_request(stream: &mut TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();

    let mut headers = String::new();
    let mut content_length = 0;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        if line == "\r\n" || line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
        headers.push_str(&line.to_ascii_lowercase());
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).unwrap();
    format!(
        "{}{}{}",
        request_line,
        headers,
        String::from_utf8(body).unwrap()
    )
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn entry() -> LogEntry {
    SessionEntryBuilder::new()
        .build(RawFields::condition("김도영", Phase::Power, 7, 1, None))
        .unwrap()
}

#[test]
fn test_missing_worksheet_is_initialized_on_append() {
    let service = StubService::start(vec![(404, ""), (200, "")]);
    let backend: Arc<dyn SheetBackend> = Arc::new(service.backend(Some("secret")));
    let store = RecordStore::with_defaults(Arc::clone(&backend));

    block_on(store.append(&entry())).unwrap();

    let requests = service.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("GET /api/worksheets/Sheet1 "));
    assert!(requests[0].contains("authorization: bearer secret"));
    assert!(requests[1].starts_with("PUT /api/worksheets/Sheet1 "));
    assert!(requests[1].contains(r#""columns":["timestamp","player_id","phase""#));
    assert!(requests[1].contains("김도영"));
}

#[test]
fn test_undecodable_body_is_corrupt() {
    let service = StubService::start(vec![(200, "<html>maintenance</html>"), (200, "{\"rows\": 3}")]);
    let backend = service.backend(None);

    assert!(matches!(backend.read("Sheet1"), Err(BackendError::Corrupt(_))));

    let store = RecordStore::with_defaults(Arc::new(backend));
    assert!(matches!(
        block_on(store.read_all()),
        Err(StoreError::SchemaMismatch(_))
    ));
}

#[test]
fn test_server_error_on_read_aborts_append_without_put() {
    let service = StubService::start(vec![(503, ""), (200, "")]);
    let store = RecordStore::with_defaults(Arc::new(service.backend(None)));

    let err = block_on(store.append(&entry())).unwrap_err();
    assert!(matches!(err, StoreError::BackendUnavailable(_)));
    assert!(err.is_retryable());

    let requests = service.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("GET "));
}

#[test]
fn test_existing_worksheet_round_trip() {
    let sheet = r#"{"columns":["timestamp","player_id","phase","rpe","pain","note"],"rows":[["2025-01-03T18:02:11Z","양현종","Strength","5","0",""]]}"#;
    let service = StubService::start(vec![(200, sheet)]);
    let store = RecordStore::with_defaults(Arc::new(service.backend(None)));

    let rows = block_on(store.read_all()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].player_id, "양현종");
    assert_eq!(rows[0].rpe, Some(5));
}
