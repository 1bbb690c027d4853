//! Integration test modules.

mod http_backend_test;
mod record_store_test;
mod training_log_test;
