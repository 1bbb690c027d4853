//! Unit test modules.

mod entry_builder_test;
