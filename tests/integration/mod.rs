//! Integration tests with mock HTTP server

pub mod storage;
