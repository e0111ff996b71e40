//! Integration tests for crawl-hot
//!
//! These tests drive full runs against a scripted automation channel and wiremock servers
//! standing in for both content APIs.

mod crawl_tests;
mod support;
