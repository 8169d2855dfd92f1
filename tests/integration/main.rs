//! Integration tests

mod server_tests;
