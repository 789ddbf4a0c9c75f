//! tests/mod.rs
mod support;

mod handler_tests;
mod tracking_tests;
