//! Test Converter Server library.
//!
//! Repository validation, scanning, model-backed test conversion and the
//! HTTP API that drives it.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
