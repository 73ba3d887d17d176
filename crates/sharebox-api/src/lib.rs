//! # sharebox-api
//!
//! HTTP API layer for Sharebox built on Axum.
//!
//! Provides the public share endpoints (downloads with byte ranges and
//! folder archives, resumable and batch uploads), the bearer-token admin
//! API, middleware (request logging, CORS, security headers), extractors,
//! DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod http;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use state::AppState;
