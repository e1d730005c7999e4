//! HTTP/REST API layer for Skillpath.
//!
//! Axum-based REST API at `/api/v1/` with learner identity passed in the
//! `X-Learner-Id` header, envelope response format, and CORS support.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
