//! Network layer - the remote authentication API
//!
//! `AuthApi` is the seam the session talks through; `HttpAuthApi` is the
//! reqwest implementation used by the binary.

pub mod client;

pub use client::{create_client, AuthApi, HttpAuthApi};
