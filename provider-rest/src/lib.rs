//! # REST Remote Collection Provider
//!
//! Reqwest-backed implementation of `store_traits::RemoteCollection`
//! against a generic keyed-document REST API:
//!
//! ```text
//! GET    /v1/principals/{principal}/collections/{collection}/documents
//! PATCH  /v1/principals/{principal}/collections/{collection}/documents/{key}
//! DELETE /v1/principals/{principal}/collections/{collection}/documents/{key}
//! ```
//!
//! Upserts are JSON merge-patches: fields absent from the payload are left
//! untouched server-side. Requests carry the bearer token of the current
//! session.

pub mod client;

pub use client::{RestCollectionClient, RestConfig};
