//! # overseer-client
//!
//! HTTP client for the Solr Collections API status actions.
//!
//! Fetches `GET /solr/admin/collections?action=<Status>&wt=json` from a single
//! configured node with a bounded timeout and returns the reply as a
//! [`StatusDocument`](overseer_core::StatusDocument).

mod client;

pub use client::{fetch, status_url, StatusClient};
