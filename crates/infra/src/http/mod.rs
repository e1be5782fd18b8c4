//! HTTP transport shared by the catalog and credential clients

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
