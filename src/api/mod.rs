//! Backend HTTP access.

pub mod http;

pub use http::HttpClient;
