pub mod http;

pub use http::{AccessPolicy, HttpServer};
