//! Lantern - static file server
//!
//! Serves files from a document root over HTTP/1.1 with keep-alive.

pub mod config;
pub mod http;
pub mod server;
pub mod static_files;
