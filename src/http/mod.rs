//! HTTP/1.1 protocol implementation.
//!
//! Serves GET requests for static files over keep-alive connections.
//!
//! # Architecture
//!
//! - **`line`**: Reads CRLF-terminated lines under a read deadline
//! - **`parser`**: Turns lines into a validated [`request::Request`] or a classified failure
//! - **`request`**: Request representation and header-name utilities
//! - **`response`**: Status codes, responses, and the OK/Not Found/Bad Request constructors
//! - **`writer`**: Serializes responses, streaming the body from disk
//! - **`connection`**: The per-connection state machine
//! - **`mime`**: MIME type detection based on file extensions
//! - **`date`**: HTTP date formatting
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────┐
//!        │ AwaitRequest │ ← Arm read deadline, parse next request
//!        └──────┬───────┘
//!               ├─ EOF / idle timeout / I/O error → Closed
//!               ├─ Malformed or stalled request ──┐
//!               │ Request parsed                   │
//!               ▼                                  │
//!        ┌──────────────┐                          │
//!        │   Dispatch   │ ← Resolve file, build    │
//!        └──────┬───────┘   200 or 404             │
//!               ▼                                  ▼
//!        ┌──────────────┐                  ┌──────────────┐
//!        │   Respond    │                  │ Respond(400) │
//!        └──────┬───────┘                  └──────┬───────┘
//!               ├─ Keep-Alive → AwaitRequest      │
//!               └─ Connection: close → Closed ◄───┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lantern::http::connection::{Connection, ServerContext};
//! use lantern::static_files::FileResolver;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = Arc::new(ServerContext::new(
//!         FileResolver::new("www")?,
//!         std::time::Duration::from_secs(5),
//!     ));
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let ctx = ctx.clone();
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, ctx);
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod date;
pub mod line;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
