//! # Restkit
//!
//! Blocking HTTP implementation of [`declarative::Transport`].
//!
//! Requests carry `Authorization: token <token>` when a token is set, JSON
//! bodies, and a global timeout. Responses go through
//! [`declarative::transport::interpret_response`], so the status contract
//! is the same as for the mock transport used in tests.
//!
//! ```no_run
//! use declarative::{Request, Transport};
//! use restkit::{ClientConfig, HttpTransport};
//!
//! let transport = HttpTransport::new(
//!     ClientConfig::new("https://waldur.example.com").with_token("secret"),
//! );
//! let projects = transport.send(&Request::get("/api/projects/"))?;
//! println!("{}", projects.body);
//! # Ok::<(), declarative::Error>(())
//! ```

pub mod http;

pub use http::{ClientConfig, HttpTransport};
