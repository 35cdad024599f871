//! # Declarative
//!
//! Declarative reconciliation of resources managed through a REST/JSON API.
//!
//! Given a resource type and the desired parameters of one resource, the
//! crate finds the resource on the backend, computes the operations that
//! would converge it, and (unless asked only to check) executes them,
//! waiting for asynchronous backend tasks where needed.
//!
//! ## Core Concepts
//!
//! - **Resolver**: turns human references (names, UUIDs, locators) into
//!   backend locators, with dependency filters and a per-run cache
//! - **Normalizer**: canonical forms for order- and noise-insensitive
//!   comparison of collections
//! - **Operation** / **Plan**: one write request with its diff fragment and
//!   optional wait; the ordered operations for one resource
//! - **Driver**: per-resource-type plan building ([`CrudDriver`],
//!   [`OrderDriver`])
//! - **Reconciler**: existence check, planning, check mode, execution and
//!   result reporting
//!
//! ## Example
//!
//! ```
//! use declarative::{
//!     CreateConfig, CrudConfig, CrudDriver, DeleteConfig, Desired, DriverConfig,
//!     Method, MockTransport, ReconcileOptions, Reconciler,
//! };
//! use serde_json::json;
//!
//! let mock = MockTransport::new("https://api.example.com");
//! mock.respond(Method::Get, "/api/projects/", 200, json!([]));
//! mock.respond(Method::Post, "/api/projects/", 201, json!({"uuid": "p1", "name": "alpha"}));
//!
//! let mut create = CreateConfig::new("/api/projects/");
//! create.fields = vec!["name".to_string()];
//! let driver = CrudDriver::new(CrudConfig {
//!     driver: DriverConfig::new("project", "/api/projects/"),
//!     create,
//!     delete: DeleteConfig::default(),
//! })?;
//!
//! let params = json!({"name": "alpha"}).as_object().cloned().unwrap_or_default();
//! let report = Reconciler::new(&mock, &driver, ReconcileOptions::default())
//!     .reconcile_simple(&Desired::present(params))?;
//! assert!(report.changed);
//! # Ok::<(), declarative::Error>(())
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`Transport`]: sends requests to the backend ([`MockTransport`] for tests)
//! - [`Driver`]: builds plans for one resource type
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on a
//! specific HTTP client or terminal UI.

pub mod batch;
pub mod context;
pub mod diff;
pub mod driver;
pub mod error;
pub mod normalize;
pub mod operation;
pub mod plan;
pub mod reconcile;
pub mod resolver;
pub mod transport;
pub mod types;
pub mod value;
pub mod wait;

// Re-export main types at crate root
pub use batch::{Job, JobResult, reconcile_batch};
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, LogProgress, NoProgress, ProgressCallback};
pub use diff::{Change, DiffFragment, DiffSummary};
pub use driver::{
    ActionSpec, CreateConfig, CrudConfig, CrudDriver, DeleteConfig, Driver, DriverConfig,
    DriverSpec, ExistencePolicy, NAME_PARAM, OrderConfig, OrderDriver, RunContext, TerminationConfig,
    Transformation, UpdateConfig,
};
pub use error::{Error, ErrorCategory, Result};
pub use normalize::{Normalized, normalize};
pub use operation::{MergePolicy, Operation, RequestSummary};
pub use plan::Plan;
pub use reconcile::Reconciler;
pub use resolver::{FilterRule, OutputFormat, Resolver, ResolverConfig};
pub use transport::{Method, MockTransport, Query, Request, Response, Transport};
pub use types::{Desired, DesiredState, Mode, ReconcileOptions, Report};
pub use value::Params;
pub use wait::{PollOptions, WaitConfig};
