//! # argus-client
//!
//! Async client for the Argus time-series monitoring REST API.
//!
//! The crate is built around three pieces:
//!
//! - [`Session`]: login/logout and the access token every request carries.
//! - [`Collection`]: one uniform CRUD shape (`get`, `values`, `add`,
//!   `add_all`, `update`, `delete`) over namespaces, metrics, annotations,
//!   dashboards, users, alerts and the alerts' triggers and notifications.
//! - [`BatchResponse`]: the per-item outcome of a multi-item write, so one
//!   bad metric does not hide the ones that were stored.
//!
//! ## Quick Start
//!
//! ```ignore
//! use argus_client::{ClientConfig, Credentials, Metric, MetricQuery, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("http://localhost:8080/argusws");
//!     let session = Session::new(&config, Credentials::new("user", "secret"))?;
//!     session.login().await?;
//!
//!     let mut cpu = Metric::new("host.cpu", "idle").with_tag("host", "server1");
//!     cpu.add_datapoint(1_700_000_000_000, 97.5);
//!
//!     let response = session.metrics().add_all(vec![cpu]).await?;
//!     if response.error_count() > 0 {
//!         for message in response.error_messages() {
//!             eprintln!("rejected: {}", message);
//!         }
//!     }
//!
//!     let query = MetricQuery::builder("host.cpu", "idle", "avg")
//!         .tag("host", "server1")
//!         .start("-1h")
//!         .build()?;
//!     for series in session.metrics().query(&query).await? {
//!         println!("{}:{} {:?}", series.scope, series.metric, series.datapoints);
//!     }
//!
//!     session.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Session and transport failures abort a call. Item-level rejections in a
//! multi-item write are reported inside the [`BatchResponse`]; check
//! [`BatchResponse::error_count`] after every `add_all`.

pub mod alerts;
pub mod batch;
pub mod collection;
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod resource;
pub mod session;
pub mod transport;

// Re-export main types at crate root
pub use batch::{BatchResponse, ItemOutcome};
pub use collection::Collection;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use model::{
    Alert, Annotation, Audit, Dashboard, Metric, Namespace, Notification, Notifier, Trigger,
    TriggerType, User,
};
pub use query::{AnnotationQuery, MetricQuery, TimeSpec};
pub use resource::{Resource, ResourceKind};
pub use session::{Credentials, Session};
pub use transport::{HttpTransport, Request, Response, Transport};

// Re-export the HTTP method type used by `Request`
pub use reqwest::Method;
