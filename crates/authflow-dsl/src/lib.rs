//! # Authflow DSL
//!
//! Flows are authored as YAML documents, one per flow or bundled per realm.
//! This crate parses those documents, validates them against a step
//! registry and produces deployable [`Flow`](authflow_core::Flow) values.
//!
//! ## Example
//!
//! ```yaml
//! tenant: acme
//! realm: customers
//! flows:
//!   - name: login
//!     route: /login
//!     start: init
//!     nodes:
//!       init:
//!         use: init
//!         next: { start: credentials }
//!       credentials:
//!         use: askUsernamePassword
//!         next: { submitted: check }
//!       check:
//!         use: validateUsernamePassword
//!         next: { success: done, fail: credentials, locked: denied }
//!       done:
//!         use: successResult
//!       denied:
//!         use: failureResult
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod loader;
mod parser;

pub mod document;

pub use document::{FlowDocument, NodeDocument, RealmDocument};
pub use error::DslError;
pub use loader::{load_flow, load_realm, load_realm_document, load_realms_dir};
pub use parser::{parse_flow_document, parse_realm_document};

/// Error codes raised by document loading, in addition to the graph rule
/// codes of [`authflow_core::error_codes`]
pub mod error_codes {
    /// Node configuration value is not a scalar
    pub const INVALID_CONFIG: &str = "ERR_DSL_INVALID_CONFIG";

    /// Two flows in a realm share a name
    pub const DUPLICATE_FLOW: &str = "ERR_DSL_DUPLICATE_FLOW";

    /// Two flows in a realm share a route
    pub const DUPLICATE_ROUTE: &str = "ERR_DSL_DUPLICATE_ROUTE";
}

/// Returns a version string for the Authflow DSL crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
