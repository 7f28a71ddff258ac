//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → remote::ServiceRegistry + observability
//! ```
//!
//! # Design Decisions
//! - All fields have defaults; running without a file is supported
//! - API keys never live in the file, only the names of env vars holding them
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AppConfig;
pub use schema::AuthConfig;
pub use schema::ObservabilityConfig;
pub use schema::ServiceConfig;
