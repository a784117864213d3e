//! Query resolution engine.
//!
//! Three layers compose each query:
//! 1. [`local::LocalResolver`] - pass-through lookups into a single bundle
//! 2. [`moniker::MonikerResolver`] - cross-bundle symbol joins when no
//!    bundle contains an answer at the position itself
//! 3. [`query::QueryResolver`] - the orchestrator owning upload selection,
//!    first-success-wins ordering and translation back into the caller's
//!    commit

pub mod local;
pub mod moniker;
pub mod query;

pub use local::LocalResolver;
pub use moniker::{order_monikers, MonikerResolver, SchemePriority};
pub use query::{QueryResolver, ReferencePage};
