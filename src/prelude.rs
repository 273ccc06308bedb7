//! One-stop imports for the common API surface.
//!
//! ```rust
//! use sql_cache_dal::prelude::*;
//! ```

pub use crate::backend::{
    Backend, BackendParams, BackendRead, BackendRegistry, DeleteOutcome, DeleteSpec, QuerySpec,
    SaveOperation, SaveOutcome, SaveSpec,
};
pub use crate::cache::{CacheLookup, CacheProvider, CacheStore, MemoryProvider};
pub use crate::config::{
    AliasRegistry, CacheBackend, CacheSettings, ConnectionParams, DalConfig, DalConfigBuilder,
};
pub use crate::dal::Dal;
pub use crate::error::DalError;
pub use crate::format::{Formatted, format_envelope};
pub use crate::results::{DbRow, ErrorDetail, ResultEnvelope, ResultSet};
pub use crate::statement::{StatementId, StatementState};
pub use crate::types::{
    BoundParam, CacheState, DatabaseType, QueryStatus, ResultFormat, RowValues, StatementKind,
};
