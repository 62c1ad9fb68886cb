//! OpenGIN Explorer - Wire Decoding and Entity Graph Exploration
//!
//! Client-side core for browsing the OpenGIN entity graph API. It turns the
//! API's protobuf-flavoured JSON into plain values, reshapes dataset values
//! into tables, and walks the category tree below an entity.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Consumers: CLI, UI layers, raw query console                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Explorer                                    │
//! │     category tree traversal, dataset table lookup               │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────┐  ┌───────────────────────────────┐
//! │  Wire decoder → Normalizer   │  │  Transport (reqwest + log)    │
//! └──────────────────────────────┘  └───────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use opengin_explorer::{CancellationHandle, Explorer, ExplorerConfig, HttpTransport};
//!
//! let config = ExplorerConfig::from_env()?;
//! let transport = Arc::new(HttpTransport::from_config(&config)?);
//! let explorer = Explorer::from_config(transport, &config);
//!
//! let (handle, signal) = CancellationHandle::new();
//! let result = explorer.explore("gov_01", &signal).await;
//! for category in &result.categories {
//!     println!("{} ({} children)", category.name, category.children.len());
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod explorer;
pub mod query;
pub mod table;
pub mod transport;
pub mod wire;

// Re-export main types
pub use cancel::{CancelSignal, CancellationHandle};
pub use config::{ChildRelationsConfig, ExplorerConfig};
pub use error::{ConfigError, QueryError, TransportError, TransportResult};
pub use explorer::{ExploreOptions, Explorer, GraphApi, RelationMatcher, TimeWindow};
pub use query::{build_request, execute_query, validate, QueryKind, QueryParams, RequestSpec};
pub use table::{extract_field_value, normalize_table};
pub use transport::{api_path, ApiCallLog, CallLog, HttpTransport, Method, Transport};
pub use wire::{decode, WireValue};

pub use opengin_types;
pub use opengin_types::{
    ApiResponse, AttributeTable, Direction, EntityInfo, ExploreResult, GraphNode, Kind, Relation,
    RelationMeta, TreeStats,
};
