//! gpulens-state: snapshot store for GPU Lens.
//!
//! Backed by [redb](https://docs.rs/redb), holds the latest known state of
//! every GPU node in the cluster and the GPU pods scheduled onto them. The
//! diagnostic engine reads these records through its snapshot provider
//! interface; nothing here knows about fragmentation or load scoring.
//!
//! # Architecture
//!
//! All records are JSON-serialized into redb's `&[u8]` value columns.
//! Pod keys are composite (`{node_name}:{namespace}/{pod_name}`) so that
//! every pod on a node can be found with a prefix scan.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
