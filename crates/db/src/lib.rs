//! Persistent contract database: a content-addressed store of on-chain
//! contracts, a small search-expression language over it, and the block-walk
//! synchronizer behind `--init-db`.

pub mod query;
pub mod storage;
pub mod sync;

pub use query::{Cmp, Constraint, Query};
pub use storage::{ContractStorage, Match};
pub use sync::sync;
