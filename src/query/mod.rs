//! Queries over graph snapshots
//!
//! Role labels are node attributes, but [`FindQuery::with_role_label`] lets
//! callers select on them the way they would select on a node, e.g. every
//! Molecule labelled `Styrene-Like`.

mod find;
mod types;

pub use find::FindQuery;
pub use types::QueryResult;
