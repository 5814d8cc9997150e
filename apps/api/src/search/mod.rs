// Full-text search over content records, backed by Tantivy.
// The index lives on disk when INDEX_PATH is set and in RAM otherwise.

pub mod highlight;
pub mod index;
pub mod schema;

pub use index::{ContentIndex, IndexError, IndexQuery, DEFAULT_MAX_RESULTS};
