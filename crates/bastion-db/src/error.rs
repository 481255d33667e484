/// Errors raised by a [`crate::DbBackend`].
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The backend rejected the query (connection failure, syntax error
    /// once it reaches the real engine, etc).
    #[error("query failed: {0}")]
    Query(String),
    /// `getItem` found no row for the given id.
    #[error("item not found: table {table:?} id {id:?}")]
    NotFound {
        /// Table that was queried.
        table: String,
        /// Id that was looked up.
        id: String,
    },
}

/// Convenience alias for [`DbError`]-returning results.
pub type DbResult<T> = Result<T, DbError>;
