use bb8_postgres::tokio_postgres;
use bb8_postgres::tokio_postgres::error::SqlState;

pub mod postgres_repo;
pub mod property_query;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("failed to retrieve a valid connection from postgres pool: {0}")]
    Pool(String),

    #[error("query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl RepoError {
    /// Unique violations become `Conflict`, everything else stays a query error.
    pub fn from_query(e: tokio_postgres::Error) -> Self {
        if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            let detail = e
                .as_db_error()
                .map(|db| db.message().to_string())
                .unwrap_or_else(|| e.to_string());
            return RepoError::Conflict(detail);
        }
        RepoError::Query(e)
    }
}

pub fn validate_limit(limit: i64) -> Result<i64, RepoError> {
    if limit <= 0 {
        return Err(RepoError::InvalidArgument(format!(
            "limit must be a positive number of rows, got {}",
            limit
        )));
    }
    Ok(limit)
}
