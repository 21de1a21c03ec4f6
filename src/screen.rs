pub mod dashboard;

use service::AdapterError;

#[derive(thiserror::Error, Debug, Clone)]
pub enum AppError {
    #[error("Fetch error: {0}")]
    Fetch(String),
    #[error("Dataset error: {0}")]
    Dataset(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Refinement error: {0}")]
    Refine(String),
}

impl AppError {
    pub fn dataset(err: AdapterError) -> Self {
        Self::Dataset(err.to_string())
    }

    pub fn query(err: AdapterError) -> Self {
        Self::Query(err.to_string())
    }

    pub fn refine(err: AdapterError) -> Self {
        Self::Refine(err.to_string())
    }

    pub fn fetch(err: AdapterError) -> Self {
        Self::Fetch(err.to_string())
    }
}
