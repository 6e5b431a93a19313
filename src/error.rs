use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Chart spec is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid chart artifact: {0}")]
    Artifact(String),

    #[error("Chart data exceeds {limit}-row limit ({rows} rows); summarize or aggregate first")]
    TooManyRows { rows: usize, limit: usize },

    #[error("Failed to fetch boundaries from {url}: {reason}")]
    BoundaryFetch { url: String, reason: String },

    #[error("Boundary geometry from {url} is not a feature collection")]
    BoundaryFormat {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ChartError>;
