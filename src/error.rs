use crate::data::model::Split;

// ---------------------------------------------------------------------------
// Library error type
// ---------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The dataset description is malformed or names an unknown class.
    #[error("invalid dataset description: {0}")]
    Configuration(String),

    /// A record's label does not index into the class vocabulary.
    #[error("{split} record has label {label}, outside the {size}-class vocabulary")]
    LabelOutOfRange { split: Split, label: i64, size: usize },

    #[error("parquet shard {0} has no '{1}' column")]
    MissingLabelColumn(String, String),

    #[error("null label in column '{0}'")]
    NullLabel(String),

    #[error("label column '{column}' has type {data_type}, expected an integer")]
    UnsupportedLabelType { column: String, data_type: String },

    #[error("label column '{column}' holds a value outside the i64 range: {source}")]
    LabelOverflow {
        column: String,
        source: arrow::error::ArrowError,
    },

    #[error("download failed: {0}")]
    Download(String),

    #[error("IoError : {0}")]
    Io(#[from] std::io::Error),

    #[error("JsonError : {0}")]
    Json(#[from] serde_json::Error),

    #[error("ParquetError : {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("ArrowError : {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("ApiError : {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),

    #[error("HttpError : {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
