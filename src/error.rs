use axum::extract::rejection::JsonRejection;
use qdrant_client::QdrantError;
use std::error::Error as _;
use thiserror::Error;
use tracing::error;
use validify::ValidationErrors;

pub mod http;

#[derive(Debug, Error)]
pub enum VecgateErr {
    #[error("Collection does not exist; {0}")]
    CollectionDoesNotExist(String),

    #[error("Entity already exists; {0}")]
    AlreadyExists(String),

    #[error("Duplicate record ID; {0}")]
    DuplicateId(String),

    #[error("Invalid collection configuration; {0}")]
    InvalidConfiguration(String),

    #[error("Invalid filter; {0}")]
    InvalidFilter(String),

    #[error("Invalid embedding; {0}")]
    InvalidEmbedding(String),

    #[error("Invalid records; {0}")]
    InvalidRecords(String),

    #[error("No documents found in query response")]
    NoDocuments,

    #[error("Validation; {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Json; {0}")]
    Json(#[from] JsonRejection),

    #[error("JSON error; {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Qdrant; {0}")]
    Qdrant(#[from] QdrantError),

    #[error("Store; {0}")]
    Store(String),
}

#[derive(Debug, Error)]
#[error("{error}")]
pub struct VecgateError {
    file: &'static str,
    line: u32,
    column: u32,
    pub error: VecgateErr,
}

impl VecgateError {
    pub fn new(file: &'static str, line: u32, column: u32, error: VecgateErr) -> VecgateError {
        VecgateError {
            file,
            line,
            column,
            error,
        }
    }

    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.column)
    }

    pub fn print(&self) {
        let location = self.location();

        error!("{location} | {self}");

        if self.error.source().is_some() {
            error!("Causes:");
        }

        let mut src = self.error.source();
        while let Some(source) = src {
            error!(" - {source}");
            src = source.source();
        }
    }
}

/// Lets `WithRejection` turn body extraction failures into our error type.
impl From<JsonRejection> for VecgateError {
    #[track_caller]
    fn from(rejection: JsonRejection) -> Self {
        let location = std::panic::Location::caller();
        VecgateError::new(
            location.file(),
            location.line(),
            location.column(),
            VecgateErr::Json(rejection),
        )
    }
}

#[macro_export]
macro_rules! err {
    ($ty:ident $(, $l:literal $(,)? $($args:expr),* )?) => {
        Err($crate::error::VecgateError::new(
            file!(),
            line!(),
            column!(),
            $crate::error::VecgateErr::$ty $( (format!($l, $( $args, )*)) )?,
        ))
    };
}

#[macro_export]
macro_rules! map_err {
    ($ex:expr) => {
        $ex.map_err(|e| $crate::error::VecgateError::new(file!(), line!(), column!(), e.into()))?
    };
}
