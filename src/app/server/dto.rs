//! Http specific DTOs.

use crate::core::model::record::{GetResult, Include, Metadata};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Preview of the first records of a collection.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(super) struct SampleResponse {
    pub ids: Vec<String>,

    pub documents: Option<Vec<Option<String>>>,

    pub uris: Option<Vec<Option<String>>>,

    #[schema(value_type = Option<Vec<Object>>)]
    pub data: Option<Vec<Option<serde_json::Value>>>,

    #[schema(value_type = Option<Vec<Object>>)]
    pub metadatas: Option<Vec<Option<Metadata>>>,

    pub included: Vec<Include>,
}

impl From<GetResult> for SampleResponse {
    fn from(value: GetResult) -> Self {
        let GetResult {
            ids,
            documents,
            metadatas,
            uris,
            data,
            included,
            ..
        } = value;
        Self {
            ids,
            documents,
            uris,
            data,
            metadatas,
            included,
        }
    }
}
