use super::{VecgateErr, VecgateError};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// Detail sent for every lookup of a missing collection.
pub const COLLECTION_DOES_NOT_EXIST: &str = "collection does not exist";

impl VecgateError {
    pub fn status(&self) -> StatusCode {
        use StatusCode as SC;
        use VecgateErr as E;
        match self.error {
            E::Json(ref rejection) => rejection.status(),
            E::CollectionDoesNotExist(_)
            | E::AlreadyExists(_)
            | E::DuplicateId(_)
            | E::InvalidConfiguration(_)
            | E::InvalidFilter(_)
            | E::InvalidEmbedding(_)
            | E::InvalidRecords(_)
            | E::NoDocuments
            | E::Validation(_) => SC::UNPROCESSABLE_ENTITY,
            E::SerdeJson(_) | E::Qdrant(_) | E::Store(_) => SC::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response wrapper.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseError<T: Serialize> {
    error_type: ErrorType,
    detail: T,
}

impl<T> ResponseError<T>
where
    T: Serialize,
{
    pub fn new(error_type: ErrorType, detail: T) -> Self {
        Self { error_type, detail }
    }
}

#[derive(Debug, Serialize)]
enum ErrorType {
    Internal,
    Api,
}

impl<T> IntoResponse for ResponseError<T>
where
    T: Serialize,
{
    fn into_response(self) -> axum::response::Response {
        <Json<ResponseError<T>> as IntoResponse>::into_response(Json(self))
    }
}

impl IntoResponse for VecgateError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        self.print();

        use ErrorType as ET;
        use VecgateErr as VE;

        match self.error {
            VE::CollectionDoesNotExist(_) => (
                status,
                ResponseError::new(ET::Api, COLLECTION_DOES_NOT_EXIST.to_string()),
            )
                .into_response(),

            VE::Validation(errors) => (status, ResponseError::new(ET::Api, errors)).into_response(),

            VE::Json(rejection) => {
                (status, ResponseError::new(ET::Api, rejection.body_text())).into_response()
            }

            e @ VE::NoDocuments => {
                (status, ResponseError::new(ET::Api, e.to_string())).into_response()
            }

            VE::AlreadyExists(e)
            | VE::DuplicateId(e)
            | VE::InvalidConfiguration(e)
            | VE::InvalidFilter(e)
            | VE::InvalidEmbedding(e)
            | VE::InvalidRecords(e) => (status, ResponseError::new(ET::Api, e)).into_response(),

            e @ (VE::SerdeJson(_) | VE::Qdrant(_) | VE::Store(_)) => (
                status,
                ResponseError::new(ET::Internal, format!("Internal Server Error: {e}")),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err;

    fn status_of(result: Result<(), VecgateError>) -> StatusCode {
        result.unwrap_err().status()
    }

    #[test]
    fn client_errors_are_unprocessable() {
        assert_eq!(
            StatusCode::UNPROCESSABLE_ENTITY,
            status_of(err!(CollectionDoesNotExist, "foo"))
        );
        assert_eq!(
            StatusCode::UNPROCESSABLE_ENTITY,
            status_of(err!(AlreadyExists, "Collection '{}'", "foo"))
        );
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status_of(err!(NoDocuments)));
        assert_eq!(
            StatusCode::UNPROCESSABLE_ENTITY,
            status_of(err!(InvalidFilter, "unsupported operator"))
        );
    }

    #[test]
    fn store_failures_are_internal() {
        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_of(err!(Store, "connection reset"))
        );
    }

    #[test]
    fn error_records_location() {
        let error = err!(NoDocuments).map(|_: ()| ()).unwrap_err();
        assert!(error.location().starts_with(file!()));
    }
}
