use crate::{
    app::{server::dto::SampleResponse, state::ServiceState},
    core::{
        model::collection::CollectionSummary,
        service::collection::dto::{AddEmbeddingPayload, CreateCollectionPayload, SearchPayload},
    },
    error::VecgateError,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;

/// JSON body whose extraction failures are reported like every other error.
type Body<T> = WithRejection<Json<T>, VecgateError>;

#[utoipa::path(
    post,
    path = "/create_collection",
    responses(
        (status = 200, description = "Collection created successfully", body = CollectionSummary),
        (status = 422, description = "Invalid name or configuration, or the collection already exists"),
        (status = 500, description = "Internal server error")
    ),
    request_body = CreateCollectionPayload
)]
pub(super) async fn create_collection(
    services: State<ServiceState>,
    WithRejection(Json(payload), _): Body<CreateCollectionPayload>,
) -> Result<Json<CollectionSummary>, VecgateError> {
    let collection = services.collection.create_collection(payload).await?;
    Ok(Json(collection.into()))
}

#[utoipa::path(
    delete,
    path = "/delete_collection/{collection_name}",
    responses(
        (status = 204, description = "Collection deleted successfully"),
        (status = 422, description = "Collection does not exist"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("collection_name" = String, Path, description = "Collection name")
    )
)]
pub(super) async fn delete_collection(
    services: State<ServiceState>,
    Path(collection_name): Path<String>,
) -> Result<StatusCode, VecgateError> {
    services
        .collection
        .delete_collection(&collection_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/get_collections",
    responses(
        (status = 200, description = "List collections", body = Vec<CollectionSummary>),
        (status = 500, description = "Internal server error")
    )
)]
pub(super) async fn list_collections(
    services: State<ServiceState>,
) -> Result<Json<Vec<CollectionSummary>>, VecgateError> {
    let collections = services.collection.list_collections().await?;
    Ok(Json(collections.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/search_embbeding",
    responses(
        (status = 200, description = "Matched documents", body = Vec<String>),
        (status = 422, description = "Invalid query, collection does not exist or no documents found"),
        (status = 500, description = "Internal server error")
    ),
    request_body = SearchPayload
)]
/// Similarity search. Only the matched documents are returned, closest first;
/// `include` is forwarded to the store.
pub(super) async fn search(
    services: State<ServiceState>,
    WithRejection(Json(search), _): Body<SearchPayload>,
) -> Result<Json<Vec<Option<String>>>, VecgateError> {
    let documents = services.collection.search(search).await?;
    Ok(Json(documents))
}

#[utoipa::path(
    post,
    path = "/add_embedding",
    responses(
        (status = 204, description = "Records added successfully"),
        (status = 422, description = "Invalid records, duplicate IDs or collection does not exist"),
        (status = 500, description = "Internal server error")
    ),
    request_body = AddEmbeddingPayload
)]
pub(super) async fn add_embedding(
    services: State<ServiceState>,
    WithRejection(Json(payload), _): Body<AddEmbeddingPayload>,
) -> Result<StatusCode, VecgateError> {
    services.collection.add_records(payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/create_if_not_exist/{collection_name}",
    responses(
        (status = 200, description = "Existing or newly created collection", body = CollectionSummary),
        (status = 422, description = "Invalid collection name"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("collection_name" = String, Path, description = "Collection name")
    )
)]
pub(super) async fn create_if_not_exist(
    services: State<ServiceState>,
    Path(collection_name): Path<String>,
) -> Result<Json<CollectionSummary>, VecgateError> {
    let collection = services
        .collection
        .get_or_create_collection(&collection_name)
        .await?;
    Ok(Json(collection.into()))
}

#[utoipa::path(
    get,
    path = "/get_sample/{collection_name}",
    responses(
        (status = 200, description = "Up to 10 records of the collection", body = SampleResponse),
        (status = 422, description = "Collection does not exist"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("collection_name" = String, Path, description = "Collection name")
    )
)]
pub(super) async fn get_sample(
    services: State<ServiceState>,
    Path(collection_name): Path<String>,
) -> Result<Json<SampleResponse>, VecgateError> {
    let sample = services.collection.sample(&collection_name).await?;
    Ok(Json(sample.into()))
}
