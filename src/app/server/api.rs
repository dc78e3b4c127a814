#[rustfmt::skip]
use super::router::{
    // App config
    __path_health_check,
    __path_app_config,
    // Collections
    collection::{
        __path_create_collection,
        __path_delete_collection,
        __path_list_collections,
        __path_create_if_not_exist,
        // Records
        __path_search,
        __path_add_embedding,
        __path_get_sample,
    },
};
use super::dto::SampleResponse;
use crate::{
    app::state::AppConfig,
    core::{
        model::{
            collection::{CollectionConfiguration, CollectionSummary, DistanceFunction},
            record::Include,
        },
        service::collection::dto::{
            AddEmbeddingPayload, CreateCollectionPayload, RecordBatchPayload, SearchPayload,
        },
    },
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // App config
        health_check,
        app_config,
        // Collections
        create_collection,
        delete_collection,
        list_collections,
        create_if_not_exist,
        // Records
        search,
        add_embedding,
        get_sample,
    ),
    components(schemas(
        AppConfig,
        CollectionConfiguration,
        CollectionSummary,
        DistanceFunction,
        Include,
        CreateCollectionPayload,
        SearchPayload,
        RecordBatchPayload,
        AddEmbeddingPayload,
        SampleResponse,
    )),
    tags(
        (name = "vecgate", description = "Vector collection gateway API")
    )
)]
pub struct ApiDoc;
