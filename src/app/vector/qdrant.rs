use crate::core::model::collection::{DistanceFunction, StoreCollection};
use crate::core::model::record::{
    DocumentFilter, FilterValue, GetResult, Include, Metadata, QueryResult, Record,
};
use crate::core::vector::{CreateVectorCollection, VectorQuery, VectorStore};
use crate::error::VecgateError;
use crate::{err, map_err};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::vectors_config::Config;
use qdrant_client::qdrant::with_payload_selector::SelectorOptions;
use qdrant_client::qdrant::{
    value, CollectionExistsRequest, Condition, CreateCollection, Distance, Filter, PointId,
    PointStruct, RetrievedPoint, ScrollPointsBuilder, SearchParams, SearchPoints,
    UpsertPointsBuilder, Value, VectorParams, VectorsConfig, WithPayloadSelector,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Payload key of the info point holding the collection description.
const COLLECTION_INFO_PROPERTY: &str = "collection_info";
/// Payload key holding the caller supplied record ID.
const RECORD_ID_PROPERTY: &str = "record_id";
/// Payload key holding the record document.
const DOCUMENT_PROPERTY: &str = "document";
/// Payload key holding the record metadata.
const METADATA_PROPERTY: &str = "metadata";

/// [VectorStore] backed by a Qdrant server.
///
/// Since Qdrant does not support collection properties, every collection gets an info point
/// with the nil UUID whose payload holds the collection description. It has a "null" vector,
/// i.e. a vector that is the same size as the embeddings, but with all values set to 0.0.
/// The info point is filtered out of every search and scroll.
///
/// Record IDs are arbitrary strings while Qdrant only accepts integers and UUIDs, so
/// points are keyed by the UUIDv5 of the record ID and the caller supplied ID is kept in the payload.
#[derive(Clone)]
pub struct QdrantVectorStore {
    client: Arc<Qdrant>,
}

impl QdrantVectorStore {
    pub fn new(client: Arc<Qdrant>) -> Self {
        Self { client }
    }

    async fn exists(&self, name: &str) -> Result<bool, VecgateError> {
        let exists = map_err!(
            self.client
                .collection_exists(CollectionExistsRequest {
                    collection_name: name.to_string(),
                })
                .await
        );
        Ok(exists)
    }
}

pub fn init(url: &str) -> QdrantVectorStore {
    info!("Connecting to qdrant at {url}");
    QdrantVectorStore::new(Arc::new(
        Qdrant::from_url(url)
            .build()
            .expect("error initialising qdrant"),
    ))
}

#[async_trait::async_trait]
impl VectorStore for QdrantVectorStore {
    fn id(&self) -> &'static str {
        "qdrant"
    }

    async fn create_collection(
        &self,
        data: CreateVectorCollection<'_>,
    ) -> Result<StoreCollection, VecgateError> {
        let CreateVectorCollection {
            name,
            configuration,
            metadata,
        } = data;

        if self.exists(name).await? {
            return err!(AlreadyExists, "Collection '{name}'");
        }

        let config = VectorsConfig {
            config: Some(Config::Params(VectorParams {
                size: configuration.size as u64,
                distance: qdrant_distance(configuration.distance).into(),
                ..Default::default()
            })),
        };

        let res = map_err!(
            self.client
                .create_collection(CreateCollection {
                    collection_name: name.to_string(),
                    vectors_config: Some(config),
                    ..Default::default()
                })
                .await
        );

        debug_assert!(res.result);

        let collection = StoreCollection::new(name, configuration, metadata.map(<[_]>::to_vec));

        create_info_point(&self.client, &collection).await?;

        Ok(collection)
    }

    async fn get_collection(&self, name: &str) -> Result<StoreCollection, VecgateError> {
        if !self.exists(name).await? {
            return err!(CollectionDoesNotExist, "'{name}'");
        }

        match get_info_point(&self.client, name).await? {
            Some(collection) => Ok(collection),
            None => err!(Store, "Collection info point for '{name}'"),
        }
    }

    async fn delete_collection(&self, name: &str) -> Result<(), VecgateError> {
        if !self.exists(name).await? {
            return err!(CollectionDoesNotExist, "'{name}'");
        }
        map_err!(self.client.delete_collection(name).await);
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<StoreCollection>, VecgateError> {
        let collection_names = map_err!(self.client.list_collections().await)
            .collections
            .into_iter()
            .map(|col| col.name)
            .collect::<Vec<_>>();

        let mut collections = vec![];

        for name in collection_names {
            match get_info_point(&self.client, &name).await? {
                Some(collection) => collections.push(collection),
                None => warn!("Skipping collection '{name}' without an info point"),
            }
        }

        Ok(collections)
    }

    async fn query(
        &self,
        collection: &StoreCollection,
        query: VectorQuery,
    ) -> Result<QueryResult, VecgateError> {
        let VectorQuery {
            vector,
            limit,
            filter,
            document_filter,
            include,
        } = query;

        let mut must = vec![];

        for (key, value) in filter.into_iter().flat_map(|f| f.conditions) {
            let field = format!("{METADATA_PROPERTY}.{key}");
            must.push(match value {
                FilterValue::String(s) => Condition::matches(field, s),
                FilterValue::Integer(i) => Condition::matches(field, i),
                FilterValue::Bool(b) => Condition::matches(field, b),
            });
        }

        if let Some(DocumentFilter::Contains(text)) = document_filter {
            must.push(Condition::matches_text(DOCUMENT_PROPERTY, text));
        }

        let search_points = SearchPoints {
            collection_name: collection.name.clone(),
            vector,
            filter: Some(Filter {
                must,
                must_not: vec![info_point_condition()],
                ..Default::default()
            }),
            limit: limit as u64,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            params: Some(SearchParams::default()),
            ..Default::default()
        };

        let search_result = map_err!(self.client.search_points(search_points).await);

        if include.contains(&Include::Embeddings) {
            warn!("Embeddings are not returned by the qdrant store");
        }

        let distance = collection.configuration.distance;
        let mut result = QueryResult {
            documents: include.contains(&Include::Documents).then(Vec::new),
            metadatas: include.contains(&Include::Metadatas).then(Vec::new),
            distances: include.contains(&Include::Distances).then(Vec::new),
            included: include,
            ..Default::default()
        };

        for mut point in search_result.result {
            result
                .ids
                .push(record_id(point.id.take(), &mut point.payload));
            if let Some(ref mut documents) = result.documents {
                documents.push(document(&mut point.payload));
            }
            if let Some(ref mut metadatas) = result.metadatas {
                metadatas.push(metadata(&mut point.payload));
            }
            if let Some(ref mut distances) = result.distances {
                distances.push(distance.distance_from_score(point.score));
            }
        }

        debug!(
            "Found {} results in '{}'",
            result.ids.len(),
            collection.name
        );

        Ok(result)
    }

    async fn add(
        &self,
        collection: &StoreCollection,
        records: Vec<Record>,
    ) -> Result<(), VecgateError> {
        let name = &collection.name;

        debug!("Inserting {} records to {name}", records.len());

        let ids = records
            .iter()
            .map(|r| point_id(&r.id))
            .collect::<Vec<_>>();

        let existing = map_err!(
            self.client
                .scroll(
                    ScrollPointsBuilder::new(name)
                        .filter(Filter::must([Condition::has_id(ids)]))
                        .limit(records.len() as u32)
                        .with_payload(true)
                        .with_vectors(false),
                )
                .await
        );

        if let Some(mut point) = existing.result.into_iter().next() {
            let id = record_id(point.id.take(), &mut point.payload);
            return err!(DuplicateId, "'{id}' already exists in '{name}'");
        }

        let mut points = Vec::with_capacity(records.len());

        for record in records {
            let Record {
                id,
                embedding,
                metadata,
                document,
            } = record;

            let Some(embedding) = embedding else {
                return err!(InvalidRecords, "Record '{id}' has no embedding");
            };

            let mut payload = Payload::new();
            payload.insert(RECORD_ID_PROPERTY, id.clone());
            if let Some(document) = document {
                payload.insert(DOCUMENT_PROPERTY, document);
            }
            if let Some(metadata) = metadata {
                payload.insert(METADATA_PROPERTY, serde_json::Value::Object(metadata));
            }

            points.push(PointStruct::new(point_id(&id), embedding, payload));
        }

        map_err!(
            self.client
                .upsert_points(UpsertPointsBuilder::new(name, points).wait(true))
                .await
        );

        Ok(())
    }

    async fn peek(
        &self,
        collection: &StoreCollection,
        limit: u32,
        include: &[Include],
    ) -> Result<GetResult, VecgateError> {
        let scroll = map_err!(
            self.client
                .scroll(
                    ScrollPointsBuilder::new(&collection.name)
                        .filter(Filter::must_not([info_point_condition()]))
                        .limit(limit)
                        .with_payload(true)
                        .with_vectors(false),
                )
                .await
        );

        Ok(get_result(scroll.result, include))
    }
}

fn get_result(points: Vec<RetrievedPoint>, include: &[Include]) -> GetResult {
    let included = |field| include.contains(&field);
    let amount = points.len();

    let mut result = GetResult {
        documents: included(Include::Documents).then(Vec::new),
        metadatas: included(Include::Metadatas).then(Vec::new),
        uris: included(Include::Uris).then(|| vec![None; amount]),
        data: included(Include::Data).then(|| vec![None; amount]),
        included: include.to_vec(),
        ..Default::default()
    };

    for mut point in points {
        result
            .ids
            .push(record_id(point.id.take(), &mut point.payload));
        if let Some(ref mut documents) = result.documents {
            documents.push(document(&mut point.payload));
        }
        if let Some(ref mut metadatas) = result.metadatas {
            metadatas.push(metadata(&mut point.payload));
        }
    }

    result
}

fn qdrant_distance(distance: DistanceFunction) -> Distance {
    match distance {
        DistanceFunction::Cosine => Distance::Cosine,
        DistanceFunction::L2 => Distance::Euclid,
        DistanceFunction::Ip => Distance::Dot,
    }
}

fn point_id(record_id: &str) -> PointId {
    PointId::from(Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes()).to_string())
}

fn info_point_id() -> PointId {
    PointId::from(Uuid::nil().to_string())
}

fn info_point_condition() -> Condition {
    Condition::has_id([info_point_id()])
}

/// The record ID from the payload, falling back to the point ID for
/// points not inserted through vecgate.
fn record_id(id: Option<PointId>, payload: &mut HashMap<String, Value>) -> String {
    if let Some(serde_json::Value::String(id)) =
        payload.remove(RECORD_ID_PROPERTY).map(Value::into_json)
    {
        return id;
    }
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Num(n)) => n.to_string(),
        Some(PointIdOptions::Uuid(u)) => u,
        None => String::new(),
    }
}

fn document(payload: &mut HashMap<String, Value>) -> Option<String> {
    match payload.remove(DOCUMENT_PROPERTY)?.kind? {
        value::Kind::StringValue(s) => Some(s),
        v => {
            warn!("Found unsupported document kind: {v:?}");
            None
        }
    }
}

fn metadata(payload: &mut HashMap<String, Value>) -> Option<Metadata> {
    match payload.remove(METADATA_PROPERTY).map(Value::into_json)? {
        serde_json::Value::Object(map) => Some(map),
        serde_json::Value::Null => None,
        v => {
            warn!("Found unsupported metadata: {v}");
            None
        }
    }
}

async fn create_info_point(
    qdrant: &Qdrant,
    collection: &StoreCollection,
) -> Result<(), VecgateError> {
    let mut payload = Payload::new();
    payload.insert(
        COLLECTION_INFO_PROPERTY,
        map_err!(serde_json::to_value(collection)),
    );

    let point = PointStruct::new(
        info_point_id(),
        vec![0.0; collection.configuration.size],
        payload,
    );

    map_err!(
        qdrant
            .upsert_points(UpsertPointsBuilder::new(&collection.name, vec![point]).wait(true))
            .await
    );

    Ok(())
}

async fn get_info_point(
    qdrant: &Qdrant,
    name: &str,
) -> Result<Option<StoreCollection>, VecgateError> {
    let scroll = map_err!(
        qdrant
            .scroll(
                ScrollPointsBuilder::new(name)
                    .filter(Filter::must([info_point_condition()]))
                    .limit(1)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
    );

    let Some(mut point) = scroll.result.into_iter().next() else {
        return Ok(None);
    };

    let Some(info) = point.payload.remove(COLLECTION_INFO_PROPERTY) else {
        return Ok(None);
    };

    let collection = map_err!(serde_json::from_value(info.into_json()));

    Ok(Some(collection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> HashMap<String, Value> {
        let serde_json::Value::Object(map) = value else {
            unreachable!()
        };
        map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
    }

    #[test]
    fn decodes_record_payload() {
        let mut payload = payload(json!({
            "record_id": "doc-1",
            "document": "apples",
            "metadata": { "source": "wiki", "page": 3, "tags": ["a", "b"] }
        }));

        assert_eq!("doc-1", record_id(Some(point_id("doc-1")), &mut payload));
        assert_eq!(Some("apples".to_string()), document(&mut payload));

        let metadata = metadata(&mut payload).unwrap();
        assert_eq!(json!("wiki"), metadata["source"]);
        assert_eq!(json!(3), metadata["page"]);
        assert_eq!(json!(["a", "b"]), metadata["tags"]);
    }

    #[test]
    fn record_id_falls_back_to_point_id() {
        let mut payload = payload(json!({ "document": "apples" }));
        let id = Uuid::new_v4().to_string();

        assert_eq!(id, record_id(Some(PointId::from(id.clone())), &mut payload));
        assert_eq!(None, metadata(&mut payload));
    }

    #[test]
    fn decodes_collection_info() {
        let collection = StoreCollection::new(
            "articles",
            Default::default(),
            Some(vec!["news".to_string()]),
        );
        let mut payload = HashMap::from([(
            COLLECTION_INFO_PROPERTY.to_string(),
            Value::from(serde_json::to_value(&collection).unwrap()),
        )]);

        let info = payload.remove(COLLECTION_INFO_PROPERTY).unwrap();
        let decoded: StoreCollection = serde_json::from_value(info.into_json()).unwrap();

        assert_eq!(collection, decoded);
    }
}
