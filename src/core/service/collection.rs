use crate::core::model::collection::{CollectionConfiguration, StoreCollection};
use crate::core::model::record::{DocumentFilter, GetResult, Include, MetadataFilter};
use crate::core::vector::{CreateVectorCollection, VectorQuery, VectorStore};
use crate::error::{VecgateErr, VecgateError};
use crate::{err, map_err};
use dto::{AddEmbeddingPayload, CreateCollectionPayload, SearchPayload};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use validify::{Validate, Validify};

/// Maximum amount of records returned when sampling a collection.
pub const SAMPLE_LIMIT: u32 = 10;

/// Shared handle to the vector store every request goes through.
pub type VectorStoreHandle = Arc<dyn VectorStore + Send + Sync>;

/// High level operations on collections and the records stored in them.
#[derive(Clone)]
pub struct CollectionService {
    store: VectorStoreHandle,
    defaults: CollectionConfiguration,
}

impl CollectionService {
    pub fn new(store: VectorStoreHandle, defaults: CollectionConfiguration) -> Self {
        Self { store, defaults }
    }

    /// ID of the vector store backing this service.
    pub fn store_id(&self) -> &'static str {
        self.store.id()
    }

    /// Configuration used for collections created without one.
    pub fn defaults(&self) -> CollectionConfiguration {
        self.defaults
    }

    /// Create a collection. Fails if the name is already taken.
    ///
    /// * `data`: Creation data.
    pub async fn create_collection(
        &self,
        mut data: CreateCollectionPayload,
    ) -> Result<StoreCollection, VecgateError> {
        map_err!(data.validify());

        let configuration = match data.configuration {
            Some(ref config) => self.defaults.merge_json(config)?,
            None => self.defaults,
        };

        info!(
            "Creating collection '{}' of size '{}'",
            data.name, configuration.size
        );

        self.store
            .create_collection(CreateVectorCollection::new(
                &data.name,
                configuration,
                data.metadata.as_deref(),
            ))
            .await
    }

    /// Delete a collection and every record in it.
    ///
    /// * `name`: Collection name.
    pub async fn delete_collection(&self, name: &str) -> Result<(), VecgateError> {
        self.store.delete_collection(name).await?;
        info!("Deleted collection '{name}'");
        Ok(())
    }

    /// List all collections in the store.
    pub async fn list_collections(&self) -> Result<Vec<StoreCollection>, VecgateError> {
        self.store.list_collections().await
    }

    /// Get the collection with the given name, creating it with the default
    /// configuration if it does not exist.
    ///
    /// * `name`: Collection name.
    pub async fn get_or_create_collection(
        &self,
        name: &str,
    ) -> Result<StoreCollection, VecgateError> {
        let mut data = CreateCollectionPayload {
            name: name.to_string(),
            configuration: None,
            metadata: None,
        };

        map_err!(data.validify());

        match self.store.get_collection(&data.name).await {
            Ok(collection) => return Ok(collection),
            Err(VecgateError {
                error: VecgateErr::CollectionDoesNotExist(_),
                ..
            }) => {}
            Err(e) => return Err(e),
        }

        info!("Collection '{}' not found, creating", data.name);

        let create = CreateVectorCollection::new(&data.name, self.defaults, None);

        match self.store.create_collection(create).await {
            Ok(collection) => Ok(collection),
            // Created concurrently by another request.
            Err(VecgateError {
                error: VecgateErr::AlreadyExists(_),
                ..
            }) => self.store.get_collection(&data.name).await,
            Err(e) => Err(e),
        }
    }

    /// Query the collection with the given vector and return the matched documents,
    /// closest first.
    ///
    /// * `search`: Search params.
    pub async fn search(&self, search: SearchPayload) -> Result<Vec<Option<String>>, VecgateError> {
        map_err!(search.validate());

        let SearchPayload {
            database,
            embeddings,
            n,
            filter,
            where_document,
            include,
        } = search;

        let filter = filter.as_ref().map(MetadataFilter::parse).transpose()?;
        let document_filter = where_document
            .as_ref()
            .map(DocumentFilter::parse)
            .transpose()?;

        let collection = self.store.get_collection(&database).await?;

        check_dimension(&collection, "query", &embeddings)?;

        debug!("Querying '{database}' for {n} results");

        let result = self
            .store
            .query(
                &collection,
                VectorQuery {
                    vector: embeddings,
                    limit: n,
                    filter,
                    document_filter,
                    include,
                },
            )
            .await?;

        match result.documents {
            Some(documents) if !documents.is_empty() => Ok(documents),
            _ => err!(NoDocuments),
        }
    }

    /// Insert every record of the payload into its collection.
    /// Returns the amount of records added.
    ///
    /// * `payload`: Target collection and record batches.
    pub async fn add_records(&self, payload: AddEmbeddingPayload) -> Result<usize, VecgateError> {
        let AddEmbeddingPayload {
            database,
            data_list,
        } = payload;

        let mut records = vec![];
        for batch in data_list.into_vec() {
            map_err!(batch.validate());
            records.extend(batch.into_records());
        }

        if records.is_empty() {
            return err!(InvalidRecords, "`data_list` contains no records");
        }

        let mut seen = HashSet::new();
        for record in records.iter() {
            if !seen.insert(record.id.as_str()) {
                let id = &record.id;
                return err!(DuplicateId, "'{id}' appears more than once in the request");
            }
        }

        let collection = self.store.get_collection(&database).await?;

        for record in records.iter() {
            let Some(ref embedding) = record.embedding else {
                let id = &record.id;
                return err!(InvalidRecords, "Record '{id}' has no embedding");
            };
            check_dimension(&collection, &record.id, embedding)?;
        }

        let count = records.len();

        self.store.add(&collection, records).await?;

        info!("Added {count} records to '{database}'");

        Ok(count)
    }

    /// Preview up to [SAMPLE_LIMIT] records of a collection.
    ///
    /// * `name`: Collection name.
    pub async fn sample(&self, name: &str) -> Result<GetResult, VecgateError> {
        let collection = self.store.get_collection(name).await?;
        self.store
            .peek(
                &collection,
                SAMPLE_LIMIT,
                &[Include::Metadatas, Include::Documents],
            )
            .await
    }
}

fn check_dimension(
    collection: &StoreCollection,
    what: &str,
    vector: &[f32],
) -> Result<(), VecgateError> {
    let expected = collection.configuration.size;
    if vector.len() != expected {
        let (name, actual) = (&collection.name, vector.len());
        return err!(
            InvalidEmbedding,
            "'{what}' has dimension {actual}, collection '{name}' expects {expected}"
        );
    }
    Ok(())
}

/// Collection service DTOs.
pub mod dto {
    use crate::core::model::record::{Include, Metadata, Record};
    use serde::Deserialize;
    use utoipa::ToSchema;
    use validify::{
        field_err, schema_err, schema_validation, Validate, ValidationError, ValidationErrors,
        Validify,
    };

    /// Largest amount of results a single search can ask for.
    pub const MAX_SEARCH_RESULTS: u32 = 1000;

    fn collection_name_charset(s: &str) -> Result<(), ValidationError> {
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(field_err!(
                "collection_name",
                "collection name must be alphanumeric with underscores, dashes or dots [a-z A-Z 0-9 _ - .]"
            ));
        }
        Ok(())
    }

    fn collection_name_edges(s: &str) -> Result<(), ValidationError> {
        let alphanumeric = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
        if !alphanumeric(s.chars().next()) || !alphanumeric(s.chars().last()) {
            return Err(field_err!(
                "collection_name",
                "collection name must start and end with an alphanumeric character"
            ));
        }
        Ok(())
    }

    #[derive(Debug, Deserialize, Validify, ToSchema)]
    pub struct CreateCollectionPayload {
        /// Collection name, 3 to 50 characters.
        #[validate(length(min = 3, max = 50))]
        #[validate(custom(collection_name_charset))]
        #[validate(custom(collection_name_edges))]
        #[modify(trim)]
        pub name: String,

        /// JSON collection configuration, e.g. `{"size": 384, "distance": "cosine"}`.
        pub configuration: Option<String>,

        /// Collection metadata.
        pub metadata: Option<Vec<String>>,
    }

    /// Params for semantic search.
    #[derive(Debug, Deserialize, Validate, ToSchema)]
    #[validate(Self::validate_schema)]
    pub struct SearchPayload {
        /// The collection to search in.
        #[validate(length(min = 1))]
        pub database: String,

        /// The query vector.
        #[validate(length(min = 1))]
        pub embeddings: Vec<f32>,

        /// Amount of results to return.
        #[serde(default = "default_search_results")]
        pub n: u32,

        /// Metadata filter.
        #[serde(rename = "where")]
        #[schema(value_type = Option<Object>)]
        pub filter: Option<serde_json::Map<String, serde_json::Value>>,

        /// Document filter.
        #[schema(value_type = Option<Object>)]
        pub where_document: Option<serde_json::Map<String, serde_json::Value>>,

        /// Record fields the store should return.
        #[serde(default = "Include::search_default")]
        pub include: Vec<Include>,
    }

    fn default_search_results() -> u32 {
        10
    }

    impl SearchPayload {
        #[schema_validation]
        fn validate_schema(&self) -> Result<(), ValidationErrors> {
            if self.n == 0 || self.n > MAX_SEARCH_RESULTS {
                schema_err!("n_range", "`n` must be between 1 and 1000");
            }
            if self.embeddings.iter().any(|x| !x.is_finite()) {
                schema_err!("embeddings_finite", "`embeddings` must be finite numbers");
            }
        }
    }

    /// A single value or a list of values.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(untagged)]
    pub enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    impl<T> OneOrMany<T> {
        pub fn len(&self) -> usize {
            match self {
                OneOrMany::Many(v) => v.len(),
                OneOrMany::One(_) => 1,
            }
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        pub fn as_slice(&self) -> &[T] {
            match self {
                OneOrMany::Many(v) => v,
                OneOrMany::One(v) => std::slice::from_ref(v),
            }
        }

        pub fn into_vec(self) -> Vec<T> {
            match self {
                OneOrMany::Many(v) => v,
                OneOrMany::One(v) => vec![v],
            }
        }
    }

    /// Records in columnar form. Every provided column must be as long as `ids`.
    #[derive(Debug, Deserialize, Validate, ToSchema)]
    #[validate(Self::validate_schema)]
    pub struct RecordBatchPayload {
        /// One record ID or a list of them.
        #[schema(value_type = Vec<String>)]
        pub ids: OneOrMany<String>,

        /// One embedding or a list of them.
        #[schema(value_type = Option<Vec<Vec<f32>>>)]
        pub embeddings: Option<OneOrMany<Vec<f32>>>,

        /// One metadata object or a list of them.
        #[schema(value_type = Option<Vec<Object>>)]
        pub metadatas: Option<OneOrMany<Metadata>>,

        /// One document or a list of them.
        #[schema(value_type = Option<Vec<String>>)]
        pub documents: Option<OneOrMany<String>>,
    }

    impl RecordBatchPayload {
        #[schema_validation]
        fn validate_schema(&self) -> Result<(), ValidationErrors> {
            let ids = self.ids.len();
            if ids == 0 {
                schema_err!("no_ids", "`ids` must contain at least one ID");
            }
            if self.embeddings.as_ref().is_some_and(|e| e.len() != ids) {
                schema_err!(
                    "embeddings_length",
                    "`embeddings` must have as many entries as `ids`"
                );
            }
            if self.embeddings.as_ref().is_some_and(|e| {
                e.as_slice()
                    .iter()
                    .flatten()
                    .any(|x| !x.is_finite())
            }) {
                schema_err!("embeddings_finite", "`embeddings` must be finite numbers");
            }
            if self.metadatas.as_ref().is_some_and(|m| m.len() != ids) {
                schema_err!(
                    "metadatas_length",
                    "`metadatas` must have as many entries as `ids`"
                );
            }
            if self.documents.as_ref().is_some_and(|d| d.len() != ids) {
                schema_err!(
                    "documents_length",
                    "`documents` must have as many entries as `ids`"
                );
            }
        }

        /// Zip the columns into records. Expects a validated batch.
        pub fn into_records(self) -> Vec<Record> {
            let mut embeddings = self.embeddings.map(|e| e.into_vec().into_iter());
            let mut metadatas = self.metadatas.map(|m| m.into_vec().into_iter());
            let mut documents = self.documents.map(|d| d.into_vec().into_iter());

            self.ids
                .into_vec()
                .into_iter()
                .map(|id| Record {
                    id,
                    embedding: embeddings.as_mut().and_then(Iterator::next),
                    metadata: metadatas.as_mut().and_then(Iterator::next),
                    document: documents.as_mut().and_then(Iterator::next),
                })
                .collect()
        }
    }

    #[derive(Debug, Deserialize, ToSchema)]
    pub struct AddEmbeddingPayload {
        /// The collection to insert into.
        pub database: String,

        /// One record batch or a list of them.
        #[schema(value_type = Vec<RecordBatchPayload>)]
        pub data_list: OneOrMany<RecordBatchPayload>,
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        fn create(name: &str) -> CreateCollectionPayload {
            CreateCollectionPayload {
                name: name.to_string(),
                configuration: None,
                metadata: None,
            }
        }

        #[test]
        fn collection_name_length_is_bounded() {
            assert!(create("ab").validify().is_err());
            assert!(create("abc").validify().is_ok());
            assert!(create(&"a".repeat(50)).validify().is_ok());
            assert!(create(&"a".repeat(51)).validify().is_err());
        }

        #[test]
        fn collection_name_is_trimmed() {
            let mut payload = create("  docs  ");
            payload.validify().unwrap();
            assert_eq!("docs", payload.name);
        }

        #[test]
        fn collection_name_charset_is_enforced() {
            assert!(create("my_docs-v1.2").validify().is_ok());
            assert!(create("my docs").validify().is_err());
            assert!(create("docs/1").validify().is_err());
            assert!(create("_docs").validify().is_err());
            assert!(create("docs.").validify().is_err());
        }

        #[test]
        fn search_defaults() {
            let payload: SearchPayload = serde_json::from_value(json!({
                "database": "docs",
                "embeddings": [0.1, 0.2]
            }))
            .unwrap();

            assert_eq!(10, payload.n);
            assert_eq!(Include::search_default(), payload.include);
            assert!(payload.filter.is_none());
            assert!(payload.validate().is_ok());
        }

        #[test]
        fn search_rejects_invalid_params() {
            let payload: SearchPayload = serde_json::from_value(json!({
                "database": "docs",
                "embeddings": [],
            }))
            .unwrap();
            assert!(payload.validate().is_err());

            let payload: SearchPayload = serde_json::from_value(json!({
                "database": "docs",
                "embeddings": [0.1],
                "n": 0
            }))
            .unwrap();
            assert!(payload.validate().is_err());

            let unknown_include = serde_json::from_value::<SearchPayload>(json!({
                "database": "docs",
                "embeddings": [0.1],
                "include": ["scores"]
            }));
            assert!(unknown_include.is_err());
        }

        #[test]
        fn single_record_batch() {
            let batch: RecordBatchPayload = serde_json::from_value(json!({
                "ids": "a",
                "embeddings": [0.1, 0.2],
                "metadatas": {"source": "wiki"},
                "documents": "hello"
            }))
            .unwrap();

            assert!(batch.validate().is_ok());

            let records = batch.into_records();
            assert_eq!(1, records.len());
            assert_eq!("a", records[0].id);
            assert_eq!(Some(vec![0.1, 0.2]), records[0].embedding);
            assert_eq!(Some("hello".to_string()), records[0].document);
            assert_eq!(
                Some(&json!("wiki")),
                records[0].metadata.as_ref().unwrap().get("source")
            );
        }

        #[test]
        fn many_record_batch() {
            let batch: RecordBatchPayload = serde_json::from_value(json!({
                "ids": ["a", "b"],
                "embeddings": [[0.1, 0.2], [0.3, 0.4]],
                "documents": ["hello", "world"]
            }))
            .unwrap();

            assert!(batch.validate().is_ok());

            let records = batch.into_records();
            assert_eq!(2, records.len());
            assert_eq!("b", records[1].id);
            assert_eq!(Some(vec![0.3, 0.4]), records[1].embedding);
            assert_eq!(None, records[1].metadata);
        }

        #[test]
        fn mismatched_columns_are_rejected() {
            let batch: RecordBatchPayload = serde_json::from_value(json!({
                "ids": ["a", "b"],
                "embeddings": [[0.1, 0.2]],
            }))
            .unwrap();
            assert!(batch.validate().is_err());

            let batch: RecordBatchPayload = serde_json::from_value(json!({
                "ids": ["a"],
                "documents": ["hello", "world"],
            }))
            .unwrap();
            assert!(batch.validate().is_err());
        }

        #[test]
        fn non_finite_embeddings_are_rejected() {
            // 1e39 overflows f32 and deserializes as infinity
            let batch: RecordBatchPayload = serde_json::from_value(json!({
                "ids": "a",
                "embeddings": [1e39, 0.0, 0.0],
            }))
            .unwrap();
            assert!(batch.validate().is_err());

            let batch: RecordBatchPayload = serde_json::from_value(json!({
                "ids": ["a", "b"],
                "embeddings": [[0.1, 0.2], [0.3, -1e39]],
            }))
            .unwrap();
            assert!(batch.validate().is_err());
        }

        #[test]
        fn data_list_accepts_one_or_many() {
            let one: AddEmbeddingPayload = serde_json::from_value(json!({
                "database": "docs",
                "data_list": {"ids": "a", "embeddings": [0.1]}
            }))
            .unwrap();
            assert_eq!(1, one.data_list.len());

            let many: AddEmbeddingPayload = serde_json::from_value(json!({
                "database": "docs",
                "data_list": [
                    {"ids": "a", "embeddings": [0.1]},
                    {"ids": ["b", "c"], "embeddings": [[0.2], [0.3]]}
                ]
            }))
            .unwrap();
            assert_eq!(2, many.data_list.len());
        }
    }
}
