use crate::{
    core::model::{
        collection::{CollectionConfiguration, StoreCollection},
        record::{DocumentFilter, GetResult, Include, MetadataFilter, QueryResult, Record},
    },
    error::VecgateError,
};

/// Collection creation parameters passed to the store.
#[derive(Debug, Clone, Copy)]
pub struct CreateVectorCollection<'a> {
    pub name: &'a str,
    pub configuration: CollectionConfiguration,
    pub metadata: Option<&'a [String]>,
}

impl<'a> CreateVectorCollection<'a> {
    pub fn new(
        name: &'a str,
        configuration: CollectionConfiguration,
        metadata: Option<&'a [String]>,
    ) -> Self {
        Self {
            name,
            configuration,
            metadata,
        }
    }
}

/// Similarity query parameters.
#[derive(Debug, Clone)]
pub struct VectorQuery {
    /// The query vector.
    pub vector: Vec<f32>,

    /// Maximum amount of results.
    pub limit: u32,

    /// Metadata conditions every result must satisfy.
    pub filter: Option<MetadataFilter>,

    /// Document conditions every result must satisfy.
    pub document_filter: Option<DocumentFilter>,

    /// Which record fields to return.
    pub include: Vec<Include>,
}

/// Vector database operations.
///
/// Implementations own indexing, persistence and search; vecgate only forwards to them.
#[async_trait::async_trait]
pub trait VectorStore {
    fn id(&self) -> &'static str;

    /// Create a vector collection.
    ///
    /// Errors with `AlreadyExists` if a collection with the same name exists.
    async fn create_collection(
        &self,
        data: CreateVectorCollection<'_>,
    ) -> Result<StoreCollection, VecgateError>;

    /// Get collection info.
    ///
    /// Errors with `CollectionDoesNotExist` if there is no such collection.
    ///
    /// * `name`: Collection name.
    async fn get_collection(&self, name: &str) -> Result<StoreCollection, VecgateError>;

    /// Delete a vector collection.
    ///
    /// Errors with `CollectionDoesNotExist` if there is no such collection.
    ///
    /// * `name`: The name of the collection.
    async fn delete_collection(&self, name: &str) -> Result<(), VecgateError>;

    /// List available vector collections.
    async fn list_collections(&self) -> Result<Vec<StoreCollection>, VecgateError>;

    /// Perform semantic search.
    ///
    /// * `collection`: The collection to search in.
    /// * `query`: Search parameters.
    async fn query(
        &self,
        collection: &StoreCollection,
        query: VectorQuery,
    ) -> Result<QueryResult, VecgateError>;

    /// Store records in the collection.
    ///
    /// Errors with `DuplicateId` if any of the record IDs is already stored.
    /// The check is not atomic with the insert, so concurrent adds of the same
    /// ID may both succeed and leave only the last write.
    ///
    /// * `collection`: The collection to store in.
    /// * `records`: Records with their embeddings.
    async fn add(&self, collection: &StoreCollection, records: Vec<Record>)
        -> Result<(), VecgateError>;

    /// Fetch the first `limit` records of the collection.
    ///
    /// * `collection`: The collection to read from.
    /// * `limit`: Maximum amount of records.
    /// * `include`: Which record fields to return.
    async fn peek(
        &self,
        collection: &StoreCollection,
        limit: u32,
        include: &[Include],
    ) -> Result<GetResult, VecgateError>;
}
