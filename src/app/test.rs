//! Test suites and utilities.


use crate::{
    core::{
        model::{
            collection::StoreCollection,
            record::{GetResult, Include, QueryResult, Record},
        },
        vector::{CreateVectorCollection, VectorQuery, VectorStore},
    },
    err,
    error::VecgateError,
};
use std::sync::{Arc, Mutex};

#[cfg(feature = "integration")]
use testcontainers::{ContainerAsync, GenericImage};

#[cfg(feature = "integration")]
pub type AsyncContainer = ContainerAsync<GenericImage>;

/// In-memory [VectorStore] for exercising the service and router without a Qdrant server.
/// Records are kept in insertion order and queried by brute force.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<Mutex<Vec<(StoreCollection, Vec<Record>)>>>,
}

impl InMemoryStore {
    fn with_records<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Vec<Record>) -> Result<T, VecgateError>,
    ) -> Result<T, VecgateError> {
        let mut collections = self.collections.lock().unwrap();
        match collections.iter_mut().find(|(c, _)| c.name == name) {
            Some((_, records)) => f(records),
            None => err!(CollectionDoesNotExist, "'{name}'"),
        }
    }
}

fn distance(collection: &StoreCollection, a: &[f32], b: &[f32]) -> f32 {
    use crate::core::model::collection::DistanceFunction as D;

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match collection.configuration.distance {
        D::L2 => a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum(),
        D::Ip => 1.0 - dot,
        D::Cosine => {
            let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
            1.0 - dot / (norm(a) * norm(b))
        }
    }
}

#[async_trait::async_trait]
impl VectorStore for InMemoryStore {
    fn id(&self) -> &'static str {
        "memory"
    }

    async fn create_collection(
        &self,
        data: CreateVectorCollection<'_>,
    ) -> Result<StoreCollection, VecgateError> {
        let mut collections = self.collections.lock().unwrap();
        if collections.iter().any(|(c, _)| c.name == data.name) {
            let name = data.name;
            return err!(AlreadyExists, "Collection '{name}'");
        }
        let collection = StoreCollection::new(
            data.name,
            data.configuration,
            data.metadata.map(<[_]>::to_vec),
        );
        collections.push((collection.clone(), vec![]));
        Ok(collection)
    }

    async fn get_collection(&self, name: &str) -> Result<StoreCollection, VecgateError> {
        let collections = self.collections.lock().unwrap();
        match collections.iter().find(|(c, _)| c.name == name) {
            Some((c, _)) => Ok(c.clone()),
            None => err!(CollectionDoesNotExist, "'{name}'"),
        }
    }

    async fn delete_collection(&self, name: &str) -> Result<(), VecgateError> {
        let mut collections = self.collections.lock().unwrap();
        let before = collections.len();
        collections.retain(|(c, _)| c.name != name);
        if before == collections.len() {
            return err!(CollectionDoesNotExist, "'{name}'");
        }
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<StoreCollection>, VecgateError> {
        let collections = self.collections.lock().unwrap();
        Ok(collections.iter().map(|(c, _)| c.clone()).collect())
    }

    async fn query(
        &self,
        collection: &StoreCollection,
        query: VectorQuery,
    ) -> Result<QueryResult, VecgateError> {
        let mut hits = self.with_records(&collection.name, |records| {
            Ok(records
                .iter()
                .filter(|r| {
                    query
                        .filter
                        .as_ref()
                        .map_or(true, |f| f.matches(r.metadata.as_ref()))
                })
                .filter(|r| {
                    query
                        .document_filter
                        .as_ref()
                        .map_or(true, |f| f.matches(r.document.as_deref()))
                })
                .filter_map(|r| {
                    let d = distance(collection, r.embedding.as_ref()?, &query.vector);
                    Some((d, r.clone()))
                })
                .collect::<Vec<_>>())
        })?;

        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.truncate(query.limit as usize);

        let include = |field| query.include.contains(&field);

        Ok(QueryResult {
            ids: hits.iter().map(|(_, r)| r.id.clone()).collect(),
            documents: include(Include::Documents)
                .then(|| hits.iter().map(|(_, r)| r.document.clone()).collect()),
            metadatas: include(Include::Metadatas)
                .then(|| hits.iter().map(|(_, r)| r.metadata.clone()).collect()),
            embeddings: include(Include::Embeddings)
                .then(|| hits.iter().map(|(_, r)| r.embedding.clone()).collect()),
            distances: include(Include::Distances).then(|| hits.iter().map(|(d, _)| *d).collect()),
            included: query.include.clone(),
        })
    }

    async fn add(
        &self,
        collection: &StoreCollection,
        records: Vec<Record>,
    ) -> Result<(), VecgateError> {
        self.with_records(&collection.name, |stored| {
            if let Some(r) = records.iter().find(|r| stored.iter().any(|s| s.id == r.id)) {
                let (id, name) = (&r.id, &collection.name);
                return err!(DuplicateId, "'{id}' already exists in '{name}'");
            }
            stored.extend(records);
            Ok(())
        })
    }

    async fn peek(
        &self,
        collection: &StoreCollection,
        limit: u32,
        include: &[Include],
    ) -> Result<GetResult, VecgateError> {
        let records = self.with_records(&collection.name, |records| {
            Ok(records.iter().take(limit as usize).cloned().collect::<Vec<_>>())
        })?;

        let included = |field| include.contains(&field);

        Ok(GetResult {
            ids: records.iter().map(|r| r.id.clone()).collect(),
            documents: included(Include::Documents)
                .then(|| records.iter().map(|r| r.document.clone()).collect()),
            metadatas: included(Include::Metadatas)
                .then(|| records.iter().map(|r| r.metadata.clone()).collect()),
            embeddings: included(Include::Embeddings)
                .then(|| records.iter().map(|r| r.embedding.clone()).collect()),
            uris: included(Include::Uris).then(|| vec![None; records.len()]),
            data: included(Include::Data).then(|| vec![None; records.len()]),
            included: include.to_vec(),
        })
    }
}

/// [VectorStore] whose every call fails as if the server were unreachable.
#[derive(Clone, Default)]
pub struct UnreachableStore;

#[async_trait::async_trait]
impl VectorStore for UnreachableStore {
    fn id(&self) -> &'static str {
        "unreachable"
    }

    async fn create_collection(
        &self,
        _: CreateVectorCollection<'_>,
    ) -> Result<StoreCollection, VecgateError> {
        err!(Store, "connection refused")
    }

    async fn get_collection(&self, _: &str) -> Result<StoreCollection, VecgateError> {
        err!(Store, "connection refused")
    }

    async fn delete_collection(&self, _: &str) -> Result<(), VecgateError> {
        err!(Store, "connection refused")
    }

    async fn list_collections(&self) -> Result<Vec<StoreCollection>, VecgateError> {
        err!(Store, "connection refused")
    }

    async fn query(&self, _: &StoreCollection, _: VectorQuery) -> Result<QueryResult, VecgateError> {
        err!(Store, "connection refused")
    }

    async fn add(&self, _: &StoreCollection, _: Vec<Record>) -> Result<(), VecgateError> {
        err!(Store, "connection refused")
    }

    async fn peek(
        &self,
        _: &StoreCollection,
        _: u32,
        _: &[Include],
    ) -> Result<GetResult, VecgateError> {
        err!(Store, "connection refused")
    }
}

/// Setup a qdrant test container and connect to it using QdrantVectorStore.
/// When using suitest's [before_all][suitest::before_all], make sure you return this, otherwise the
/// container will get dropped and cleaned up.
#[cfg(feature = "integration")]
pub async fn init_qdrant() -> (super::vector::qdrant::QdrantVectorStore, AsyncContainer) {
    use testcontainers::core::{IntoContainerPort, WaitFor};
    use testcontainers::runners::AsyncRunner;

    let qd_image = GenericImage::new("qdrant/qdrant", "latest")
        .with_exposed_port(6334.tcp())
        .with_wait_for(WaitFor::message_on_stdout("gRPC listening on"))
        .start()
        .await
        .expect("qdrant container error");

    let qd_host = qd_image.get_host().await.unwrap();
    let qd_port = qd_image.get_host_port_ipv4(6334).await.unwrap();
    let qd_url = format!("http://{qd_host}:{qd_port}");
    (crate::app::vector::qdrant::init(&qd_url), qd_image)
}
