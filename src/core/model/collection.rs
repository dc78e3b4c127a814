use crate::{err, error::VecgateError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Vector size used for collections created without an explicit `size`.
pub const DEFAULT_VECTOR_SIZE: usize = 768;

/// Distance function used to rank query results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DistanceFunction {
    #[default]
    Cosine,
    L2,
    Ip,
}

impl DistanceFunction {
    /// Convert a similarity score reported by the store into a distance,
    /// where lower always means closer.
    pub fn distance_from_score(&self, score: f32) -> f32 {
        match self {
            DistanceFunction::Cosine | DistanceFunction::Ip => 1.0 - score,
            DistanceFunction::L2 => score,
        }
    }
}

/// Vector parameters of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CollectionConfiguration {
    /// Dimension of every vector stored in the collection.
    pub size: usize,

    /// How vectors are compared.
    pub distance: DistanceFunction,
}

impl Default for CollectionConfiguration {
    fn default() -> Self {
        Self {
            size: DEFAULT_VECTOR_SIZE,
            distance: DistanceFunction::default(),
        }
    }
}

/// The configuration string accepted on collection creation.
/// Every key is optional and falls back to the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigurationOverrides {
    size: Option<usize>,
    distance: Option<DistanceFunction>,
}

impl CollectionConfiguration {
    /// Parse a JSON configuration string on top of `self`.
    ///
    /// * `input`: e.g. `{"size": 384, "distance": "l2"}`.
    pub fn merge_json(self, input: &str) -> Result<Self, VecgateError> {
        let overrides: ConfigurationOverrides = match serde_json::from_str(input) {
            Ok(o) => o,
            Err(e) => return err!(InvalidConfiguration, "{e}"),
        };

        let size = overrides.size.unwrap_or(self.size);
        if size == 0 {
            return err!(InvalidConfiguration, "vector size must be greater than 0");
        }

        Ok(Self {
            size,
            distance: overrides.distance.unwrap_or(self.distance),
        })
    }
}

/// A collection as the vector store describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreCollection {
    pub id: Uuid,
    pub name: String,
    pub configuration: CollectionConfiguration,
    pub metadata: Option<Vec<String>>,
}

impl StoreCollection {
    pub fn new(
        name: &str,
        configuration: CollectionConfiguration,
        metadata: Option<Vec<String>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            configuration,
            metadata,
        }
    }
}

/// Collection view returned to API callers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionSummary {
    pub id: Uuid,
    pub name: String,
    pub configuration_json: CollectionConfiguration,
    pub meta_data: Option<Vec<String>>,
}

impl From<StoreCollection> for CollectionSummary {
    fn from(value: StoreCollection) -> Self {
        Self {
            id: value.id,
            name: value.name,
            configuration_json: value.configuration,
            meta_data: value.metadata,
        }
    }
}
