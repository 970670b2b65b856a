//! SC-010: Typed compile output.
//!
//! Everything a downstream build needs about functions, layers, tables and
//! buckets. Function/layer types use Rust field names; table and bucket specs
//! keep CloudFormation's PascalCase so they decode straight from resource
//! properties.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Compile result
// ============================================================================

/// Output of one compile call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParseResult {
    /// Functions, sorted by name
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,

    #[serde(default)]
    pub resources: ResourcesSpec,

    /// Non-fatal diagnostics, de-duplicated, first-seen order
    #[serde(default)]
    pub warnings: Vec<String>,
}

// ============================================================================
// Functions
// ============================================================================

/// A deployable function with every default applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FunctionSpec {
    /// Key under `Resources`
    pub logical_id: String,

    /// `FunctionName`, or the logical id
    pub name: String,

    /// How the function's code is shipped
    pub packaging: Packaging,

    /// Seconds
    pub timeout: i64,

    /// MiB
    pub memory_size: i64,

    /// Globals environment merged with the function's own
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default)]
    pub architectures: Vec<String>,

    #[serde(default)]
    pub scaling: ScalingSpec,

    /// Sorted by event name
    #[serde(default)]
    pub events: Vec<EventSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_management: Option<RuntimeManagement>,
}

impl FunctionSpec {
    pub fn is_image(&self) -> bool {
        matches!(self.packaging, Packaging::Image(_))
    }

    pub fn code(&self) -> Option<&CodePackage> {
        match &self.packaging {
            Packaging::Zip(code) => Some(code),
            Packaging::Image(_) => None,
        }
    }

    pub fn image(&self) -> Option<&ImagePackage> {
        match &self.packaging {
            Packaging::Image(image) => Some(image),
            Packaging::Zip(_) => None,
        }
    }
}

/// Exactly one packaging group per function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Packaging {
    Zip(CodePackage),
    Image(ImagePackage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CodePackage {
    pub runtime: String,
    pub handler: String,
    /// Always ends with `/`
    pub code_uri: String,
    /// Set by the staging step, never by the compiler
    #[serde(default)]
    pub has_requirements: bool,
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImagePackage {
    /// Fully resolved image reference
    pub image_source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScalingSpec {
    /// `ReservedConcurrentExecutions`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<i64>,

    /// `ProvisionedConcurrencyConfig.ProvisionedConcurrentExecutions`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_capacity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum EventSpec {
    Api {
        path: String,
        /// Lower-cased
        method: String,
    },
    Schedule {
        expression: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuntimeManagement {
    pub update_runtime_on: String,
}

// ============================================================================
// Resources
// ============================================================================

/// Backing resources and layers, each list sorted by logical id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResourcesSpec {
    #[serde(default)]
    pub dynamodb: Vec<DynamoDbSpec>,
    #[serde(default)]
    pub s3: Vec<S3Spec>,
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
}

impl ResourcesSpec {
    pub fn is_empty(&self) -> bool {
        self.dynamodb.is_empty() && self.s3.is_empty() && self.layers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LayerSpec {
    pub name: String,
    /// Always ends with `/`
    pub content_uri: String,
    #[serde(default)]
    pub compatible_architectures: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct DynamoDbSpec {
    pub table_name: String,
    #[serde(default)]
    pub key_schema: Vec<KeySchemaElement>,
    #[serde(default)]
    pub attribute_definitions: Vec<AttributeDefinition>,
    #[serde(default)]
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    pub billing_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    #[serde(deserialize_with = "lenient::string")]
    pub attribute_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub key_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    #[serde(deserialize_with = "lenient::string")]
    pub attribute_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub attribute_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisionedThroughput {
    #[serde(deserialize_with = "lenient::int")]
    pub read_capacity_units: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub write_capacity_units: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Projection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_key_attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct GlobalSecondaryIndex {
    #[serde(deserialize_with = "lenient::string")]
    pub index_name: String,
    #[serde(default)]
    pub key_schema: Vec<KeySchemaElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<Projection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct S3Spec {
    pub bucket_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_configuration: Option<LifecycleConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleConfiguration {
    #[serde(default)]
    pub rules: Vec<LifecycleRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_in_days: Option<i64>,
}

/// Scalar deserializers that accept what template authors actually write:
/// numbers where strings are expected and numeric strings where ints are.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Int(i64),
        Float(f64),
        Bool(bool),
        Str(String),
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Scalar::deserialize(d)? {
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(x) => x.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Str(s) => s,
        })
    }

    fn to_int<E: Error>(scalar: Scalar) -> Result<i64, E> {
        match scalar {
            Scalar::Int(i) => Ok(i),
            Scalar::Float(x) if x.is_finite() => Ok(x.trunc() as i64),
            Scalar::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("expected an integer, got {:?}", s))),
            _ => Err(E::custom("expected an integer")),
        }
    }

    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        to_int(Scalar::deserialize(d)?)
    }

    pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Option::<Scalar>::deserialize(d)?.map(to_int).transpose()
    }
}
