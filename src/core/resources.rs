//! SC-011: Layer and backing-resource extraction (passes 1 and 2).
//!
//! Every pass walks `Resources` in logical-id order so the output never
//! depends on document order.

use super::defaults::{DEFAULT_BILLING_MODE, DEFAULT_CODE_URI};
use super::node::{ensure_trailing_slash, Mapping, Node};
use super::types::{DynamoDbSpec, LayerSpec, ResourcesSpec, S3Spec};
use super::warnings::Warnings;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

pub const SERVERLESS_FUNCTION: &str = "AWS::Serverless::Function";
pub const LAMBDA_FUNCTION: &str = "AWS::Lambda::Function";
pub const SERVERLESS_LAYER: &str = "AWS::Serverless::LayerVersion";
pub const DYNAMODB_TABLE: &str = "AWS::DynamoDB::Table";
pub const S3_BUCKET: &str = "AWS::S3::Bucket";

/// Layers by logical id, for function layer references.
pub type LayerLookup = BTreeMap<String, LayerSpec>;

/// `(logical id, resource)` pairs sorted by logical id.
pub(crate) fn sorted_resources(resources: &Mapping) -> Vec<(&str, &Node)> {
    let mut entries: Vec<(&str, &Node)> =
        resources.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_unstable_by_key(|(id, _)| *id);
    entries
}

pub(crate) fn resource_type(resource: &Node) -> String {
    resource.field("Type").map(Node::as_string).unwrap_or_default()
}

/// Pass 1: every `AWS::Serverless::LayerVersion` with properties.
pub fn collect_layers(resources: &Mapping) -> LayerLookup {
    let mut lookup = LayerLookup::new();
    for (logical_id, resource) in sorted_resources(resources) {
        if resource_type(resource) != SERVERLESS_LAYER {
            continue;
        }
        let Some(props) = resource.field("Properties").filter(|p| p.as_map().is_some()) else {
            continue;
        };
        let name = props
            .field("LayerName")
            .map(|n| n.as_string_or(logical_id))
            .unwrap_or_else(|| logical_id.to_string());
        let content_uri = props
            .field("ContentUri")
            .map(|n| n.as_string_or(DEFAULT_CODE_URI))
            .unwrap_or_else(|| DEFAULT_CODE_URI.to_string());
        let compatible_architectures = props
            .field("CompatibleArchitectures")
            .map(Node::to_string_list)
            .unwrap_or_default();

        lookup.insert(
            logical_id.to_string(),
            LayerSpec {
                name,
                content_uri: ensure_trailing_slash(&content_uri),
                compatible_architectures,
            },
        );
    }
    tracing::debug!(layers = lookup.len(), "collected layers");
    lookup
}

/// Pass 2: tables and buckets. Layers are filled in by the caller.
pub fn collect_backing_resources(resources: &Mapping, warnings: &mut Warnings) -> ResourcesSpec {
    let mut spec = ResourcesSpec::default();
    for (logical_id, resource) in sorted_resources(resources) {
        let props = resource.field("Properties");
        match resource_type(resource).as_str() {
            DYNAMODB_TABLE => spec.dynamodb.push(dynamodb_table(logical_id, props, warnings)),
            S3_BUCKET => spec.s3.push(s3_bucket(logical_id, props, warnings)),
            _ => {}
        }
    }
    tracing::debug!(
        tables = spec.dynamodb.len(),
        buckets = spec.s3.len(),
        "collected backing resources"
    );
    spec
}

fn dynamodb_table(logical_id: &str, props: Option<&Node>, warnings: &mut Warnings) -> DynamoDbSpec {
    let mut decode = PropertyDecoder {
        props,
        owner: "DynamoDB table",
        logical_id,
        warnings,
    };
    DynamoDbSpec {
        key_schema: decode.field("KeySchema").unwrap_or_default(),
        attribute_definitions: decode.field("AttributeDefinitions").unwrap_or_default(),
        global_secondary_indexes: decode.field("GlobalSecondaryIndexes").unwrap_or_default(),
        provisioned_throughput: decode.field("ProvisionedThroughput"),
        table_name: string_or(props, "TableName", logical_id),
        billing_mode: string_or(props, "BillingMode", DEFAULT_BILLING_MODE),
    }
}

fn s3_bucket(logical_id: &str, props: Option<&Node>, warnings: &mut Warnings) -> S3Spec {
    let mut decode = PropertyDecoder {
        props,
        owner: "S3 bucket",
        logical_id,
        warnings,
    };
    S3Spec {
        lifecycle_configuration: decode.field("LifecycleConfiguration"),
        bucket_name: string_or(props, "BucketName", &logical_id.to_lowercase()),
    }
}

fn string_or(props: Option<&Node>, key: &str, fallback: &str) -> String {
    props
        .and_then(|p| p.field(key))
        .map(|n| n.as_string_or(fallback))
        .unwrap_or_else(|| fallback.to_string())
}

/// Decodes one property at a time so a bad property only costs itself.
struct PropertyDecoder<'a> {
    props: Option<&'a Node>,
    owner: &'static str,
    logical_id: &'a str,
    warnings: &'a mut Warnings,
}

impl PropertyDecoder<'_> {
    fn field<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let node = self.props?.field(key)?;
        match serde_json::from_value(node.to_json()) {
            Ok(value) => Some(value),
            Err(e) => {
                self.warnings.pushf(format_args!(
                    "failed to decode {} for {} {}: {}",
                    key, self.owner, self.logical_id, e
                ));
                None
            }
        }
    }
}
