//! SC-012: Function extraction (pass 3).
//!
//! Merges each function's own properties over the `Globals.Function`
//! defaults. Image functions are gated here: an image URI that is empty or
//! still templated after resolution fails the whole compile.

use super::defaults::{environment_variables, update_runtime_on, FunctionDefaults, DEFAULT_CODE_URI};
use super::error::CompileError;
use super::node::{ensure_trailing_slash, Mapping, Node};
use super::resources::{resource_type, sorted_resources, LayerLookup, LAMBDA_FUNCTION, SERVERLESS_FUNCTION};
use super::types::{
    CodePackage, EventSpec, FunctionSpec, ImagePackage, LayerSpec, Packaging, RuntimeManagement,
    ScalingSpec,
};
use super::warnings::Warnings;
use std::collections::BTreeMap;

/// Extract every function-shaped resource, in logical-id order.
pub fn collect_functions(
    resources: &Mapping,
    defaults: &FunctionDefaults,
    layers: &LayerLookup,
    warnings: &mut Warnings,
) -> Result<Vec<FunctionSpec>, CompileError> {
    let mut functions = Vec::new();
    for (logical_id, resource) in sorted_resources(resources) {
        let kind = resource_type(resource);
        if kind != SERVERLESS_FUNCTION && kind != LAMBDA_FUNCTION {
            continue;
        }
        let Some(props) = resource.field("Properties").and_then(Node::as_map) else {
            warnings.pushf(format_args!(
                "function {} has no Properties; skipped",
                logical_id
            ));
            continue;
        };
        let spec = if kind == SERVERLESS_FUNCTION {
            Some(serverless_function(logical_id, props, defaults, layers)?)
        } else {
            lambda_function(logical_id, props, defaults, warnings)?
        };
        functions.extend(spec);
    }
    tracing::debug!(functions = functions.len(), "collected functions");
    Ok(functions)
}

/// Fields both function shapes share.
struct Common {
    name: String,
    timeout: i64,
    memory_size: i64,
    environment: BTreeMap<String, String>,
    architectures: Vec<String>,
    scaling: ScalingSpec,
}

impl Common {
    fn new(logical_id: &str, props: &Mapping, defaults: &FunctionDefaults) -> Self {
        let field = |key: &str| props.get(key).filter(|n| !n.is_null());
        Self {
            name: field("FunctionName")
                .map(|n| n.as_string_or(logical_id))
                .unwrap_or_else(|| logical_id.to_string()),
            timeout: field("Timeout").map_or(defaults.timeout, |n| n.as_int_or(defaults.timeout)),
            memory_size: field("MemorySize")
                .map_or(defaults.memory_size, |n| n.as_int_or(defaults.memory_size)),
            environment: merge_environment(&defaults.environment, props),
            architectures: field("Architectures")
                .map(Node::to_string_list)
                .unwrap_or_else(|| defaults.architectures.clone()),
            scaling: scaling(props),
        }
    }

    fn into_spec(
        self,
        logical_id: &str,
        packaging: Packaging,
        events: Vec<EventSpec>,
        runtime_management: Option<RuntimeManagement>,
    ) -> FunctionSpec {
        FunctionSpec {
            logical_id: logical_id.to_string(),
            name: self.name,
            packaging,
            timeout: self.timeout,
            memory_size: self.memory_size,
            environment: self.environment,
            architectures: self.architectures,
            scaling: self.scaling,
            events,
            runtime_management,
        }
    }
}

fn serverless_function(
    logical_id: &str,
    props: &Mapping,
    defaults: &FunctionDefaults,
    layers: &LayerLookup,
) -> Result<FunctionSpec, CompileError> {
    let common = Common::new(logical_id, props, defaults);
    let events = props.get("Events").map(parse_events).unwrap_or_default();

    let image_uri = props.get("ImageUri").map(|n| n.as_string().trim().to_string());
    let is_image = props
        .get("PackageType")
        .is_some_and(|p| p.as_string().eq_ignore_ascii_case("Image"))
        || image_uri.as_deref().is_some_and(|u| !u.is_empty());

    if is_image {
        let image_source = checked_image_uri(
            &common.name,
            logical_id,
            "ImageUri",
            image_uri.unwrap_or_default(),
        )?;
        return Ok(common.into_spec(
            logical_id,
            Packaging::Image(ImagePackage { image_source }),
            events,
            None,
        ));
    }

    let code_uri = props
        .get("CodeUri")
        .map(|n| n.as_string_or(DEFAULT_CODE_URI))
        .unwrap_or_else(|| DEFAULT_CODE_URI.to_string());
    let handler = props
        .get("Handler")
        .map(|n| n.as_string_or(&defaults.handler))
        .unwrap_or_else(|| defaults.handler.clone());
    let runtime = props
        .get("Runtime")
        .map(|n| n.as_string_or(&defaults.runtime))
        .unwrap_or_else(|| defaults.runtime.clone());

    let layer_refs = match props.get("Layers").filter(|n| !n.is_null()) {
        Some(own) => own.to_list(),
        None => defaults.layers.clone().unwrap_or_default(),
    };
    let runtime_management = props
        .get("RuntimeManagementConfig")
        .and_then(update_runtime_on)
        .or_else(|| defaults.update_runtime_on.clone())
        .map(|update_runtime_on| RuntimeManagement { update_runtime_on });

    let code = CodePackage {
        runtime,
        handler,
        code_uri: ensure_trailing_slash(&code_uri),
        has_requirements: false,
        layers: resolve_layers(&layer_refs, layers),
    };
    Ok(common.into_spec(logical_id, Packaging::Zip(code), events, runtime_management))
}

/// `AWS::Lambda::Function` is only extracted in image mode.
fn lambda_function(
    logical_id: &str,
    props: &Mapping,
    defaults: &FunctionDefaults,
    warnings: &mut Warnings,
) -> Result<Option<FunctionSpec>, CompileError> {
    let package_type = props.get("PackageType").map(Node::as_string).unwrap_or_default();
    let image_uri = props
        .get("Code")
        .and_then(|c| c.get("ImageUri"))
        .map(|n| n.as_string().trim().to_string())
        .unwrap_or_default();

    if !package_type.trim().eq_ignore_ascii_case("Image") && image_uri.is_empty() {
        warnings.pushf(format_args!(
            "{} {} uses zip packaging, which is not supported; skipped",
            LAMBDA_FUNCTION, logical_id
        ));
        return Ok(None);
    }

    let common = Common::new(logical_id, props, defaults);
    let image_source = checked_image_uri(&common.name, logical_id, "Code.ImageUri", image_uri)?;
    Ok(Some(common.into_spec(
        logical_id,
        Packaging::Image(ImagePackage { image_source }),
        Vec::new(),
        None,
    )))
}

fn checked_image_uri(
    name: &str,
    logical_id: &str,
    field: &'static str,
    uri: String,
) -> Result<String, CompileError> {
    if uri.is_empty() {
        return Err(CompileError::MissingImageUri {
            name: name.to_string(),
            logical_id: logical_id.to_string(),
            field,
        });
    }
    if uri.contains("${") {
        return Err(CompileError::UnresolvedImageUri {
            name: name.to_string(),
            logical_id: logical_id.to_string(),
            field,
            uri,
        });
    }
    Ok(uri)
}

/// Globals variables first, the function's own on top.
fn merge_environment(
    defaults: &BTreeMap<String, String>,
    props: &Mapping,
) -> BTreeMap<String, String> {
    let mut merged = defaults.clone();
    if let Some(vars) = props.get("Environment").and_then(|e| e.field("Variables")) {
        merged.extend(environment_variables(vars));
    }
    merged
}

fn scaling(props: &Mapping) -> ScalingSpec {
    ScalingSpec {
        max_capacity: props.get("ReservedConcurrentExecutions").and_then(Node::as_int),
        min_capacity: props
            .get("ProvisionedConcurrencyConfig")
            .and_then(|p| p.get("ProvisionedConcurrentExecutions"))
            .and_then(Node::as_int),
    }
}

/// Api and Schedule events, sorted by event name. Others are dropped.
fn parse_events(node: &Node) -> Vec<EventSpec> {
    let Some(events) = node.as_map() else {
        return Vec::new();
    };
    let mut names: Vec<&String> = events.keys().collect();
    names.sort_unstable();

    let mut out = Vec::new();
    for name in names {
        let event = &events[name];
        let Some(props) = event.field("Properties").filter(|p| p.as_map().is_some()) else {
            continue;
        };
        let text = |key: &str| props.get(key).map(Node::as_string).unwrap_or_default();
        match event.get("Type").map(Node::as_string).as_deref() {
            Some("Api") => {
                let (path, method) = (text("Path"), text("Method"));
                if path.is_empty() || method.is_empty() {
                    continue;
                }
                out.push(EventSpec::Api {
                    path,
                    method: method.to_lowercase(),
                });
            }
            Some("Schedule") => {
                let expression = text("Schedule");
                if expression.is_empty() {
                    continue;
                }
                let input = Some(text("Input")).filter(|s| !s.is_empty());
                out.push(EventSpec::Schedule { expression, input });
            }
            _ => {}
        }
    }
    out
}

/// Look up layer references. Unknown ids are dropped.
fn resolve_layers(refs: &[Node], layers: &LayerLookup) -> Vec<LayerSpec> {
    refs.iter()
        .filter_map(|r| match r {
            Node::String(id) => Some(id.clone()),
            other => other.get("Ref").map(Node::as_string),
        })
        .filter(|id| !id.is_empty())
        .filter_map(|id| layers.get(&id).cloned())
        .collect()
}
