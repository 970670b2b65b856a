//! SC-006: Documented defaults and `Globals.Function` extraction.

use super::node::{Mapping, Node};
use std::collections::BTreeMap;

pub const DEFAULT_RUNTIME: &str = "python3.12";
pub const DEFAULT_HANDLER: &str = "lambda_function.lambda_handler";
pub const DEFAULT_TIMEOUT: i64 = 30;
pub const DEFAULT_MEMORY_SIZE: i64 = 128;
pub const DEFAULT_CODE_URI: &str = "./";
pub const DEFAULT_BILLING_MODE: &str = "PROVISIONED";

/// Property values every function inherits unless it overrides them.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefaults {
    pub runtime: String,
    pub handler: String,
    pub timeout: i64,
    pub memory_size: i64,
    /// Raw layer references, resolved against the layer lookup per function.
    pub layers: Option<Vec<Node>>,
    pub architectures: Vec<String>,
    pub update_runtime_on: Option<String>,
    pub environment: BTreeMap<String, String>,
}

impl Default for FunctionDefaults {
    fn default() -> Self {
        Self {
            runtime: DEFAULT_RUNTIME.to_string(),
            handler: DEFAULT_HANDLER.to_string(),
            timeout: DEFAULT_TIMEOUT,
            memory_size: DEFAULT_MEMORY_SIZE,
            layers: None,
            architectures: Vec::new(),
            update_runtime_on: None,
            environment: BTreeMap::new(),
        }
    }
}

impl FunctionDefaults {
    /// Overlay `Globals.Function` from a resolved template root.
    pub fn from_template(root: &Mapping) -> Self {
        let globals = root
            .get("Globals")
            .and_then(|g| g.field("Function"))
            .and_then(Node::as_map);
        match globals {
            Some(globals) => Self::from_globals(globals),
            None => Self::default(),
        }
    }

    pub fn from_globals(globals: &Mapping) -> Self {
        let mut defaults = Self::default();
        let field = |key: &str| globals.get(key).filter(|n| !n.is_null());

        if let Some(runtime) = field("Runtime") {
            defaults.runtime = runtime.as_string();
        }
        if let Some(handler) = field("Handler") {
            defaults.handler = handler.as_string();
        }
        if let Some(timeout) = field("Timeout") {
            defaults.timeout = timeout.as_int_or(0);
        }
        if let Some(memory) = field("MemorySize") {
            defaults.memory_size = memory.as_int_or(0);
        }
        if let Some(layers) = field("Layers") {
            defaults.layers = Some(layers.to_list());
        }
        if let Some(archs) = field("Architectures") {
            defaults.architectures = archs.to_string_list();
        }
        defaults.update_runtime_on = field("RuntimeManagementConfig").and_then(update_runtime_on);
        if let Some(vars) = field("Environment").and_then(|env| env.field("Variables")) {
            defaults.environment = environment_variables(vars);
        }
        defaults
    }
}

/// `UpdateRuntimeOn` of a `RuntimeManagementConfig` block, if set.
pub fn update_runtime_on(config: &Node) -> Option<String> {
    config
        .field("UpdateRuntimeOn")
        .map(Node::as_string)
        .filter(|s| !s.is_empty())
}

/// Stringify an `Environment.Variables` mapping.
pub fn environment_variables(vars: &Node) -> BTreeMap<String, String> {
    vars.as_map()
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.as_string())).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decoder::decode_template;

    #[test]
    fn test_sc006_no_globals_uses_documented_defaults() {
        let root = decode_template("Resources: {}\n").unwrap();
        let d = FunctionDefaults::from_template(&root);
        assert_eq!(d.runtime, "python3.12");
        assert_eq!(d.handler, "lambda_function.lambda_handler");
        assert_eq!(d.timeout, 30);
        assert_eq!(d.memory_size, 128);
        assert!(d.layers.is_none());
        assert!(d.architectures.is_empty());
        assert!(d.environment.is_empty());
    }

    #[test]
    fn test_sc006_globals_overlay() {
        let root = decode_template(
            r#"
Globals:
  Function:
    Runtime: nodejs20.x
    Handler: index.handler
    Timeout: "15"
    MemorySize: 512
    Layers: [ CommonLayer ]
    Architectures: arm64
    RuntimeManagementConfig:
      UpdateRuntimeOn: FunctionUpdate
    Environment:
      Variables:
        SHARED: base
        PORT: 8080
"#,
        )
        .unwrap();
        let d = FunctionDefaults::from_template(&root);
        assert_eq!(d.runtime, "nodejs20.x");
        assert_eq!(d.handler, "index.handler");
        assert_eq!(d.timeout, 15);
        assert_eq!(d.memory_size, 512);
        assert_eq!(d.layers, Some(vec![Node::from("CommonLayer")]));
        assert_eq!(d.architectures, vec!["arm64"]);
        assert_eq!(d.update_runtime_on.as_deref(), Some("FunctionUpdate"));
        assert_eq!(d.environment["SHARED"], "base");
        assert_eq!(d.environment["PORT"], "8080");
    }

    #[test]
    fn test_sc006_null_globals_ignored() {
        let root = decode_template("Globals:\n  Function:\n    Runtime: ~\n").unwrap();
        assert_eq!(FunctionDefaults::from_template(&root).runtime, DEFAULT_RUNTIME);
    }
}
