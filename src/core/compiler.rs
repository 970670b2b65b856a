//! SC-013: Template compiler pipeline.
//!
//! decode -> resolve (with conditions) -> layers -> tables/buckets -> functions.
//! Each call owns its parameters, condition cache and warnings, so compiles on
//! different threads never share writable state.

use super::decoder::decode_template;
use super::defaults::FunctionDefaults;
use super::error::CompileError;
use super::functions::collect_functions;
use super::intrinsics::{IntrinsicResolver, Parameters};
use super::node::{Mapping, Node};
use super::resources::{collect_backing_resources, collect_layers};
use super::types::ParseResult;
use super::warnings::Warnings;
use tracing::instrument;

/// Compile template text with caller parameter overrides.
#[instrument(skip_all, fields(bytes = content.len(), overrides = overrides.len()))]
pub fn compile_template(content: &str, overrides: &Parameters) -> Result<ParseResult, CompileError> {
    let document = decode_template(content)?;

    let mut parameters = parameter_defaults(&document);
    parameters.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    tracing::debug!(parameters = parameters.len(), "merged parameters");

    let conditions = document
        .get("Conditions")
        .and_then(Node::as_map)
        .cloned()
        .unwrap_or_default();
    let mut resolver = IntrinsicResolver::new(parameters).with_conditions(conditions);
    let resolved = resolver.resolve(&Node::Mapping(document));
    let Node::Mapping(root) = resolved else {
        return Err(CompileError::UnexpectedRoot);
    };

    let mut warnings = resolver.take_warnings();
    let Some(resources) = root.get("Resources").and_then(Node::as_map) else {
        tracing::debug!("template has no Resources");
        return Ok(ParseResult {
            warnings: warnings.into_vec(),
            ..ParseResult::default()
        });
    };

    let defaults = FunctionDefaults::from_template(&root);
    let result = extract(resources, &defaults, &mut warnings)?;
    Ok(ParseResult {
        warnings: warnings.into_vec(),
        ..result
    })
}

fn extract(
    resources: &Mapping,
    defaults: &FunctionDefaults,
    warnings: &mut Warnings,
) -> Result<ParseResult, CompileError> {
    let layers = collect_layers(resources);
    let mut spec = collect_backing_resources(resources, warnings);
    spec.layers = layers.values().cloned().collect();

    let mut functions = collect_functions(resources, defaults, &layers, warnings)?;
    functions.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.logical_id.cmp(&b.logical_id)));

    Ok(ParseResult {
        functions,
        resources: spec,
        warnings: Vec::new(),
    })
}

/// Declared `Parameters.*.Default` values, stringified. Null defaults are skipped.
pub fn parameter_defaults(document: &Mapping) -> Parameters {
    let Some(declared) = document.get("Parameters").and_then(Node::as_map) else {
        return Parameters::new();
    };
    declared
        .iter()
        .filter_map(|(name, decl)| {
            let default = decl.field("Default")?;
            Some((name.clone(), default.as_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{EventSpec, Packaging};

    fn compile(yaml: &str) -> ParseResult {
        compile_template(yaml, &Parameters::new()).unwrap()
    }

    fn overrides(pairs: &[(&str, &str)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const FULL: &str = r#"
AWSTemplateFormatVersion: "2010-09-09"
Transform: AWS::Serverless-2016-10-31
Parameters:
  Stage:
    Type: String
    Default: dev
  Memory:
    Type: Number
    Default: 256
  Unset:
    Type: String
Conditions:
  IsProd: !Equals [ !Ref Stage, prod ]
  UseBig: !Or [ !Condition IsProd, !Equals [ !Ref Memory, "1024" ] ]
Globals:
  Function:
    Runtime: python3.11
    Timeout: 10
    Layers: [ !Ref SharedLayer ]
    Environment:
      Variables:
        STAGE: !Ref Stage
        SHARED: global
Resources:
  SharedLayer:
    Type: AWS::Serverless::LayerVersion
    Properties:
      LayerName: !Sub "shared-${Stage}"
      ContentUri: layers/shared
  OrdersTable:
    Type: AWS::DynamoDB::Table
    Properties:
      TableName: !Sub "orders-${Stage}"
      BillingMode: PAY_PER_REQUEST
      KeySchema:
        - { AttributeName: id, KeyType: HASH }
  Uploads:
    Type: AWS::S3::Bucket
  ZFunction:
    Type: AWS::Serverless::Function
    Properties:
      FunctionName: !Sub "${Stage}-api"
      CodeUri: functions/api/
      MemorySize: !If [ UseBig, 1024, !Ref Memory ]
      Environment:
        Variables:
          SHARED: mine
          TABLE: !Ref OrdersTable
          TABLE_ARN: !GetAtt OrdersTable.Arn
      Events:
        Get:
          Type: Api
          Properties: { Path: /orders, Method: GET }
  AFunction:
    Type: AWS::Serverless::Function
    Properties:
      FunctionName: !Join [ "-", [ !Ref Stage, worker ] ]
      CodeUri: functions/worker
"#;

    #[test]
    fn test_sc013_full_template() {
        let out = compile(FULL);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);

        let names: Vec<&str> = out.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["dev-api", "dev-worker"]);

        let api = &out.functions[0];
        assert_eq!(api.logical_id, "ZFunction");
        assert_eq!(api.memory_size, 256);
        assert_eq!(api.timeout, 10);
        assert_eq!(api.environment["STAGE"], "dev");
        assert_eq!(api.environment["SHARED"], "mine");
        assert_eq!(api.environment["TABLE"], "OrdersTable");
        assert_eq!(
            api.environment["TABLE_ARN"],
            "arn:aws:local:Arn:global:OrdersTable/Arn"
        );
        assert_eq!(
            api.events,
            vec![EventSpec::Api {
                path: "/orders".to_string(),
                method: "get".to_string()
            }]
        );
        let code = api.code().unwrap();
        assert_eq!(code.runtime, "python3.11");
        assert_eq!(code.layers[0].name, "shared-dev");

        assert_eq!(out.resources.dynamodb[0].table_name, "orders-dev");
        assert_eq!(out.resources.s3[0].bucket_name, "uploads");
        assert_eq!(out.resources.layers[0].content_uri, "layers/shared/");
    }

    #[test]
    fn test_sc013_overrides_win_and_drive_conditions() {
        let out = compile_template(FULL, &overrides(&[("Stage", "prod")])).unwrap();
        let api = out.functions.iter().find(|f| f.logical_id == "ZFunction").unwrap();
        assert_eq!(api.name, "prod-api");
        assert_eq!(api.memory_size, 1024);
        assert_eq!(api.environment["STAGE"], "prod");
    }

    #[test]
    fn test_sc013_deterministic() {
        let a = compile(FULL);
        let b = compile(FULL);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_sc013_single_function_end_to_end() {
        let out = compile(
            r#"
Resources:
  HelloFunction:
    Type: AWS::Serverless::Function
    Properties:
      CodeUri: functions/hello/
"#,
        );
        assert_eq!(out.functions.len(), 1);
        let f = &out.functions[0];
        assert_eq!(f.name, "HelloFunction");
        assert_eq!(f.timeout, 30);
        assert_eq!(f.memory_size, 128);
        match &f.packaging {
            Packaging::Zip(code) => {
                assert_eq!(code.runtime, "python3.12");
                assert_eq!(code.handler, "lambda_function.lambda_handler");
                assert_eq!(code.code_uri, "functions/hello/");
            }
            Packaging::Image(_) => panic!("expected zip packaging"),
        }
        assert!(out.resources.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_sc013_image_uri_resolution_gate() {
        let template = r#"
Parameters:
  Tag: { Type: String }
Resources:
  ImgFn:
    Type: AWS::Serverless::Function
    Properties:
      PackageType: Image
      ImageUri: !Sub "registry/img:${Tag}"
"#;
        let err = compile_template(template, &Parameters::new()).unwrap_err();
        assert_eq!(err.logical_id(), Some("ImgFn"));
        assert!(err.to_string().contains("has unresolved ImageUri: registry/img:${Tag}"));

        let out = compile_template(template, &overrides(&[("Tag", "v1")])).unwrap();
        let f = &out.functions[0];
        assert_eq!(f.image().unwrap().image_source, "registry/img:v1");
        assert!(f.code().is_none());
    }

    #[test]
    fn test_sc013_no_resources_is_empty_result() {
        let out = compile("Parameters:\n  A: { Default: x }\n");
        assert_eq!(out, ParseResult::default());
    }

    #[test]
    fn test_sc013_decode_errors_are_fatal() {
        assert!(matches!(
            compile_template("", &Parameters::new()),
            Err(CompileError::Decode(_))
        ));
        assert!(matches!(
            compile_template("- not\n- a mapping\n", &Parameters::new()),
            Err(CompileError::Decode(_))
        ));
    }

    #[test]
    fn test_sc013_warnings_merged_resolver_first() {
        let out = compile(
            r#"
Conditions:
  A: !Condition B
  B: !Condition A
Resources:
  Fn:
    Type: AWS::Serverless::Function
    Properties:
      Timeout: !If [ A, 5, 6 ]
  Bare:
    Type: AWS::Serverless::Function
"#,
        );
        assert_eq!(
            out.warnings,
            vec![
                "Circular dependency detected in condition \"A\"".to_string(),
                "function Bare has no Properties; skipped".to_string(),
            ]
        );
        assert_eq!(out.functions[0].timeout, 6);
    }

    #[test]
    fn test_sc013_condition_values_ignore_section_order() {
        let head = r#"
Parameters:
  Stage: { Type: String, Default: dev }
Conditions:
  C0: !Equals [ !Ref Stage, dev ]
  C1: !And [ !Condition C0, true ]
  C2: !And [ !Condition C1, true ]
  C3: !And [ !Condition C2, true ]
  C4: !And [ !Condition C3, true ]
  C5: !And [ !Condition C4, true ]
"#;
        let resources = r#"
Resources:
  Api:
    Type: AWS::Serverless::Function
    Properties:
      Environment:
        Variables:
          X: !Join [ "", [ !If [ C5, "yes", "no" ] ] ]
"#;
        let outputs = r#"
Outputs:
  Flag:
    Value: !If [ C5, "on", "off" ]
"#;
        let outputs_first = compile(&format!("{head}{outputs}{resources}"));
        let resources_first = compile(&format!("{head}{resources}{outputs}"));
        assert_eq!(outputs_first, resources_first);
        assert_eq!(resources_first.functions[0].environment["X"], "yes");
        assert!(resources_first.warnings.is_empty(), "{:?}", resources_first.warnings);
    }

    #[test]
    fn test_sc013_parameter_defaults_stringified() {
        let doc = decode_template(
            "Parameters:\n  N: { Default: 5 }\n  B: { Default: true }\n  Z: { Default: ~ }\n",
        )
        .unwrap();
        let p = parameter_defaults(&doc);
        assert_eq!(p["N"], "5");
        assert_eq!(p["B"], "true");
        assert!(!p.contains_key("Z"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_sc013_function_order_ignores_document_order(
                names in prop::collection::btree_set("[A-Z][a-z]{2,8}", 1..6)
            ) {
                let mut forward = String::from("Resources:\n");
                let mut backward = String::from("Resources:\n");
                let body = |n: &str| format!(
                    "  {n}:\n    Type: AWS::Serverless::Function\n    Properties:\n      CodeUri: src/{n}\n"
                );
                for n in &names {
                    forward.push_str(&body(n));
                }
                for n in names.iter().rev() {
                    backward.push_str(&body(n));
                }
                let a = compile_template(&forward, &Parameters::new()).unwrap();
                let b = compile_template(&backward, &Parameters::new()).unwrap();
                prop_assert_eq!(a, b);
            }
        }
    }
}
