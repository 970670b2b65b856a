//! samc: SAM/CloudFormation template compiler.
//!
//! Decodes short-form tagged YAML, resolves intrinsic functions and named
//! conditions against a parameter set, and extracts typed function, layer,
//! table and bucket specs in deterministic order.
//!
//! ```
//! use samc::core::{compile_template, Parameters};
//!
//! let template = "Resources:\n  Hello:\n    Type: AWS::Serverless::Function\n    Properties:\n      CodeUri: src/hello\n";
//! let result = compile_template(template, &Parameters::new()).unwrap();
//! assert_eq!(result.functions[0].name, "Hello");
//! ```

pub mod cli;
pub mod core;
pub mod fingerprint;
