//! SC-014: JSON Schema of the compile output, built once per process.

use super::types::ParseResult;
use once_cell::sync::Lazy;

static OUTPUT_SCHEMA: Lazy<serde_json::Value> = Lazy::new(|| {
    let schema = schemars::schema_for!(ParseResult);
    serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
});

/// Schema describing [`ParseResult`]. The first caller builds it; concurrent
/// first callers wait on the same initialization.
pub fn output_schema() -> &'static serde_json::Value {
    &OUTPUT_SCHEMA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sc014_schema_describes_result() {
        let schema = output_schema();
        assert_eq!(schema["title"], "ParseResult");
        let props = schema["properties"].as_object().unwrap();
        assert!(props.contains_key("functions"));
        assert!(props.contains_key("resources"));
        assert!(props.contains_key("warnings"));
        assert!(schema["definitions"]["FunctionSpec"].is_object());
        assert!(schema["definitions"]["DynamoDbSpec"]["properties"]["TableName"].is_object());
    }

    #[test]
    fn test_sc014_schema_initialized_once() {
        let a = output_schema() as *const serde_json::Value;
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| output_schema() as *const serde_json::Value as usize))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), a as usize);
        }
    }
}
