//! Benchmarks for samc core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use samc::core::decoder::decode_template;
use samc::core::{compile_template, Parameters};
use samc::fingerprint::hasher;

/// A template with `n` functions sharing globals, a layer, a table and a bucket.
fn template(n: usize) -> String {
    let mut yaml = String::from(
        r#"
Parameters:
  Stage: { Type: String, Default: dev }
Conditions:
  IsProd: !Equals [ !Ref Stage, prod ]
  IsBig: !Or [ !Condition IsProd, !Equals [ !Ref Stage, perf ] ]
Globals:
  Function:
    Runtime: python3.12
    Layers: [ !Ref Common ]
    Environment:
      Variables:
        STAGE: !Ref Stage
        TABLE: !Ref Orders
Resources:
  Common:
    Type: AWS::Serverless::LayerVersion
    Properties: { ContentUri: layers/common }
  Orders:
    Type: AWS::DynamoDB::Table
    Properties:
      TableName: !Sub "orders-${Stage}"
      KeySchema: [ { AttributeName: id, KeyType: HASH } ]
      AttributeDefinitions: [ { AttributeName: id, AttributeType: S } ]
  Uploads:
    Type: AWS::S3::Bucket
"#,
    );
    for i in 0..n {
        yaml.push_str(&format!(
            r#"  Fn{i:04}:
    Type: AWS::Serverless::Function
    Properties:
      FunctionName: !Sub "${{Stage}}-fn-{i}"
      CodeUri: functions/fn{i}
      MemorySize: !If [ IsBig, 1024, 256 ]
      Environment:
        Variables:
          ARN: !GetAtt Orders.Arn
          PATH_PARTS: !Join [ "/", !Split [ "-", "a-b-c" ] ]
      Events:
        Get:
          Type: Api
          Properties: {{ Path: /fn{i}, Method: GET }}
"#
        ));
    }
    yaml
}

fn bench_blake3_string(c: &mut Criterion) {
    let mut group = c.benchmark_group("blake3_string");
    for size in [64, 256, 1024, 4096] {
        let input: String = "x".repeat(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| black_box(hasher::hash_string(black_box(input))));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_template");
    for n in [10, 100] {
        let yaml = template(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &yaml, |b, yaml| {
            b.iter(|| black_box(decode_template(black_box(yaml)).unwrap()));
        });
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let params = Parameters::new();
    let mut group = c.benchmark_group("compile_template");
    for n in [10, 100] {
        let yaml = template(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &yaml, |b, yaml| {
            b.iter(|| black_box(compile_template(black_box(yaml), &params).unwrap()));
        });
    }
    group.finish();
}

fn bench_fingerprint(c: &mut Criterion) {
    let result = compile_template(&template(100), &Parameters::new()).unwrap();
    c.bench_function("fingerprint_result_100", |b| {
        b.iter(|| black_box(hasher::fingerprint_result(black_box(&result)).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_blake3_string,
    bench_decode,
    bench_compile,
    bench_fingerprint
);
criterion_main!(benches);
