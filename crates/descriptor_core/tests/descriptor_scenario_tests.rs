mod support;

use std::io::Write;

use descriptor_core::{
    load_path, load_str, normalize, to_document, to_yaml_string, validate, DocumentFormat,
    HttpMethod, LoadError, NormalizationWarning, ValidationError,
};
use serde_json::json;
use support::{load_document, metrics_document, push_http_api_event, METRICS_SERVERLESS_YML};

#[test]
fn metrics_descriptor_validates_and_normalizes_without_warnings() {
    let descriptor = load_document(&metrics_document());

    validate(&descriptor).expect("metrics descriptor should be valid");
    let effective = normalize(&descriptor);

    assert_eq!(effective.descriptor.provider.cors, Some(true));
    assert!(effective.warnings.is_empty());
    assert_eq!(effective.routes.len(), 1);

    let route = &effective.routes[0];
    assert_eq!(route.method, HttpMethod::Get);
    assert_eq!(route.path, "/metrics");
    assert_eq!(route.handler, "handler.get_dashboard_metrics");
    assert!(route.cors);
}

#[test]
fn timeout_above_limit_is_the_only_error() {
    let mut document = metrics_document();
    document["provider"]["timeout"] = json!(1000);

    let errors = validate(&load_document(&document)).expect_err("timeout should be rejected");
    assert_eq!(
        errors.as_slice(),
        &[ValidationError::OutOfRange {
            field: "provider.timeout".to_string(),
            value: 1000,
            min: 1,
            max: 900,
        }]
    );
}

#[test]
fn zero_memory_size_is_out_of_range() {
    let mut document = metrics_document();
    document["provider"]["memorySize"] = json!(0);

    let errors = validate(&load_document(&document)).expect_err("memorySize should be rejected");
    assert!(errors.iter().any(|error| matches!(
        error,
        ValidationError::OutOfRange { field, value: 0, .. } if field == "provider.memorySize"
    )));
}

#[test]
fn duplicate_metrics_route_yields_exactly_one_error_with_both_indices() {
    let mut document = metrics_document();
    push_http_api_event(&mut document, json!({ "path": "/metrics", "method": "GET" }));

    let errors = validate(&load_document(&document)).expect_err("duplicate should be rejected");
    let duplicates: Vec<_> = errors
        .iter()
        .filter(|error| matches!(error, ValidationError::DuplicateRoute { .. }))
        .collect();
    assert_eq!(
        duplicates,
        vec![&ValidationError::DuplicateRoute {
            first: 0,
            second: 1,
            method: HttpMethod::Get,
            path: "/metrics".to_string(),
        }]
    );
}

#[test]
fn route_level_cors_under_provider_cors_is_a_warning() {
    let mut document = metrics_document();
    document["functions"]["getDashboardMetrics"]["events"][0]["httpApi"]["cors"] = json!(true);
    let descriptor = load_document(&document);

    validate(&descriptor).expect("route-level cors is not an error");
    let effective = normalize(&descriptor);

    assert_eq!(
        effective.warnings,
        vec![NormalizationWarning::RedundantRouteCors {
            route: 0,
            field: "functions.getDashboardMetrics.events[0].httpApi.cors".to_string(),
        }]
    );
    assert!(effective.warnings[0].to_string().contains("redundant"));
}

#[test]
fn unsupported_runtime_and_malformed_role_are_reported_together() {
    let mut document = metrics_document();
    document["provider"]["runtime"] = json!("python2.7");
    document["provider"]["role"] = json!("LabRole");

    let errors = validate(&load_document(&document)).expect_err("descriptor should fail");
    assert_eq!(errors.len(), 2);
    assert!(matches!(
        &errors.as_slice()[0],
        ValidationError::UnsupportedRuntime { runtime } if runtime == "python2.7"
    ));
    assert!(matches!(
        &errors.as_slice()[1],
        ValidationError::MalformedReference { field, .. } if field == "provider.role"
    ));
}

#[test]
fn fixture_file_loads_the_same_as_the_inline_document() {
    let from_yaml =
        load_str(METRICS_SERVERLESS_YML, DocumentFormat::Yaml).expect("fixture should load");

    validate(&from_yaml).expect("fixture should be valid");
    assert_eq!(from_yaml.service, "inmobiliaria-dashboard-api");
    assert_eq!(from_yaml.framework_version.as_deref(), Some("3"));
    assert_eq!(from_yaml.provider.timeout, Some(20));

    let plugins = normalize(&from_yaml).plugins;
    assert_eq!(plugins.len(), 1);
    assert_eq!(plugins[0].name, "serverless-python-requirements");
    assert_eq!(plugins[0].settings.get("slim"), Some(&json!(true)));
}

#[test]
fn load_path_reads_json_descriptors_by_extension() {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("temp file should be created");
    file.write_all(metrics_document().to_string().as_bytes())
        .expect("temp file should be writable");

    let descriptor = load_path(file.path()).expect("json descriptor should load");
    assert_eq!(descriptor, load_document(&metrics_document()));
}

#[test]
fn load_path_surfaces_parse_errors_without_a_partial_descriptor() {
    let mut file = tempfile::Builder::new()
        .suffix(".yml")
        .tempfile()
        .expect("temp file should be created");
    file.write_all(b"service: api\nprovider:\n  runtime: python3.9\nfunctions: []\n")
        .expect("temp file should be writable");

    match load_path(file.path()) {
        Err(LoadError::Parse(error)) => assert_eq!(error.field, "functions"),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn effective_yaml_round_trips_through_load() {
    let effective = normalize(&load_document(&metrics_document()));

    let yaml = to_yaml_string(&effective.descriptor).expect("yaml should serialize");
    let reloaded = load_str(&yaml, DocumentFormat::Yaml).expect("yaml should reload");

    assert_eq!(reloaded, effective.descriptor);
    assert_eq!(to_document(&reloaded), to_document(&effective.descriptor));
}
