//! Raw document <-> [`Descriptor`] conversion.
//!
//! Loading is strict about the shape of recognized keys and lenient about
//! everything else: unknown keys at the top level, inside `provider`,
//! `provider.httpApi`, functions, event mappings and `httpApi` events are
//! preserved verbatim so that newer framework options survive a load/serialize
//! cycle. YAML tags are read as their CloudFormation long form.

use std::fs;
use std::path::Path;

use serde_json::{json, Map, Number, Value};
use tracing::debug;

use crate::error::{LoadError, ParseError};
use crate::schema::{
    parse_method, Descriptor, FunctionConfig, FunctionEvent, HttpApiEvent, Passthrough,
    ProviderConfig,
};
use crate::yaml::{self, is_intrinsic};

const TOP_LEVEL_KEYS: &[&str] = &[
    "service",
    "app",
    "org",
    "frameworkVersion",
    "provider",
    "functions",
    "plugins",
    "custom",
];
const PROVIDER_KEYS: &[&str] = &[
    "name",
    "runtime",
    "region",
    "memorySize",
    "timeout",
    "role",
    "httpApi",
];
const FUNCTION_KEYS: &[&str] = &["handler", "events"];
const HTTP_API_EVENT_KEYS: &[&str] = &["path", "method", "cors"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// `.json` files are JSON, everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Reads and loads a descriptor file.
pub fn load_path(path: &Path) -> Result<Descriptor, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = text.len(), "read descriptor file");
    load_str(&text, DocumentFormat::from_path(path))
}

pub fn load_str(text: &str, format: DocumentFormat) -> Result<Descriptor, LoadError> {
    let raw: Value = match format {
        DocumentFormat::Yaml => yaml::from_str(text)?,
        DocumentFormat::Json => serde_json::from_str(text)?,
    };
    Ok(load(&raw)?)
}

/// Interprets a raw nested key-value document as a [`Descriptor`].
pub fn load(raw: &Value) -> Result<Descriptor, ParseError> {
    let root = as_mapping(raw, "(root)")?;

    let service = match root.get("service") {
        None | Some(Value::Null) => return Err(ParseError::missing("service")),
        Some(Value::String(name)) => name.clone(),
        // Legacy `service: { name: ... }` form.
        Some(Value::Object(object)) => required_string(object, "name", "service")?,
        Some(_) => return Err(ParseError::expected("service", "a string")),
    };

    let provider = match root.get("provider") {
        None | Some(Value::Null) => return Err(ParseError::missing("provider")),
        Some(value) => load_provider(value)?,
    };

    let functions = match root.get("functions") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => as_mapping(value, "functions")?
            .iter()
            .map(|(name, function)| load_function(name, function))
            .collect::<Result<Vec<_>, _>>()?,
    };

    let plugins = match root.get("plugins") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ParseError::expected(format!("plugins[{idx}]"), "a string"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(ParseError::expected("plugins", "a sequence of plugin names")),
    };

    let custom = match root.get("custom") {
        None | Some(Value::Null) => Map::new(),
        Some(value) => as_mapping(value, "custom")?.clone(),
    };

    let descriptor = Descriptor {
        service,
        app: optional_string(root, "app", "app")?,
        org: optional_string(root, "org", "org")?,
        framework_version: optional_version(root)?,
        provider,
        functions,
        plugins,
        custom,
        passthrough: passthrough(root, TOP_LEVEL_KEYS),
    };

    debug!(
        service = %descriptor.service,
        functions = descriptor.functions.len(),
        plugins = descriptor.plugins.len(),
        passthrough_keys = descriptor.passthrough.len(),
        "loaded descriptor"
    );
    Ok(descriptor)
}

fn load_provider(value: &Value) -> Result<ProviderConfig, ParseError> {
    let object = as_mapping(value, "provider")?;

    let (cors, http_api) = match object.get("httpApi") {
        None | Some(Value::Null) => (None, Map::new()),
        Some(value) => {
            let http_api = as_mapping(value, "provider.httpApi")?;
            (
                optional_bool(http_api, "cors", "provider.httpApi.cors")?,
                passthrough(http_api, &["cors"]),
            )
        }
    };

    let mut rest = passthrough(object, PROVIDER_KEYS);
    // `role: !GetAtt LambdaRole.Arn` resolves at deploy time; keep it opaque.
    let role = match object.get("role") {
        Some(intrinsic) if is_intrinsic(intrinsic) => {
            rest.insert("role".to_string(), intrinsic.clone());
            None
        }
        _ => optional_string(object, "role", "provider.role")?,
    };

    Ok(ProviderConfig {
        name: optional_string(object, "name", "provider.name")?,
        runtime: optional_string(object, "runtime", "provider.runtime")?,
        region: optional_string(object, "region", "provider.region")?,
        memory_size: optional_integer(object, "memorySize", "provider.memorySize")?,
        timeout: optional_integer(object, "timeout", "provider.timeout")?,
        role,
        cors,
        http_api,
        passthrough: rest,
    })
}

fn load_function(name: &str, value: &Value) -> Result<FunctionConfig, ParseError> {
    let field = format!("functions.{name}");
    let object = as_mapping(value, &field)?;

    let handler = required_string(object, "handler", &field)?;
    let events = match object.get("events") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, event)| load_event(event, &format!("{field}.events[{idx}]")))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(ParseError::expected(format!("{field}.events"), "a sequence")),
    };

    Ok(FunctionConfig {
        name: name.to_string(),
        handler,
        events,
        passthrough: passthrough(object, FUNCTION_KEYS),
    })
}

fn load_event(value: &Value, field: &str) -> Result<FunctionEvent, ParseError> {
    let Some((event_object, http_api)) = value
        .as_object()
        .and_then(|object| Some((object, object.get("httpApi")?)))
    else {
        return Ok(FunctionEvent::Other(value.clone()));
    };
    let event_passthrough = passthrough(event_object, &["httpApi"]);
    let field = format!("{field}.httpApi");

    let event = match http_api {
        // Shorthand `httpApi: 'GET /metrics'`.
        Value::String(shorthand) => {
            let Some((method, path)) = shorthand.trim().split_once(char::is_whitespace) else {
                return Err(ParseError::expected(field, "`METHOD /path`"));
            };
            HttpApiEvent {
                method: parse_method(method, &field)?,
                path: path.trim().to_string(),
                cors: None,
                passthrough: Map::new(),
                event_passthrough,
            }
        }
        Value::Object(object) => {
            let method = required_string(object, "method", &field)?;
            HttpApiEvent {
                method: parse_method(&method, &format!("{field}.method"))?,
                path: required_string(object, "path", &field)?,
                cors: optional_bool(object, "cors", &format!("{field}.cors"))?,
                passthrough: passthrough(object, HTTP_API_EVENT_KEYS),
                event_passthrough,
            }
        }
        _ => return Err(ParseError::expected(field, "a mapping or `METHOD /path` string")),
    };
    Ok(FunctionEvent::HttpApi(event))
}

/// Serializes a descriptor back into the document shape [`load`] accepts.
pub fn to_document(descriptor: &Descriptor) -> Value {
    let mut root = Map::new();
    root.insert("service".to_string(), json!(descriptor.service));
    insert_some(&mut root, "app", descriptor.app.as_ref());
    insert_some(&mut root, "org", descriptor.org.as_ref());
    insert_some(
        &mut root,
        "frameworkVersion",
        descriptor.framework_version.as_ref(),
    );
    root.insert("provider".to_string(), provider_document(&descriptor.provider));

    if !descriptor.functions.is_empty() {
        let functions = descriptor
            .functions
            .iter()
            .map(|function| (function.name.clone(), function_document(function)))
            .collect::<Map<_, _>>();
        root.insert("functions".to_string(), Value::Object(functions));
    }
    if !descriptor.plugins.is_empty() {
        root.insert("plugins".to_string(), json!(descriptor.plugins));
    }
    if !descriptor.custom.is_empty() {
        root.insert("custom".to_string(), Value::Object(descriptor.custom.clone()));
    }
    root.extend(descriptor.passthrough.clone());
    Value::Object(root)
}

pub fn to_yaml_string(descriptor: &Descriptor) -> Result<String, LoadError> {
    Ok(serde_yaml::to_string(&to_document(descriptor))?)
}

fn provider_document(provider: &ProviderConfig) -> Value {
    let mut object = Map::new();
    insert_some(&mut object, "name", provider.name.as_ref());
    insert_some(&mut object, "runtime", provider.runtime.as_ref());
    insert_some(&mut object, "region", provider.region.as_ref());
    insert_some(&mut object, "memorySize", provider.memory_size.as_ref());
    insert_some(&mut object, "timeout", provider.timeout.as_ref());
    insert_some(&mut object, "role", provider.role.as_ref());

    if provider.cors.is_some() || !provider.http_api.is_empty() {
        let mut http_api = Map::new();
        insert_some(&mut http_api, "cors", provider.cors.as_ref());
        http_api.extend(provider.http_api.clone());
        object.insert("httpApi".to_string(), Value::Object(http_api));
    }
    object.extend(provider.passthrough.clone());
    Value::Object(object)
}

fn function_document(function: &FunctionConfig) -> Value {
    let mut object = Map::new();
    object.insert("handler".to_string(), json!(function.handler));
    if !function.events.is_empty() {
        let events = function
            .events
            .iter()
            .map(|event| match event {
                FunctionEvent::HttpApi(event) => {
                    let mut http_api = Map::new();
                    http_api.insert("path".to_string(), json!(event.path));
                    http_api.insert("method".to_string(), json!(event.method.as_str()));
                    insert_some(&mut http_api, "cors", event.cors.as_ref());
                    http_api.extend(event.passthrough.clone());
                    let mut entry = Map::new();
                    entry.insert("httpApi".to_string(), Value::Object(http_api));
                    entry.extend(event.event_passthrough.clone());
                    Value::Object(entry)
                }
                FunctionEvent::Other(value) => value.clone(),
            })
            .collect::<Vec<_>>();
        object.insert("events".to_string(), Value::Array(events));
    }
    object.extend(function.passthrough.clone());
    Value::Object(object)
}

fn insert_some<T: Into<Value> + Clone>(object: &mut Map<String, Value>, key: &str, value: Option<&T>) {
    if let Some(value) = value {
        object.insert(key.to_string(), value.clone().into());
    }
}

fn as_mapping<'a>(value: &'a Value, field: &str) -> Result<&'a Map<String, Value>, ParseError> {
    value
        .as_object()
        .ok_or_else(|| ParseError::expected(field, "a mapping"))
}

fn passthrough(object: &Map<String, Value>, recognized: &[&str]) -> Passthrough {
    object
        .iter()
        .filter(|(key, _)| !recognized.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn child_field(parent: &str, key: &str) -> String {
    format!("{parent}.{key}")
}

fn required_string(
    object: &Map<String, Value>,
    key: &str,
    parent: &str,
) -> Result<String, ParseError> {
    match object.get(key) {
        None | Some(Value::Null) => Err(ParseError::missing(child_field(parent, key))),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ParseError::expected(child_field(parent, key), "a string")),
    }
}

fn optional_string(
    object: &Map<String, Value>,
    key: &str,
    field: &str,
) -> Result<Option<String>, ParseError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(ParseError::expected(field, "a string")),
    }
}

/// Whole numbers of any width are accepted and clamped to `i64`, so values
/// beyond the valid range reach validation as out of range instead of failing
/// the load. Fractions and non-numbers are rejected.
fn optional_integer(
    object: &Map<String, Value>,
    key: &str,
    field: &str,
) -> Result<Option<i64>, ParseError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => whole_number(number)
            .map(Some)
            .ok_or_else(|| ParseError::expected(field, "a whole number")),
        Some(_) => Err(ParseError::expected(field, "an integer")),
    }
}

fn whole_number(number: &Number) -> Option<i64> {
    if let Some(value) = number.as_i64() {
        return Some(value);
    }
    if number.is_u64() {
        return Some(i64::MAX);
    }
    // `as` saturates at the i64 bounds.
    number
        .as_f64()
        .filter(|value| value.is_finite() && value.fract() == 0.0)
        .map(|value| value as i64)
}

fn optional_bool(
    object: &Map<String, Value>,
    key: &str,
    field: &str,
) -> Result<Option<bool>, ParseError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(_) => Err(ParseError::expected(field, "a boolean")),
    }
}

/// `frameworkVersion` is usually quoted (`'3'`) but a bare number is accepted.
fn optional_version(object: &Map<String, Value>) -> Result<Option<String>, ParseError> {
    match object.get("frameworkVersion") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(Value::Number(value)) => Ok(Some(value.to_string())),
        Some(_) => Err(ParseError::expected("frameworkVersion", "a string")),
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::HttpMethod;

    use super::*;

    fn minimal() -> Value {
        json!({
            "service": "dashboard-api",
            "provider": { "name": "aws", "runtime": "python3.9" },
        })
    }

    #[test]
    fn load_requires_service_and_provider() {
        let error = load(&json!({ "provider": {} })).expect_err("service is required");
        assert_eq!(error.field, "service");

        let error = load(&json!({ "service": "api" })).expect_err("provider is required");
        assert_eq!(error.field, "provider");
    }

    #[test]
    fn load_rejects_functions_that_are_not_a_mapping() {
        let mut raw = minimal();
        raw["functions"] = json!(["getDashboardMetrics"]);

        let error = load(&raw).expect_err("functions must be a mapping");
        assert_eq!(error.field, "functions");
        assert_eq!(error.reason, "expected a mapping");
    }

    #[test]
    fn load_preserves_unknown_top_level_keys() {
        let mut raw = minimal();
        raw["resources"] = json!({ "Resources": { "Table": { "Type": "AWS::DynamoDB::Table" } } });

        let descriptor = load(&raw).expect("descriptor should load");
        assert!(descriptor.passthrough.contains_key("resources"));
        assert_eq!(to_document(&descriptor)["resources"], raw["resources"]);
    }

    #[test]
    fn load_accepts_http_api_shorthand_and_keeps_other_events() {
        let mut raw = minimal();
        raw["functions"] = json!({
            "api": {
                "handler": "handler.main",
                "events": [
                    { "httpApi": "post /reports" },
                    { "schedule": "rate(1 hour)" },
                    { "httpApi": { "path": "/metrics", "method": "GET" } },
                ],
            },
        });

        let descriptor = load(&raw).expect("descriptor should load");
        let routes = descriptor.routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].method(), HttpMethod::Post);
        assert_eq!(routes[0].path(), "/reports");
        assert_eq!(routes[1].index, 1);
        assert_eq!(routes[1].event_index, 2);
        assert!(matches!(
            descriptor.functions[0].events[1],
            FunctionEvent::Other(_)
        ));
    }

    #[test]
    fn load_reports_dotted_path_for_unknown_method() {
        let mut raw = minimal();
        raw["functions"] = json!({
            "api": {
                "handler": "handler.main",
                "events": [{ "httpApi": { "path": "/metrics", "method": "any" } }],
            },
        });

        let error = load(&raw).expect_err("ANY is not a supported method");
        assert_eq!(error.field, "functions.api.events[0].httpApi.method");
    }

    #[test]
    fn load_rejects_non_integer_memory_size() {
        let mut raw = minimal();
        raw["provider"]["memorySize"] = json!("1024MB");

        let error = load(&raw).expect_err("memorySize must be an integer");
        assert_eq!(error.field, "provider.memorySize");
    }

    #[test]
    fn load_clamps_wide_integers_and_accepts_whole_floats() {
        let mut raw = minimal();
        raw["provider"]["memorySize"] = json!(u64::MAX);
        raw["provider"]["timeout"] = json!(20.0);

        let descriptor = load(&raw).expect("numeric values should load");
        assert_eq!(descriptor.provider.memory_size, Some(i64::MAX));
        assert_eq!(descriptor.provider.timeout, Some(20));

        raw["provider"]["timeout"] = json!(20.5);
        let error = load(&raw).expect_err("fractional timeout is not a whole number");
        assert_eq!(error.field, "provider.timeout");
        assert_eq!(error.reason, "expected a whole number");
    }

    #[test]
    fn load_keeps_keys_next_to_http_api_in_the_event_mapping() {
        let mut raw = minimal();
        raw["functions"] = json!({
            "api": {
                "handler": "handler.main",
                "events": [{ "httpApi": { "path": "/a", "method": "get" }, "extra": 1 }],
            },
        });

        let descriptor = load(&raw).expect("descriptor should load");
        let FunctionEvent::HttpApi(event) = &descriptor.functions[0].events[0] else {
            panic!("expected an httpApi event");
        };
        assert_eq!(event.event_passthrough.get("extra"), Some(&json!(1)));
        assert_eq!(
            to_document(&descriptor)["functions"]["api"]["events"],
            json!([{ "httpApi": { "path": "/a", "method": "get" }, "extra": 1 }])
        );
    }

    #[test]
    fn load_str_reads_cloudformation_tags() {
        let yaml = "\
service: api
provider:
  runtime: python3.9
  memorySize: 99999999999999999999
  role: !GetAtt LambdaRole.Arn
custom:
  table: !Ref MetricsTable
";

        let descriptor = load_str(yaml, DocumentFormat::Yaml).expect("tagged yaml should load");
        assert_eq!(descriptor.provider.role, None);
        assert_eq!(descriptor.provider.memory_size, Some(i64::MAX));
        assert_eq!(
            descriptor.provider.passthrough.get("role"),
            Some(&json!({ "Fn::GetAtt": "LambdaRole.Arn" }))
        );
        assert_eq!(descriptor.custom.get("table"), Some(&json!({ "Ref": "MetricsTable" })));

        let reloaded = load(&to_document(&descriptor)).expect("document should reload");
        assert_eq!(reloaded, descriptor);
    }

    #[test]
    fn load_rejects_plain_mapping_role() {
        let mut raw = minimal();
        raw["provider"]["role"] = json!({ "name": "LabRole" });

        let error = load(&raw).expect_err("role must be an ARN or an intrinsic function");
        assert_eq!(error.field, "provider.role");
    }

    #[test]
    fn load_accepts_legacy_service_mapping_and_numeric_framework_version() {
        let raw = json!({
            "service": { "name": "dashboard-api" },
            "frameworkVersion": 3,
            "provider": { "name": "aws" },
        });

        let descriptor = load(&raw).expect("descriptor should load");
        assert_eq!(descriptor.service, "dashboard-api");
        assert_eq!(descriptor.framework_version.as_deref(), Some("3"));
    }

    #[test]
    fn load_str_reads_yaml_documents() {
        let yaml = "service: api\nprovider:\n  runtime: python3.9\n  httpApi:\n    cors: true\n";

        let descriptor = load_str(yaml, DocumentFormat::Yaml).expect("yaml should load");
        assert_eq!(descriptor.provider.cors, Some(true));
        assert_eq!(descriptor.provider.runtime.as_deref(), Some("python3.9"));
    }

    #[test]
    fn load_path_reports_missing_file_with_its_path() {
        let error = load_path(Path::new("does/not/exist/serverless.yml"))
            .expect_err("missing file should fail");
        match error {
            LoadError::Io { path, .. } => assert!(path.ends_with("serverless.yml")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn format_is_chosen_by_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("serverless.json")),
            DocumentFormat::Json
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("serverless.yml")),
            DocumentFormat::Yaml
        );
    }
}
