use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ParseError;

pub const MIN_MEMORY_MB: i64 = 128;
pub const MAX_MEMORY_MB: i64 = 10_240;
pub const MIN_TIMEOUT_SECS: i64 = 1;
pub const MAX_TIMEOUT_SECS: i64 = 900;

pub const DEFAULT_PROVIDER_NAME: &str = "aws";
pub const DEFAULT_RUNTIME: &str = "nodejs18.x";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_MEMORY_MB: i64 = 1024;
pub const DEFAULT_TIMEOUT_SECS: i64 = 6;
pub const DEFAULT_CORS_ENABLED: bool = false;

/// Lambda runtime identifiers accepted for `provider.runtime`.
pub const SUPPORTED_RUNTIMES: &[&str] = &[
    "nodejs16.x",
    "nodejs18.x",
    "nodejs20.x",
    "python3.8",
    "python3.9",
    "python3.10",
    "python3.11",
    "python3.12",
    "java11",
    "java17",
    "java21",
    "ruby3.2",
    "dotnet6",
    "dotnet8",
    "go1.x",
    "provided.al2",
    "provided.al2023",
];

/// Opaque key-value data carried through untouched.
pub type Passthrough = Map<String, Value>;

/// A loaded deployment descriptor.
///
/// Functions keep their declaration order; routes are derived from them with
/// [`Descriptor::routes`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    pub service: String,
    pub app: Option<String>,
    pub org: Option<String>,
    pub framework_version: Option<String>,
    pub provider: ProviderConfig,
    pub functions: Vec<FunctionConfig>,
    pub plugins: Vec<String>,
    pub custom: Passthrough,
    /// Unrecognized top-level keys.
    pub passthrough: Passthrough,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderConfig {
    pub name: Option<String>,
    pub runtime: Option<String>,
    pub region: Option<String>,
    pub memory_size: Option<i64>,
    pub timeout: Option<i64>,
    /// Execution role ARN (`provider.role`). A role given as a CloudFormation
    /// intrinsic (`Fn::GetAtt`, `Ref`) stays in `passthrough` instead.
    pub role: Option<String>,
    /// `provider.httpApi.cors`.
    pub cors: Option<bool>,
    /// Remaining `provider.httpApi` keys.
    pub http_api: Passthrough,
    /// Remaining provider keys (`stage`, `environment`, ...).
    pub passthrough: Passthrough,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionConfig {
    pub name: String,
    /// `module.function` reference, e.g. `handler.get_dashboard_metrics`.
    pub handler: String,
    pub events: Vec<FunctionEvent>,
    pub passthrough: Passthrough,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FunctionEvent {
    HttpApi(HttpApiEvent),
    /// Any event kind other than `httpApi`, kept as written.
    Other(Value),
}

/// An `httpApi` event: one route declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpApiEvent {
    pub method: HttpMethod,
    pub path: String,
    /// Route-level CORS. Deprecated in favour of `provider.httpApi.cors`.
    pub cors: Option<bool>,
    /// Unrecognized keys inside the `httpApi` mapping.
    pub passthrough: Passthrough,
    /// Keys written next to `httpApi` in the event mapping itself.
    pub event_passthrough: Passthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Patch,
    ];

    /// Lowercase spelling used when writing documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Patch => "patch",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                format!("unsupported HTTP method `{value}`, expected one of GET, POST, PUT, DELETE, PATCH")
            })
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// Flattened view of one `httpApi` event together with its owning function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Route<'a> {
    /// Position across all functions, in declaration order.
    pub index: usize,
    /// Position of the event inside its function's `events` list.
    pub event_index: usize,
    pub function: &'a str,
    pub handler: &'a str,
    pub event: &'a HttpApiEvent,
}

impl Route<'_> {
    pub fn method(&self) -> HttpMethod {
        self.event.method
    }

    pub fn path(&self) -> &str {
        &self.event.path
    }

    pub fn field(&self) -> String {
        format!(
            "functions.{}.events[{}].httpApi",
            self.function, self.event_index
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginConfig {
    pub name: String,
    /// Settings found under the plugin's `custom` key.
    pub settings: Passthrough,
}

impl Descriptor {
    pub fn routes(&self) -> Vec<Route<'_>> {
        let mut routes = Vec::new();
        for function in &self.functions {
            for (event_index, event) in function.events.iter().enumerate() {
                if let FunctionEvent::HttpApi(event) = event {
                    routes.push(Route {
                        index: routes.len(),
                        event_index,
                        function: &function.name,
                        handler: &function.handler,
                        event,
                    });
                }
            }
        }
        routes
    }

    /// Plugins in declaration order with their `custom` settings resolved.
    pub fn plugin_configs(&self) -> Vec<PluginConfig> {
        self.plugins
            .iter()
            .map(|name| PluginConfig {
                name: name.clone(),
                settings: self
                    .custom
                    .get(&plugin_custom_key(name))
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect()
    }
}

/// Key under `custom` where a plugin conventionally reads its settings.
///
/// `serverless-python-requirements` reads `custom.pythonRequirements`.
pub fn plugin_custom_key(plugin_name: &str) -> String {
    let bare = plugin_name
        .rsplit('/')
        .next()
        .unwrap_or(plugin_name)
        .trim_start_matches("serverless-");

    let mut key = String::with_capacity(bare.len());
    let mut upper_next = false;
    for ch in bare.chars() {
        if ch == '-' || ch == '_' {
            upper_next = !key.is_empty();
        } else if upper_next {
            key.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            key.push(ch);
        }
    }
    key
}

pub(crate) fn parse_method(value: &str, field: &str) -> Result<HttpMethod, ParseError> {
    value
        .parse::<HttpMethod>()
        .map_err(|reason| ParseError::new(field, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_method_parses_case_insensitively() {
        assert_eq!("GET".parse::<HttpMethod>(), Ok(HttpMethod::Get));
        assert_eq!("patch".parse::<HttpMethod>(), Ok(HttpMethod::Patch));
        assert!("ANY".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn plugin_custom_key_follows_framework_convention() {
        assert_eq!(
            plugin_custom_key("serverless-python-requirements"),
            "pythonRequirements"
        );
        assert_eq!(plugin_custom_key("serverless-offline"), "offline");
        assert_eq!(plugin_custom_key("@acme/serverless-domain-manager"), "domainManager");
        assert_eq!(plugin_custom_key("warmup"), "warmup");
    }
}
