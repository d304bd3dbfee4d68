//! Effective descriptor construction.
//!
//! Normalization is pure: the input is cloned, defaults are materialized on the
//! copy and every route is resolved into its effective binding. Deprecated
//! route-level CORS keys are kept in the descriptor and reported as warnings.

use std::collections::HashMap;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::schema::{
    Descriptor, FunctionEvent, HttpMethod, PluginConfig, DEFAULT_CORS_ENABLED, DEFAULT_MEMORY_MB,
    DEFAULT_PROVIDER_NAME, DEFAULT_REGION, DEFAULT_RUNTIME, DEFAULT_TIMEOUT_SECS,
};

/// Descriptor with defaults applied, plus the derived deployment view.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveDescriptor {
    pub descriptor: Descriptor,
    pub routes: Vec<EffectiveRoute>,
    /// Declared plugins, first occurrence wins.
    pub plugins: Vec<PluginConfig>,
    pub warnings: Vec<NormalizationWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveRoute {
    pub index: usize,
    pub function: String,
    pub method: HttpMethod,
    pub path: String,
    pub handler: String,
    pub cors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizationWarning {
    /// Route declares `cors` while `provider.httpApi.cors` is already on.
    RedundantRouteCors { route: usize, field: String },
    /// Route declares `cors` without provider-level CORS; the route value is used.
    DeprecatedRouteCors {
        route: usize,
        field: String,
        value: bool,
    },
    DuplicatePlugin {
        name: String,
        first: usize,
        second: usize,
    },
}

impl std::fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RedundantRouteCors { route, field } => write!(
                f,
                "`{field}` on route #{route} is redundant: provider.httpApi.cors is enabled; the route-level key is deprecated and ignored"
            ),
            Self::DeprecatedRouteCors { route, field, value } => write!(
                f,
                "`{field}` on route #{route} is deprecated; using cors={value} for this route, move it to provider.httpApi.cors"
            ),
            Self::DuplicatePlugin {
                name,
                first,
                second,
            } => write!(
                f,
                "plugin `{name}` is listed at plugins[{first}] and plugins[{second}]; the repeat is ignored"
            ),
        }
    }
}

impl EffectiveDescriptor {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// SHA-256 of the stable JSON encoding of the deployment view.
    ///
    /// Route-level `cors` keys and warnings do not contribute; each route's
    /// resolved CORS does. Two descriptors that deploy the same way share a
    /// fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut deployed = self.descriptor.clone();
        for event in deployed
            .functions
            .iter_mut()
            .flat_map(|function| function.events.iter_mut())
        {
            if let FunctionEvent::HttpApi(event) = event {
                event.cors = None;
            }
        }

        let mut hasher = Sha256::new();
        hasher.update(stable_json(&(&deployed, &self.routes, &self.plugins)));
        format!("{:x}", hasher.finalize())
    }
}

pub fn normalize(descriptor: &Descriptor) -> EffectiveDescriptor {
    let mut effective = descriptor.clone();
    let provider = &mut effective.provider;
    provider
        .name
        .get_or_insert_with(|| DEFAULT_PROVIDER_NAME.to_string());
    provider
        .runtime
        .get_or_insert_with(|| DEFAULT_RUNTIME.to_string());
    provider
        .region
        .get_or_insert_with(|| DEFAULT_REGION.to_string());
    provider.memory_size.get_or_insert(DEFAULT_MEMORY_MB);
    provider.timeout.get_or_insert(DEFAULT_TIMEOUT_SECS);
    let provider_cors = *provider.cors.get_or_insert(DEFAULT_CORS_ENABLED);

    let mut warnings = Vec::new();
    let routes = effective
        .routes()
        .into_iter()
        .map(|route| {
            let cors = match route.event.cors {
                Some(_) if provider_cors => {
                    warnings.push(NormalizationWarning::RedundantRouteCors {
                        route: route.index,
                        field: format!("{}.cors", route.field()),
                    });
                    true
                }
                Some(value) => {
                    warnings.push(NormalizationWarning::DeprecatedRouteCors {
                        route: route.index,
                        field: format!("{}.cors", route.field()),
                        value,
                    });
                    value
                }
                None => provider_cors,
            };
            EffectiveRoute {
                index: route.index,
                function: route.function.to_string(),
                method: route.method(),
                path: route.path().to_string(),
                handler: route.handler.to_string(),
                cors,
            }
        })
        .collect::<Vec<_>>();

    let mut first_plugin: HashMap<String, usize> = HashMap::new();
    let mut plugins = Vec::new();
    for (idx, plugin) in effective.plugin_configs().into_iter().enumerate() {
        if let Some(&first) = first_plugin.get(plugin.name.as_str()) {
            warnings.push(NormalizationWarning::DuplicatePlugin {
                name: plugin.name,
                first,
                second: idx,
            });
            continue;
        }
        first_plugin.insert(plugin.name.clone(), idx);
        plugins.push(plugin);
    }

    for warning in &warnings {
        warn!(service = %effective.service, "{warning}");
    }
    debug!(
        service = %effective.service,
        routes = routes.len(),
        plugins = plugins.len(),
        warnings = warnings.len(),
        "normalized descriptor"
    );

    EffectiveDescriptor {
        descriptor: effective,
        routes,
        plugins,
        warnings,
    }
}

fn stable_json(value: impl Serialize) -> String {
    serde_json::to_string(&value).expect("serialization of descriptor value should not fail")
}
