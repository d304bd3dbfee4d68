#![allow(dead_code)]

use descriptor_core::{load, Descriptor};
use serde_json::{json, Value};

pub const METRICS_SERVERLESS_YML: &str = include_str!("../fixtures/serverless.yml");

pub const LAB_ROLE_ARN: &str = "arn:aws:iam::637423185634:role/LabRole";

/// Raw document for the `GET /metrics` dashboard deployment.
pub fn metrics_document() -> Value {
    json!({
        "service": "inmobiliaria-dashboard-api",
        "frameworkVersion": "3",
        "provider": {
            "name": "aws",
            "runtime": "python3.9",
            "region": "us-east-1",
            "memorySize": 1024,
            "timeout": 20,
            "role": LAB_ROLE_ARN,
            "httpApi": { "cors": true },
        },
        "functions": {
            "getDashboardMetrics": {
                "handler": "handler.get_dashboard_metrics",
                "events": [{ "httpApi": { "path": "/metrics", "method": "get" } }],
            },
        },
        "plugins": ["serverless-python-requirements"],
        "custom": { "pythonRequirements": { "dockerizePip": "non-linux" } },
    })
}

pub fn load_document(document: &Value) -> Descriptor {
    load(document).expect("fixture document should load")
}

/// Appends an `httpApi` event to the dashboard metrics function.
pub fn push_http_api_event(document: &mut Value, event: Value) {
    document["functions"]["getDashboardMetrics"]["events"]
        .as_array_mut()
        .expect("events should be a sequence")
        .push(json!({ "httpApi": event }));
}
