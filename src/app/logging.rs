// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Modules whose debug output would drown the strike logs.
const QUIET_MODULES: &[&str] = &[
    "hyper",
    "hyper_util",
    "tokio_tungstenite",
    "tungstenite",
    "alloy_transport_http",
    "alloy_pubsub",
];

pub fn setup_logging(level: &str, json_format: bool) {
    let registry = tracing_subscriber::registry().with(build_filter(level));

    if json_format {
        let json_layer = fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false);
        registry.with(json_layer).init();
    } else {
        registry.with(fmt::layer().compact().with_target(true)).init();
    }

    tracing::info!(
        level,
        format = if json_format { "json" } else { "compact" },
        "Logging initialized"
    );
}

/// Bare levels (e.g. "debug") get the quiet-module overrides appended;
/// full directive strings (containing ',' or '=') are respected as-is.
fn build_filter(level: &str) -> EnvFilter {
    let level = level.trim();
    let spec = if level.contains(',') || level.contains('=') {
        level.to_string()
    } else {
        let mut spec = level.to_string();
        for module in QUIET_MODULES {
            spec.push_str(&format!(",{}=info", module));
        }
        spec
    };
    EnvFilter::try_new(&spec).unwrap_or_else(|_| EnvFilter::new("info"))
}
