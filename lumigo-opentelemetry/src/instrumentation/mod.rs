// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! Instrumentation discovery and lifecycle.
//!
//! Every library integration implements [`Instrumentor`]; the bootstrapper
//! walks the registrations in a fixed order, honors the disable list, and
//! quarantines install failures so one broken integration can never take
//! the others down with it.

mod hooks;

pub use hooks::{BodyPayload, HookRegistry, StreamingAccumulator};

use std::collections::HashSet;

use lumigo_trace::constants::UNKNOWN_FRAMEWORK;
use lumigo_trace::{catch_panic, lumigo_debug, lumigo_error, Config};

/// Uniform lifecycle for a library integration.
///
/// `is_applicable` probes whether the target library can actually be hooked
/// in this process (the probe must not panic through); `install` wires the
/// adapter's callbacks into the [`HookRegistry`].
pub trait Instrumentor: Send + Sync {
    /// Stable identifier, matched case-sensitively against
    /// `LUMIGO_DISABLE_INSTRUMENTATION`.
    fn id(&self) -> &'static str;

    /// The web framework name this instrumentor integrates, if any.
    fn framework(&self) -> Option<&'static str> {
        None
    }

    fn is_applicable(&self) -> bool {
        true
    }

    fn install(&self, hooks: &HookRegistry) -> lumigo_trace::Result<()>;
}

/// Priority order for the `framework` resource attribute when several web
/// frameworks are installed at once.
const FRAMEWORK_PRIORITY: &[&str] = &["axum", "tower"];

pub(crate) struct InstalledInstrumentations {
    pub ids: Vec<&'static str>,
    pub framework: &'static str,
}

/// Walk the instrumentors in registration order and install the applicable
/// ones. Returns the set of installed IDs; recorded once at startup and
/// never mutated afterwards.
pub(crate) fn install_instrumentors(
    config: &Config,
    hooks: &HookRegistry,
    instrumentors: &[Box<dyn Instrumentor>],
) -> InstalledInstrumentations {
    let disabled: HashSet<&str> = config.disabled_instrumentations().collect();

    let mut ids: Vec<&'static str> = Vec::new();
    for instrumentor in instrumentors {
        let id = instrumentor.id();
        if disabled.contains(id) {
            lumigo_debug!("Instrumentation {id} is disabled by configuration");
            continue;
        }
        if !catch_panic!(instrumentor.is_applicable(), false) {
            continue;
        }
        let result = catch_panic!(
            instrumentor.install(hooks),
            Err(lumigo_trace::Error::msg("instrumentation install panicked"))
        );
        match result {
            Ok(()) => ids.push(id),
            Err(e) => {
                lumigo_error!("Failed to install instrumentation {id}: {e}");
            }
        }
    }

    let framework = FRAMEWORK_PRIORITY
        .iter()
        .copied()
        .find(|id| ids.contains(id))
        .and_then(|id| {
            instrumentors
                .iter()
                .find(|i| i.id() == id)
                .and_then(|i| i.framework())
        })
        .unwrap_or(UNKNOWN_FRAMEWORK);

    InstalledInstrumentations { ids, framework }
}
