use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::VariantContext;
use crate::directory::ConnectPlan;
use crate::error::Result;
use crate::pipeline::Transformer;

/// Which connect effects to apply. Everything is on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectOptions {
    /// Create the origin's variant registry if missing.
    pub create_registry: bool,
    /// Store the variant in the registry under the context name.
    pub register: bool,
    /// Expose the variant on the origin as `_<name>`.
    pub attach_directly: bool,
    /// Record the origin as the built type's root.
    pub attach_base: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            create_registry: true,
            register: true,
            attach_directly: true,
            attach_base: true,
        }
    }
}

/// Alias attribute name for a variant.
pub fn alias_name(variant: &str) -> String {
    format!("_{variant}")
}

/// Publishes the built type onto its origin. Usually the last step.
///
/// Reconnecting a name replaces the previous variant (last write wins).
#[derive(Debug, Clone, Default)]
pub struct ConnectVariant {
    options: ConnectOptions,
}

impl ConnectVariant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(options: ConnectOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ConnectOptions {
        self.options
    }

    fn plan(&self, variant: &str) -> ConnectPlan {
        ConnectPlan {
            create_registry: self.options.create_registry,
            register: self.options.register,
            alias: self.options.attach_directly.then(|| alias_name(variant)),
            back_reference: self.options.attach_base,
        }
    }
}

impl Transformer for ConnectVariant {
    fn name(&self) -> &'static str {
        "ConnectVariant"
    }

    fn apply(&self, context: VariantContext) -> Result<VariantContext> {
        let built = context.built(self.name())?;
        let origin = context.origin();
        let plan = self.plan(context.name());
        let previous = context
            .directory()
            .connect(origin, context.name(), built, &plan)?;
        if let Some(previous) = previous {
            warn!(
                origin = %origin.name(),
                variant = %context.name(),
                replaced = %previous.name(),
                "variant overwritten"
            );
        }
        debug!(
            origin = %origin.name(),
            variant = %context.name(),
            built = %built.name(),
            "variant connected"
        );
        Ok(context)
    }
}
