//! Declarative derivation plans.
//!
//! A plan lists, per catalog type, the variants to derive and the steps of
//! each variant's pipeline:
//!
//! ```json
//! {
//!   "derive": [
//!     {
//!       "type": "User",
//!       "variants": [
//!         {
//!           "name": "Input",
//!           "steps": [
//!             { "filter": { "exclude_marked": ["input", "any"] } },
//!             "strip_markers",
//!             { "build": {} },
//!             { "connect": {} }
//!           ]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Derivations run in catalog order, whatever order the plan lists them in,
//! so nested types have their variants before a parent switches to them.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use tracing::{debug, info, info_span};
use variants_core::transformers::{
    BuildVariant, ConnectOptions, ConnectVariant, ExtractVariant, FilterFields, FilterOptions,
    MakeOptional, OptionalOptions, RenameFields, RenameOptions, SetAttribute, StripMarkers,
    SwitchNested,
};
use variants_core::{Attribute, Pipeline, VariantContext, VariantDirectory};
use variants_model::{FactoryOptions, RecordType, RecordTypeFactory, Value};

use crate::catalog::Catalog;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    pub derive: Vec<TypePlan>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypePlan {
    #[serde(rename = "type")]
    pub type_name: String,
    pub variants: Vec<VariantPlan>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantPlan {
    pub name: String,
    pub steps: Vec<StepSpec>,
}

/// One declarative pipeline step.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSpec {
    Filter(FilterOptions),
    Rename(RenameOptions),
    MakeOptional(OptionalOptions),
    StripMarkers,
    Extract {
        variant: String,
    },
    SwitchNested {
        #[serde(default)]
        variant: Option<String>,
        #[serde(default)]
        strict: bool,
    },
    Build(BuildSpec),
    Connect(ConnectOptions),
    SetAttribute(AttributeSpec),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSpec {
    /// Type name; defaults to `<origin><variant>`.
    pub name: Option<String>,
    /// Catalog type to inherit from.
    pub base: Option<String>,
    /// Reject variants left without fields.
    pub reject_empty: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeSpec {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub copy_from_origin: bool,
    #[serde(default)]
    pub on_origin: bool,
}

impl Plan {
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read plan {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("load plan {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parse plan JSON")
    }
}

impl StepSpec {
    /// Short step name used in error context.
    pub fn kind(&self) -> &'static str {
        match self {
            StepSpec::Filter(_) => "filter",
            StepSpec::Rename(_) => "rename",
            StepSpec::MakeOptional(_) => "make_optional",
            StepSpec::StripMarkers => "strip_markers",
            StepSpec::Extract { .. } => "extract",
            StepSpec::SwitchNested { .. } => "switch_nested",
            StepSpec::Build(_) => "build",
            StepSpec::Connect(_) => "connect",
            StepSpec::SetAttribute(_) => "set_attribute",
        }
    }

    /// Append this step to `pipeline`.
    pub fn append_to(&self, pipeline: &Pipeline, catalog: &Catalog) -> Result<Pipeline> {
        Ok(match self {
            StepSpec::Filter(options) => pipeline.then(FilterFields::from_options(options.clone())?),
            StepSpec::Rename(options) => pipeline.then(RenameFields::from_options(options.clone())?),
            StepSpec::MakeOptional(options) => {
                pipeline.then(MakeOptional::from_options(options.clone())?)
            }
            StepSpec::StripMarkers => pipeline.then(StripMarkers::exclusions()),
            StepSpec::Extract { variant } => pipeline.then(ExtractVariant::new(variant.clone())),
            StepSpec::SwitchNested { variant, strict } => {
                let mut step = SwitchNested::new();
                if let Some(variant) = variant {
                    step = step.variant(variant.clone());
                }
                if *strict {
                    step = step.strict();
                }
                pipeline.then(step)
            }
            StepSpec::Build(spec) => pipeline.then(spec.to_step(catalog)?),
            StepSpec::Connect(options) => pipeline.then(ConnectVariant::from_options(*options)),
            StepSpec::SetAttribute(spec) => pipeline.then(spec.to_step()?),
        })
    }
}

impl BuildSpec {
    fn to_step(&self, catalog: &Catalog) -> Result<BuildVariant> {
        let options = FactoryOptions {
            allow_empty: !self.reject_empty,
        };
        let mut step = BuildVariant::new().with_factory(Arc::new(RecordTypeFactory::new(options)));
        if let Some(name) = &self.name {
            step = step.with_name(name.clone());
        }
        if let Some(base) = &self.base {
            let base = catalog
                .get(base)
                .ok_or_else(|| anyhow!("base type {base} is not in the catalog"))?;
            step = step.with_base(base.clone());
        }
        Ok(step)
    }
}

impl AttributeSpec {
    fn to_step(&self) -> Result<SetAttribute> {
        let step = match (&self.value, self.copy_from_origin) {
            (Some(value), false) => {
                SetAttribute::value(self.name.clone(), Attribute::Value(value.clone()))
            }
            (None, true) => SetAttribute::copy_from_origin(self.name.clone()),
            (Some(_), true) => bail!("value and copy_from_origin are mutually exclusive"),
            (None, false) => bail!("expected a value or copy_from_origin"),
        };
        Ok(if self.on_origin { step.on_origin() } else { step })
    }
}

/// Compile a variant's steps into a pipeline.
pub fn compile(variant: &VariantPlan, catalog: &Catalog) -> Result<Pipeline> {
    variant
        .steps
        .iter()
        .enumerate()
        .try_fold(Pipeline::new(), |pipeline, (idx, step)| {
            step.append_to(&pipeline, catalog)
                .with_context(|| format!("step {idx} ({})", step.kind()))
        })
}

/// A derived variant and what was attached to it.
#[derive(Debug, Clone)]
pub struct DerivedVariant {
    pub origin: RecordType,
    pub variant: String,
    pub ty: RecordType,
    pub attributes: Vec<(String, Attribute)>,
}

/// Everything a plan produced, plus the directory it was recorded in.
#[derive(Debug)]
pub struct Derivation {
    pub variants: Vec<DerivedVariant>,
    pub directory: Arc<VariantDirectory>,
}

/// Run every derivation of `plan` against `catalog`.
pub fn derive(catalog: &Catalog, plan: &Plan) -> Result<Derivation> {
    for type_plan in &plan.derive {
        if catalog.get(&type_plan.type_name).is_none() {
            bail!("plan derives unknown type {}", type_plan.type_name);
        }
    }

    let directory = Arc::new(VariantDirectory::new());
    let mut variants = Vec::new();
    for origin in catalog.types() {
        let span = info_span!("derive", origin = %origin.name());
        let _guard = span.enter();
        let plans = plan
            .derive
            .iter()
            .filter(|type_plan| type_plan.type_name == origin.name());
        for variant_plan in plans.flat_map(|type_plan| &type_plan.variants) {
            let pipeline = compile(variant_plan, catalog)
                .with_context(|| format!("compile {}.{}", origin.name(), variant_plan.name))?;
            debug!(variant = %variant_plan.name, steps = ?pipeline.step_names(), "pipeline compiled");
            let context = pipeline
                .run(VariantContext::named(&variant_plan.name).bind_in(origin, &directory))
                .with_context(|| format!("derive {}.{}", origin.name(), variant_plan.name))?;
            let ty = context.built_type().cloned().ok_or_else(|| {
                anyhow!(
                    "{}.{} was never built; add a build step",
                    origin.name(),
                    variant_plan.name
                )
            })?;
            info!(variant = %variant_plan.name, built = %ty.name(), "variant derived");
            variants.push(DerivedVariant {
                origin: origin.clone(),
                variant: variant_plan.name.clone(),
                attributes: directory.attributes(&ty).into_iter().collect(),
                ty,
            });
        }
    }
    Ok(Derivation {
        variants,
        directory,
    })
}
