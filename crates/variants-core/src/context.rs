//! Variant context threaded through a pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use variants_model::{RecordType, Value};

use crate::descriptor::{SchemaDescriptor, decompose};
use crate::directory::VariantDirectory;
use crate::error::{Result, StateKind, VariantError};

/// Derivation state. Moves from `Decomposed` to `Built`, never back.
#[derive(Debug, Clone)]
pub enum VariantState {
    Decomposed(SchemaDescriptor),
    Built(RecordType),
}

impl VariantState {
    pub fn kind(&self) -> StateKind {
        match self {
            VariantState::Decomposed(_) => StateKind::Decomposed,
            VariantState::Built(_) => StateKind::Built,
        }
    }
}

/// A named context not yet bound to a type.
///
/// Lets one name be reused across many origin types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextTemplate {
    name: String,
}

impl ContextTemplate {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind to `origin`, recording results in the process-wide directory.
    ///
    /// What a connect records there lives as long as `origin`; see
    /// [`VariantDirectory`] for how released types are pruned.
    pub fn bind(&self, origin: &RecordType) -> VariantContext {
        self.bind_in(origin, &VariantDirectory::global())
    }

    /// Bind to `origin`, recording results in `directory`.
    pub fn bind_in(&self, origin: &RecordType, directory: &Arc<VariantDirectory>) -> VariantContext {
        VariantContext::new(self.name.clone(), origin, Arc::clone(directory))
    }
}

/// Everything a transformer sees: variant name, origin, derivation state,
/// the directory results go to, and a free-form side channel.
#[derive(Debug, Clone)]
pub struct VariantContext {
    name: String,
    origin: RecordType,
    state: VariantState,
    signals: BTreeMap<String, Value>,
    directory: Arc<VariantDirectory>,
}

impl VariantContext {
    /// First half of two-step construction; see [`ContextTemplate::bind`].
    pub fn named(name: impl Into<String>) -> ContextTemplate {
        ContextTemplate { name: name.into() }
    }

    /// A context in `Decomposed` state over `origin`.
    pub fn new(
        name: impl Into<String>,
        origin: &RecordType,
        directory: Arc<VariantDirectory>,
    ) -> Self {
        Self {
            name: name.into(),
            origin: origin.clone(),
            state: VariantState::Decomposed(decompose(origin)),
            signals: BTreeMap::new(),
            directory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> &RecordType {
        &self.origin
    }

    pub fn state(&self) -> &VariantState {
        &self.state
    }

    pub fn state_kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn directory(&self) -> &Arc<VariantDirectory> {
        &self.directory
    }

    fn wrong_state(&self, transformer: &'static str, expected: StateKind) -> VariantError {
        VariantError::WrongState {
            transformer,
            expected,
            found: self.state.kind(),
        }
    }

    pub fn descriptor(&self, transformer: &'static str) -> Result<&SchemaDescriptor> {
        match &self.state {
            VariantState::Decomposed(descriptor) => Ok(descriptor),
            VariantState::Built(_) => Err(self.wrong_state(transformer, StateKind::Decomposed)),
        }
    }

    pub fn descriptor_mut(&mut self, transformer: &'static str) -> Result<&mut SchemaDescriptor> {
        let found = self.state.kind();
        match &mut self.state {
            VariantState::Decomposed(descriptor) => Ok(descriptor),
            VariantState::Built(_) => Err(VariantError::WrongState {
                transformer,
                expected: StateKind::Decomposed,
                found,
            }),
        }
    }

    pub fn built(&self, transformer: &'static str) -> Result<&RecordType> {
        match &self.state {
            VariantState::Built(built) => Ok(built),
            VariantState::Decomposed(_) => Err(self.wrong_state(transformer, StateKind::Built)),
        }
    }

    /// The realized type, if the context has been built.
    pub fn built_type(&self) -> Option<&RecordType> {
        match &self.state {
            VariantState::Built(built) => Some(built),
            VariantState::Decomposed(_) => None,
        }
    }

    /// Consume the descriptor and move to `Built`.
    pub fn realize<F>(self, transformer: &'static str, build: F) -> Result<Self>
    where
        F: FnOnce(SchemaDescriptor) -> Result<RecordType>,
    {
        let VariantContext {
            name,
            origin,
            state,
            signals,
            directory,
        } = self;
        match state {
            VariantState::Decomposed(descriptor) => Ok(VariantContext {
                name,
                origin,
                state: VariantState::Built(build(descriptor)?),
                signals,
                directory,
            }),
            VariantState::Built(_) => Err(VariantError::WrongState {
                transformer,
                expected: StateKind::Decomposed,
                found: StateKind::Built,
            }),
        }
    }

    /// Restart decomposition from `base` instead of the origin.
    ///
    /// The origin itself is unchanged; only the working descriptor is
    /// replaced. Only legal while still decomposed.
    pub fn restart_from(&mut self, transformer: &'static str, base: &RecordType) -> Result<()> {
        let descriptor = self.descriptor_mut(transformer)?;
        *descriptor = decompose(base);
        Ok(())
    }

    /// Leave a value for later transformers.
    pub fn signal(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.signals.insert(key.into(), value.into())
    }

    pub fn signal_value(&self, key: &str) -> Option<&Value> {
        self.signals.get(key)
    }

    pub fn signals(&self) -> &BTreeMap<String, Value> {
        &self.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use variants_model::{FieldDescriptor, TypeExpr};

    fn user() -> RecordType {
        RecordType::builder("User")
            .field(FieldDescriptor::new("id", TypeExpr::scalar("int")))
            .build()
            .unwrap()
    }

    #[test]
    fn template_binds_many_types() {
        let directory = Arc::new(VariantDirectory::new());
        let template = VariantContext::named("Input");
        let a = template.bind_in(&user(), &directory);
        let b = template.bind_in(&user(), &directory);
        assert_eq!(a.name(), "Input");
        assert_ne!(a.origin(), b.origin());
        assert_eq!(a.state_kind(), StateKind::Decomposed);
    }

    #[test]
    fn realize_is_one_way() {
        let directory = Arc::new(VariantDirectory::new());
        let origin = user();
        let context = VariantContext::new("Input", &origin, directory);
        let built = context
            .realize("test", |descriptor| {
                Ok(RecordType::builder("UserInput")
                    .fields(descriptor.fields().to_vec())
                    .build()?)
            })
            .unwrap();
        assert_eq!(built.built("test").unwrap().name(), "UserInput");
        assert!(built.descriptor("test").is_err());

        let err = built.realize("again", |_| unreachable!()).unwrap_err();
        assert!(matches!(
            err,
            VariantError::WrongState {
                transformer: "again",
                found: StateKind::Built,
                ..
            }
        ));
    }

    #[test]
    fn signals_round_trip() {
        let mut context = VariantContext::named("Input").bind_in(&user(), &Arc::default());
        assert!(context.signal("dropped", 2).is_none());
        assert_eq!(context.signal_value("dropped"), Some(&Value::from(2)));
        assert_eq!(context.signals().len(), 1);
    }
}
