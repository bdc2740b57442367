//! Pipeline executor.
//!
//! A [`Pipeline`] is an immutable, ordered sequence of [`Transformer`]s.
//! Editing operations (`then`, `insert`, `replace`, `remove`, `concat`,
//! `slice`) return a new pipeline that shares the step instances with the
//! original, so a preset pipeline can be specialized per type without
//! affecting other users of it.
//!
//! # Example
//!
//! ```ignore
//! use variants_core::{Pipeline, VariantContext};
//! use variants_core::transformers::{BuildVariant, ConnectVariant, FilterFields};
//!
//! let pipeline = Pipeline::new()
//!     .then(FilterFields::exclude(["id"]))
//!     .then(BuildVariant::new())
//!     .then(ConnectVariant::new());
//!
//! let context = pipeline.run(VariantContext::named("Input").bind(&user))?;
//! ```

use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use tracing::{debug, debug_span, trace};

use crate::context::VariantContext;
use crate::error::{Result, VariantError};

/// One pipeline step: a pure, reusable mapping from context to context.
///
/// Implementations capture their configuration at construction and hold no
/// per-run state, so one instance may run in many pipelines and threads.
pub trait Transformer: Send + Sync {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    fn apply(&self, context: VariantContext) -> Result<VariantContext>;
}

/// Immutable ordered sequence of transformers.
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Arc<[Arc<dyn Transformer>]>,
}

impl Pipeline {
    /// An empty pipeline; running it returns the context unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<Arc<dyn Transformer>>) -> Self {
        Self {
            steps: Arc::from(steps),
        }
    }

    fn with_steps<F>(&self, edit: F) -> Self
    where
        F: FnOnce(&mut Vec<Arc<dyn Transformer>>),
    {
        let mut steps = self.steps.to_vec();
        edit(&mut steps);
        Self::from_steps(steps)
    }

    /// Append a step.
    pub fn then<T: Transformer + 'static>(&self, step: T) -> Self {
        self.then_shared(Arc::new(step))
    }

    /// Append an already shared step.
    pub fn then_shared(&self, step: Arc<dyn Transformer>) -> Self {
        self.with_steps(|steps| steps.push(step))
    }

    /// Insert a step before `index`; `index == len()` appends.
    pub fn insert<T: Transformer + 'static>(&self, index: usize, step: T) -> Result<Self> {
        if index > self.len() {
            return Err(VariantError::StepIndex {
                index,
                len: self.len(),
            });
        }
        Ok(self.with_steps(|steps| steps.insert(index, Arc::new(step))))
    }

    pub fn replace<T: Transformer + 'static>(&self, index: usize, step: T) -> Result<Self> {
        if index >= self.len() {
            return Err(VariantError::StepIndex {
                index,
                len: self.len(),
            });
        }
        let step: Arc<dyn Transformer> = Arc::new(step);
        Ok(self.with_steps(|steps| steps[index] = step))
    }

    pub fn remove(&self, index: usize) -> Result<Self> {
        if index >= self.len() {
            return Err(VariantError::StepIndex {
                index,
                len: self.len(),
            });
        }
        Ok(self.with_steps(|steps| {
            steps.remove(index);
        }))
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &Pipeline) -> Self {
        self.with_steps(|steps| steps.extend(other.steps.iter().cloned()))
    }

    /// A sub-pipeline over `range`.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Result<Self> {
        let bounds: (Bound<usize>, Bound<usize>) =
            (range.start_bound().cloned(), range.end_bound().cloned());
        match self.steps.get(bounds) {
            Some(steps) => Ok(Self::from_steps(steps.to_vec())),
            None => Err(VariantError::StepIndex {
                index: match bounds.1 {
                    Bound::Included(end) => end.saturating_add(1),
                    Bound::Excluded(end) => end,
                    Bound::Unbounded => self.len(),
                },
                len: self.len(),
            }),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn Transformer>> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run every step in order. The first error aborts the run.
    pub fn run(&self, context: VariantContext) -> Result<VariantContext> {
        let span = debug_span!(
            "pipeline",
            origin = %context.origin().name(),
            variant = %context.name()
        );
        let _guard = span.enter();

        let mut context = context;
        for (idx, step) in self.steps.iter().enumerate() {
            trace!(step = idx, transformer = step.name(), state = %context.state_kind(), "applying");
            context = step.apply(context).inspect_err(|error| {
                debug!(step = idx, transformer = step.name(), %error, "pipeline aborted");
            })?;
        }
        debug!(steps = self.len(), state = %context.state_kind(), "pipeline finished");
        Ok(context)
    }
}

impl Transformer for Pipeline {
    fn name(&self) -> &'static str {
        "Pipeline"
    }

    fn apply(&self, context: VariantContext) -> Result<VariantContext> {
        self.run(context)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .finish()
    }
}

/// Build a pipeline from a list of transformers.
///
/// ```ignore
/// let p = pipeline![FilterFields::exclude(["id"]), BuildVariant::new()];
/// ```
#[macro_export]
macro_rules! pipeline {
    ($($step:expr),* $(,)?) => {
        $crate::Pipeline::new()$(.then($step))*
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::VariantDirectory;
    use variants_model::{FieldDescriptor, RecordType, TypeExpr};

    /// Appends its label to the "trace" signal.
    struct Mark(&'static str);

    impl Transformer for Mark {
        fn name(&self) -> &'static str {
            self.0
        }

        fn apply(&self, mut context: VariantContext) -> Result<VariantContext> {
            let mut seen = context
                .signal_value("trace")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            seen.push_str(self.0);
            context.signal("trace", seen);
            Ok(context)
        }
    }

    struct Fail;

    impl Transformer for Fail {
        fn name(&self) -> &'static str {
            "Fail"
        }

        fn apply(&self, _context: VariantContext) -> Result<VariantContext> {
            Err(VariantError::configuration("Fail", "always fails"))
        }
    }

    fn context() -> VariantContext {
        let user = RecordType::builder("User")
            .field(FieldDescriptor::new("id", TypeExpr::scalar("int")))
            .build()
            .unwrap();
        VariantContext::named("Input").bind_in(&user, &Arc::new(VariantDirectory::new()))
    }

    fn trace_of(pipeline: &Pipeline) -> String {
        let context = pipeline.run(context()).unwrap();
        context
            .signal_value("trace")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn runs_left_to_right() {
        let pipeline = pipeline![Mark("a"), Mark("b"), Mark("c")];
        assert_eq!(trace_of(&pipeline), "abc");
        assert_eq!(pipeline.step_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn edits_return_new_pipelines() {
        let base = pipeline![Mark("a"), Mark("c")];
        let inserted = base.insert(1, Mark("b")).unwrap();
        let replaced = inserted.replace(0, Mark("x")).unwrap();
        let removed = replaced.remove(2).unwrap();

        assert_eq!(trace_of(&base), "ac");
        assert_eq!(trace_of(&inserted), "abc");
        assert_eq!(trace_of(&replaced), "xbc");
        assert_eq!(trace_of(&removed), "xb");
    }

    #[test]
    fn edits_share_step_instances() {
        let base = pipeline![Mark("a")];
        let extended = base.then(Mark("b"));
        assert!(Arc::ptr_eq(base.get(0).unwrap(), extended.get(0).unwrap()));
    }

    #[test]
    fn out_of_range_edits_fail() {
        let base = pipeline![Mark("a")];
        assert!(matches!(
            base.insert(2, Mark("b")),
            Err(VariantError::StepIndex { index: 2, len: 1 })
        ));
        assert!(base.replace(1, Mark("b")).is_err());
        assert!(base.remove(1).is_err());
        assert!(base.slice(0..3).is_err());
    }

    #[test]
    fn slice_to_usize_max_is_an_index_error() {
        assert!(matches!(
            Pipeline::new().slice(..=usize::MAX),
            Err(VariantError::StepIndex { index: usize::MAX, len: 0 })
        ));
    }

    #[test]
    fn concat_and_slice() {
        let head = pipeline![Mark("a"), Mark("b")];
        let tail = pipeline![Mark("c")];
        let joined = head.concat(&tail);
        assert_eq!(trace_of(&joined), "abc");
        assert_eq!(trace_of(&joined.slice(1..).unwrap()), "bc");
        assert_eq!(trace_of(&joined.slice(..=0).unwrap()), "a");
    }

    #[test]
    fn nested_pipelines_run_inline() {
        let inner = pipeline![Mark("b"), Mark("c")];
        let outer = pipeline![Mark("a"), inner, Mark("d")];
        assert_eq!(trace_of(&outer), "abcd");
    }

    #[test]
    fn first_error_aborts() {
        let pipeline = pipeline![Mark("a"), Fail, Mark("b")];
        let err = pipeline.run(context()).unwrap_err();
        assert!(matches!(err, VariantError::Configuration { transformer: "Fail", .. }));
    }

    #[test]
    fn empty_pipeline_is_identity() {
        let context = Pipeline::new().run(context()).unwrap();
        assert!(context.signals().is_empty());
    }
}
