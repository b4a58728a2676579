//! The collaborators a binding calls out to.
//!
//! Every [`Identifier`](crate::Identifier) holds a handle to the environment
//! it was created in. The environment bundles the expression evaluator, the
//! type oracle, the attribute validator, the aggregate merger, the change
//! notifier, and the configured options.

use crate::notifier::NotifierRegistry;
use std::fmt;
use std::rc::Rc;
use tapscript_options::BindingOptions;
use tapscript_types::{
    AggregateMerger, AttrValidator, ConstEvaluator, DefaultAttrValidator, Evaluator, Merger,
    StructuralTypes, TypeOracle,
};

pub type EnvRef = Rc<BindingEnv>;

pub struct BindingEnv {
    evaluator: Box<dyn Evaluator>,
    types: Box<dyn TypeOracle>,
    validator: Box<dyn AttrValidator>,
    merger: Box<dyn Merger>,
    notifier: NotifierRegistry,
    options: BindingOptions,
}

impl BindingEnv {
    /// An environment with the default collaborators.
    pub fn new(options: BindingOptions) -> Self {
        Self {
            evaluator: Box::new(ConstEvaluator),
            types: Box::new(StructuralTypes),
            validator: Box::new(DefaultAttrValidator),
            merger: Box::new(AggregateMerger),
            notifier: NotifierRegistry::new(),
            options,
        }
    }

    pub fn with_evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn with_type_oracle(mut self, types: impl TypeOracle + 'static) -> Self {
        self.types = Box::new(types);
        self
    }

    pub fn with_validator(mut self, validator: impl AttrValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_merger(mut self, merger: impl Merger + 'static) -> Self {
        self.merger = Box::new(merger);
        self
    }

    pub fn into_ref(self) -> EnvRef {
        Rc::new(self)
    }

    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator.as_ref()
    }

    pub fn types(&self) -> &dyn TypeOracle {
        self.types.as_ref()
    }

    pub fn validator(&self) -> &dyn AttrValidator {
        self.validator.as_ref()
    }

    pub fn merger(&self) -> &dyn Merger {
        self.merger.as_ref()
    }

    pub fn notifier(&self) -> &NotifierRegistry {
        &self.notifier
    }

    pub fn options(&self) -> &BindingOptions {
        &self.options
    }
}

impl Default for BindingEnv {
    fn default() -> Self {
        Self::new(BindingOptions::default())
    }
}

impl fmt::Debug for BindingEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingEnv")
            .field("notifier", &self.notifier)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
