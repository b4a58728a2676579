//! Identifier bindings.
//!
//! An [`Identifier`] moves through three states: unbound (no type), typed
//! (type but no value), and bound (type and value). Redefinitions replace or
//! merge the value according to an [`InitClass`]. Every mutation is reported
//! to the environment's notifier once it has taken effect.

use crate::env::EnvRef;
use crate::error::BindError;
use log::{debug, warn};
use std::rc::Rc;
use tapscript_core::collections::PriorityMap;
use tapscript_core::names;
use tapscript_options::HandlerFailurePolicy;
use tapscript_types::{
    Attr, AttrContext, AttrKind, Attributes, AttributesRef, Expr, ExprRef, FuncRef, TypeRef,
    Value, ValueRef,
};

/// Visibility tier of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdScope {
    /// A function frame.
    Local,
    Module,
    Global,
}

/// How a new value combines with the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitClass {
    /// Plain (re)initialization.
    None,
    /// `=`: replace the value.
    Full,
    /// `+=`: merge the new entries into the value.
    Extra,
    /// `-=`: remove the given entries from the value.
    Remove,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IdFlags: u16 {
        const EXPORT            = 1 << 0;
        const CONST             = 1 << 1;
        const ENUM_CONST        = 1 << 2;
        const TYPE              = 1 << 3;
        const OPTION            = 1 << 4;
        const INFER_RETURN_TYPE = 1 << 5;
        /// Event binding carrying `&error_handler`.
        const ERROR_HANDLER     = 1 << 6;
        /// Record type binding carrying `&log`.
        const LOGGED            = 1 << 7;

        /// Flags recomputed from the attributes by `update_val_attrs`.
        const DERIVED = Self::ERROR_HANDLER.bits() | Self::LOGGED.bits();
    }
}

#[derive(Debug)]
pub struct Identifier {
    name: String,
    scope: IdScope,
    flags: IdFlags,
    ty: Option<TypeRef>,
    val: Option<ValueRef>,
    attrs: Option<AttributesRef>,
    offset: Option<usize>,
    /// Called when an option's value changes.
    option_handlers: PriorityMap<FuncRef>,
    /// The handler registered on behalf of `&on_change`, with its priority.
    on_change: Option<(i32, FuncRef)>,
    env: EnvRef,
}

impl Identifier {
    pub fn new(name: impl Into<String>, scope: IdScope, is_export: bool, env: &EnvRef) -> Self {
        let mut flags = IdFlags::empty();
        flags.set(IdFlags::EXPORT, is_export);
        Self {
            name: name.into(),
            scope,
            flags,
            ty: None,
            val: None,
            attrs: None,
            offset: None,
            option_handlers: PriorityMap::new(),
            on_change: None,
            env: Rc::clone(env),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module_name(&self) -> &str {
        names::extract_module_name(&self.name)
    }

    pub fn scope(&self) -> IdScope {
        self.scope
    }

    pub fn is_global(&self) -> bool {
        self.scope != IdScope::Local
    }

    pub fn flags(&self) -> IdFlags {
        self.flags
    }

    pub fn env(&self) -> &EnvRef {
        &self.env
    }

    pub fn is_export(&self) -> bool {
        self.flags.contains(IdFlags::EXPORT)
    }

    /// Export the binding. There is no way back.
    pub fn set_export(&mut self) {
        if !self.is_export() {
            self.flags.insert(IdFlags::EXPORT);
            self.modified();
        }
    }

    // ========================================================================
    // Type
    // ========================================================================

    pub fn ty(&self) -> Option<&TypeRef> {
        self.ty.as_ref()
    }

    /// Set or replace the binding's type. Replacing the type of a bound
    /// binding requires the new type to be compatible with the old one.
    ///
    /// Attributes attached earlier are checked against the new type, and the
    /// state derived from them is recomputed.
    pub fn set_type(&mut self, ty: TypeRef) -> Result<(), BindError> {
        if let (Some(old), Some(_)) = (&self.ty, &self.val) {
            if !self.env.types().is_compatible(old, &ty) {
                return Err(BindError::TypeConflict {
                    name: self.name.clone(),
                    reason: format!("cannot change type from {old} to {ty} while a value is bound"),
                });
            }
        }
        if let Some(attrs) = &self.attrs {
            self.validate_attrs(attrs, Some(&ty))?;
        }
        self.ty = Some(ty);
        let result = self.update_val_attrs();
        self.modified();
        result
    }

    /// True if the binding names a type rather than a value.
    pub fn is_type(&self) -> bool {
        self.flags.contains(IdFlags::TYPE)
    }

    pub fn make_type(&mut self) {
        self.flags.insert(IdFlags::TYPE);
    }

    // ========================================================================
    // Value
    // ========================================================================

    pub fn val(&self) -> Option<&ValueRef> {
        self.val.as_ref()
    }

    pub fn has_val(&self) -> bool {
        self.val.is_some()
    }

    /// Bind `value`, combining it with the current value as `class` says.
    ///
    /// When an option that already had a value changes, its change handlers
    /// run after the new value is committed; a handler failure is returned
    /// but does not undo the assignment.
    pub fn set_val(&mut self, value: ValueRef, class: InitClass) -> Result<(), BindError> {
        if self.ty.is_none() {
            return Err(BindError::Untyped {
                name: self.name.clone(),
            });
        }
        if self.is_enum_const() && self.val.is_some() {
            return Err(self.redefinition("enum constant values are immutable"));
        }

        let previous = self.val.clone();
        let value = match class {
            InitClass::None | InitClass::Full => value,
            InitClass::Extra | InitClass::Remove => {
                let Some(existing) = previous.as_deref() else {
                    let op = if class == InitClass::Extra { "+=" } else { "-=" };
                    return Err(self.redefinition(&format!("`{op}` needs an existing value")));
                };
                let merged = if class == InitClass::Extra {
                    self.env.merger().merge_add(existing, &value)
                } else {
                    self.env.merger().merge_remove(existing, &value)
                };
                merged.map_err(|e| self.redefinition(&e.to_string()))?
            }
        };

        self.val = Some(self.attach_attrs(value));
        self.modified();

        match (&previous, &self.val) {
            (Some(old), Some(new)) if self.is_option() && old != new => self.dispatch_option_handlers(),
            _ => Ok(()),
        }
    }

    /// Redefine from an expression.
    ///
    /// For `+=` with an `&add_func` (or `-=` with a `&delete_func`) the
    /// attribute's function receives the old and the new value and its
    /// result replaces the value. Otherwise the expression is evaluated and
    /// handed to [`set_val`](Self::set_val).
    pub fn set_val_expr(&mut self, expr: &Expr, class: InitClass) -> Result<(), BindError> {
        let new = self.env.evaluator().evaluate(expr)?;

        let func_kind = match class {
            InitClass::Extra => Some(AttrKind::AddFunc),
            InitClass::Remove => Some(AttrKind::DelFunc),
            InitClass::None | InitClass::Full => None,
        };
        let func_expr = func_kind.and_then(|kind| self.attr_expr(kind).map(|e| (kind, e)));

        match (func_expr, self.val.clone()) {
            (Some((kind, func_expr)), Some(old)) => {
                let func_val = self.env.evaluator().evaluate(&func_expr)?;
                let Some(func) = func_val.as_func() else {
                    return Err(self.redefinition(&format!(
                        "{kind} argument is a {} value, not a function",
                        func_val.kind_name()
                    )));
                };
                let combined = func
                    .call(&[old, new])
                    .map_err(|e| self.redefinition(&format!("{kind} `{}` failed: {e}", func.name())))?
                    .ok_or_else(|| {
                        self.redefinition(&format!("{kind} `{}` returned no value", func.name()))
                    })?;
                self.set_val(combined, InitClass::Full)
            }
            _ => self.set_val(new, class),
        }
    }

    /// Give the binding its initial value.
    ///
    /// Uses the initializer if there is one, else the `&default` argument
    /// (not for tables, where `&default` is the default of missing entries),
    /// else the type's default value. Types without a default value leave
    /// the binding typed but unbound.
    pub fn initialize(&mut self, init: Option<&Expr>, class: InitClass) -> Result<(), BindError> {
        if let Some(expr) = init {
            return self.set_val_expr(expr, class);
        }

        let Some(ty) = self.ty.clone() else {
            return Err(BindError::Untyped {
                name: self.name.clone(),
            });
        };

        let value = match self.attr_expr(AttrKind::HasDefault) {
            Some(default) if !ty.is_table() => self.env.evaluator().evaluate(&default)?,
            _ => match self.env.types().default_value(&ty) {
                Some(v) => v,
                None => return Ok(()),
            },
        };
        self.set_val(value, InitClass::Full)
    }

    /// Drop the value, keeping the type.
    pub fn clear_val(&mut self) {
        if self.val.take().is_some() {
            self.modified();
        }
    }

    // ========================================================================
    // Flags
    // ========================================================================

    pub fn set_const(&mut self) {
        self.flags.insert(IdFlags::CONST);
    }

    pub fn is_const(&self) -> bool {
        self.flags.contains(IdFlags::CONST)
    }

    /// Mark the binding as a runtime option. Irreversible.
    ///
    /// An `&on_change` attached before this point is registered now.
    pub fn set_option(&mut self) -> Result<(), BindError> {
        if self.is_option() {
            return Ok(());
        }
        self.flags.insert(IdFlags::OPTION);
        self.update_val_attrs()
    }

    pub fn is_option(&self) -> bool {
        self.flags.contains(IdFlags::OPTION)
    }

    pub fn set_enum_const(&mut self) {
        self.flags.insert(IdFlags::ENUM_CONST);
    }

    pub fn is_enum_const(&self) -> bool {
        self.flags.contains(IdFlags::ENUM_CONST)
    }

    pub fn is_error_handler(&self) -> bool {
        self.flags.contains(IdFlags::ERROR_HANDLER)
    }

    pub fn is_logged(&self) -> bool {
        self.flags.contains(IdFlags::LOGGED)
    }

    pub fn infer_return_type(&self) -> bool {
        self.flags.contains(IdFlags::INFER_RETURN_TYPE)
    }

    pub fn set_infer_return_type(&mut self, infer: bool) {
        self.flags.set(IdFlags::INFER_RETURN_TYPE, infer);
    }

    /// Position in the enclosing frame, assigned by the frame allocator.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        debug_assert!(self.offset.is_none(), "offset of `{}` assigned twice", self.name);
        self.offset = Some(offset);
    }

    /// Whether a later declaration may touch this binding again.
    ///
    /// Constants never are. Otherwise the binding needs `&redef`, except for
    /// options, which are implicitly redefinable.
    pub fn is_redefinable(&self) -> bool {
        !self.is_const() && (self.is_option() || self.attr(AttrKind::Redefinable).is_some())
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    pub fn attrs(&self) -> Option<&AttributesRef> {
        self.attrs.as_ref()
    }

    pub fn attr(&self, kind: AttrKind) -> Option<&Attr> {
        self.attrs.as_ref()?.find(kind)
    }

    /// Replace the attribute set.
    pub fn set_attrs(&mut self, attrs: AttributesRef) -> Result<(), BindError> {
        self.validate_attrs(&attrs, self.ty.as_ref())?;
        self.attrs = Some(attrs);
        let result = self.update_val_attrs();
        self.modified();
        result
    }

    /// Merge `attrs` into the attribute set; later attributes of the same
    /// kind win.
    ///
    /// An attribute set shared with other bindings is copied before it is
    /// changed.
    pub fn add_attrs(&mut self, attrs: AttributesRef) -> Result<(), BindError> {
        self.validate_attrs(&attrs, self.ty.as_ref())?;
        match self.attrs.as_mut() {
            Some(existing) => Rc::make_mut(existing).merge(&attrs),
            None => self.attrs = Some(attrs),
        }
        let result = self.update_val_attrs();
        self.modified();
        result
    }

    pub fn remove_attr(&mut self, kind: AttrKind) -> Result<(), BindError> {
        let Some(attrs) = self.attrs.as_mut() else {
            return Ok(());
        };
        if !attrs.contains(kind) {
            return Ok(());
        }
        Rc::make_mut(attrs).remove(kind);
        let result = self.update_val_attrs();
        self.modified();
        result
    }

    /// Bring the value and the derived state in line with the attributes.
    ///
    /// Table values take the binding's attribute set. The error-handler and
    /// logged flags are recomputed. For options, the `&on_change` function
    /// is (re)registered as a change handler at the `&priority` value.
    pub fn update_val_attrs(&mut self) -> Result<(), BindError> {
        if let Some(val) = self.val.take() {
            self.val = Some(self.attach_attrs(val));
        }

        let mut derived = IdFlags::empty();
        if let (Some(attrs), Some(ty)) = (&self.attrs, &self.ty) {
            if ty.is_func() && attrs.contains(AttrKind::ErrorHandler) {
                derived |= IdFlags::ERROR_HANDLER;
            }
            if ty.is_record() && attrs.contains(AttrKind::Logged) {
                derived |= IdFlags::LOGGED;
            }
        }
        self.flags = (self.flags - IdFlags::DERIVED) | derived;

        self.sync_on_change_handler()
    }

    fn validate_attrs(&self, attrs: &Attributes, ty: Option<&TypeRef>) -> Result<(), BindError> {
        let ctx = AttrContext {
            owner_type: ty,
            in_record: false,
            global: self.is_global(),
            is_option: self.is_option(),
        };
        for attr in attrs.iter() {
            self.env
                .validator()
                .validate(attr, &ctx)
                .map_err(|reason| BindError::AttributeRejected {
                    name: self.name.clone(),
                    kind: attr.kind(),
                    reason,
                })?;
        }
        Ok(())
    }

    fn attr_expr(&self, kind: AttrKind) -> Option<ExprRef> {
        self.attr(kind).and_then(|a| a.expr()).cloned()
    }

    /// Hand the attribute set to a table value.
    fn attach_attrs(&self, value: ValueRef) -> ValueRef {
        let retagged = match (&self.attrs, &*value) {
            (Some(attrs), Value::Table(table))
                if !table.attrs().is_some_and(|a| Rc::ptr_eq(a, attrs)) =>
            {
                let mut table = table.clone();
                table.set_attrs(Some(Rc::clone(attrs)));
                Some(Rc::new(Value::Table(table)))
            }
            _ => None,
        };
        retagged.unwrap_or(value)
    }

    fn sync_on_change_handler(&mut self) -> Result<(), BindError> {
        let wanted = match self.attr_expr(AttrKind::OnChange) {
            Some(expr) if self.is_option() => {
                let priority = self.handler_priority()?;
                let value = self.env.evaluator().evaluate(&expr)?;
                let Some(func) = value.as_func() else {
                    return Err(BindError::AttributeRejected {
                        name: self.name.clone(),
                        kind: AttrKind::OnChange,
                        reason: format!("argument is a {} value, not a function", value.kind_name()),
                    });
                };
                Some((priority, Rc::clone(func)))
            }
            _ => None,
        };

        let unchanged = match (&self.on_change, &wanted) {
            (Some((p0, f0)), Some((p1, f1))) => p0 == p1 && Rc::ptr_eq(f0, f1),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return Ok(());
        }

        if let Some((old_priority, old)) = self.on_change.take() {
            let mut removed = false;
            self.option_handlers.retain(|priority, handler| {
                let hit = !removed && priority == old_priority && Rc::ptr_eq(handler, &old);
                removed |= hit;
                !hit
            });
        }
        if let Some((priority, func)) = wanted {
            debug!(
                "option `{}`: registering {} handler `{}` at priority {}",
                self.name,
                AttrKind::OnChange,
                func.name(),
                priority
            );
            self.option_handlers.insert(priority, Rc::clone(&func));
            self.on_change = Some((priority, func));
        }
        Ok(())
    }

    fn handler_priority(&self) -> Result<i32, BindError> {
        let Some(expr) = self.attr_expr(AttrKind::Priority) else {
            return Ok(0);
        };
        let value = self.env.evaluator().evaluate(&expr)?;
        value
            .as_int()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| BindError::AttributeRejected {
                name: self.name.clone(),
                kind: AttrKind::Priority,
                reason: format!("expected an integer, got {}", value),
            })
    }

    // ========================================================================
    // Deprecation
    // ========================================================================

    pub fn is_deprecated(&self) -> bool {
        self.attr(AttrKind::Deprecated).is_some()
    }

    /// Mark the binding deprecated, optionally with an expression producing
    /// an explanatory message.
    pub fn make_deprecated(&mut self, message: Option<ExprRef>) -> Result<(), BindError> {
        let attr = match message {
            Some(expr) => Attr::with_expr(AttrKind::Deprecated, expr)?,
            None => Attr::new(AttrKind::Deprecated),
        };
        let attrs = Attributes::from_attrs([attr], self.ty.clone(), false, self.is_global());
        self.add_attrs(Rc::new(attrs))
    }

    /// The warning to emit when a deprecated binding is used.
    ///
    /// The message expression is evaluated now, not at declaration time.
    pub fn deprecation_warning(&self) -> String {
        let message = self
            .attr_expr(AttrKind::Deprecated)
            .and_then(|expr| match self.env.evaluator().evaluate(&expr) {
                Ok(v) => v.as_str().map(str::to_string),
                Err(err) => {
                    debug!("deprecation message of `{}` did not evaluate: {}", self.name, err);
                    None
                }
            })
            .filter(|m| !m.is_empty());

        match message {
            Some(message) => format!("deprecated ({}): {}", self.name, message),
            None => format!("deprecated ({})", self.name),
        }
    }

    // ========================================================================
    // Option handlers
    // ========================================================================

    pub fn has_option_handlers(&self) -> bool {
        !self.option_handlers.is_empty()
    }

    /// Register `callback` to run when the option changes. Lower priorities
    /// run first; equal priorities run in registration order.
    pub fn add_option_handler(&mut self, callback: FuncRef, priority: i32) {
        self.option_handlers.insert(priority, callback);
    }

    /// The registered handlers in dispatch order.
    pub fn option_handlers(&self) -> Vec<FuncRef> {
        self.option_handlers.values().cloned().collect()
    }

    fn dispatch_option_handlers(&self) -> Result<(), BindError> {
        let Some(value) = self.val.clone() else {
            return Ok(());
        };
        let args = [Value::string(self.name.as_str()), value];
        let policy = self.env.options().handler_failures;

        let mut first_failure = None;
        for (priority, handler) in self.option_handlers.iter() {
            debug!(
                "option `{}` changed: calling `{}` (priority {})",
                self.name,
                handler.name(),
                priority
            );
            let Err(err) = handler.call(&args) else {
                continue;
            };
            let failure = BindError::OptionHandler {
                name: self.name.clone(),
                handler: handler.name().to_string(),
                reason: err.to_string(),
            };
            if first_failure.is_none() {
                first_failure = Some(failure);
            } else {
                warn!("{failure}");
            }
            if policy == HandlerFailurePolicy::StopAtFirst {
                break;
            }
        }
        first_failure.map_or(Ok(()), Err)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn redefinition(&self, reason: &str) -> BindError {
        BindError::Redefinition {
            name: self.name.clone(),
            reason: reason.to_string(),
        }
    }

    fn modified(&self) {
        if self.env.options().notify_modifications {
            self.env.notifier().modified(self);
        }
    }
}
