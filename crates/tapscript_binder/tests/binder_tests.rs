//! Binder integration tests.
//!
//! Exercises identifier bindings, option dispatch, change notification,
//! scopes, and the global symbol table through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tapscript_binder::{
    BindError, BindingEnv, EnvRef, GlobalTable, IdScope, Identifier, InitClass, LookupError,
    NotifyError, Receiver, Scope, WellKnownTypes,
};
use tapscript_options::{BindingOptions, HandlerFailurePolicy};
use tapscript_types::{
    Attr, AttrKind, Attributes, AttributesRef, EnumVal, Expr, FuncFlavor, FuncError, FuncRef,
    Func, RecordField, Type, TypeKind, Value, ValueRef,
};

fn env() -> EnvRef {
    BindingEnv::default().into_ref()
}

fn env_with(options: BindingOptions) -> EnvRef {
    BindingEnv::new(options).into_ref()
}

/// A global binding with the given type.
fn typed(env: &EnvRef, name: &str, ty: tapscript_types::TypeRef) -> Identifier {
    let mut id = Identifier::new(name, IdScope::Global, false, env);
    id.set_type(ty).unwrap();
    id
}

/// A count option bound to 0.
fn count_option(env: &EnvRef, name: &str) -> Identifier {
    let mut id = Identifier::new(name, IdScope::Module, true, env);
    id.set_type(Type::count()).unwrap();
    id.set_option().unwrap();
    id.set_val(Value::count(0), InitClass::Full).unwrap();
    id
}

fn global_attrs(attrs: Vec<Attr>) -> AttributesRef {
    Rc::new(Attributes::from_attrs(attrs, None, false, true))
}

fn func_expr(func: &FuncRef) -> tapscript_types::ExprRef {
    Expr::constant(Value::Func(Rc::clone(func)))
}

/// A handler that appends `tag` to `log` when called.
fn recorder(log: &Rc<RefCell<Vec<i32>>>, tag: i32) -> FuncRef {
    let log = Rc::clone(log);
    Func::builtin(format!("handler_{tag}"), move |_| {
        log.borrow_mut().push(tag);
        Ok(None)
    })
}

fn strings(items: &[&str]) -> ValueRef {
    Value::set_of(items.iter().map(|s| Value::string(*s)))
}

#[derive(Default)]
struct Counter {
    hits: Cell<usize>,
    saw_value: RefCell<Vec<bool>>,
}

impl Receiver for Counter {
    fn modified(&self, id: &Identifier) -> Result<(), NotifyError> {
        self.hits.set(self.hits.get() + 1);
        self.saw_value.borrow_mut().push(id.has_val());
        Ok(())
    }
}

struct Failing;

impl Receiver for Failing {
    fn modified(&self, id: &Identifier) -> Result<(), NotifyError> {
        Err(NotifyError(format!("cannot observe {}", id.name())))
    }
}

// ============================================================================
// Values and redefinition
// ============================================================================

#[test]
fn test_full_redefinition_replaces_value() {
    let env = env();
    let mut id = typed(&env, "max_files", Type::count());
    id.set_val(Value::count(1), InitClass::Full).unwrap();
    id.set_val(Value::count(2), InitClass::Full).unwrap();
    assert_eq!(**id.val().unwrap(), Value::Count(2));
}

#[test]
fn test_extra_without_value_fails() {
    let env = env();
    let mut id = typed(&env, "ports", Type::set_of(vec![Type::port()]));
    let err = id.set_val(strings(&["x"]), InitClass::Extra).unwrap_err();
    assert!(matches!(err, BindError::Redefinition { ref name, .. } if name == "ports"));
    assert!(!id.has_val());

    let err = id.set_val(strings(&["x"]), InitClass::Remove).unwrap_err();
    assert!(matches!(err, BindError::Redefinition { .. }));
}

#[test]
fn test_extra_and_remove_merge_sets() {
    let env = env();
    let mut id = typed(&env, "services", Type::set_of(vec![Type::string()]));
    id.set_val(strings(&["http"]), InitClass::Full).unwrap();

    id.set_val(strings(&["dns", "ssh"]), InitClass::Extra).unwrap();
    assert_eq!(**id.val().unwrap(), *strings(&["http", "dns", "ssh"]));

    id.set_val(strings(&["ssh"]), InitClass::Remove).unwrap();
    assert_eq!(**id.val().unwrap(), *strings(&["http", "dns"]));
}

#[test]
fn test_extra_on_scalar_is_a_redefinition_error() {
    let env = env();
    let mut id = typed(&env, "n", Type::count());
    id.set_val(Value::count(1), InitClass::Full).unwrap();
    let err = id.set_val(Value::count(2), InitClass::Extra).unwrap_err();
    assert!(matches!(err, BindError::Redefinition { .. }));
    assert_eq!(**id.val().unwrap(), Value::Count(1));
}

#[test]
fn test_value_requires_type() {
    let env = env();
    let mut id = Identifier::new("untyped", IdScope::Global, false, &env);
    assert_eq!(
        id.set_val(Value::count(1), InitClass::None).unwrap_err(),
        BindError::Untyped {
            name: "untyped".into()
        }
    );
    assert!(matches!(
        id.initialize(None, InitClass::None),
        Err(BindError::Untyped { .. })
    ));
}

#[test]
fn test_clear_val_returns_to_typed() {
    let env = env();
    let mut id = typed(&env, "x", Type::count());
    id.set_val(Value::count(3), InitClass::Full).unwrap();
    id.clear_val();
    assert!(!id.has_val());
    assert!(id.ty().is_some());
    id.clear_val();
    assert!(!id.has_val());
}

#[test]
fn test_enum_constant_cannot_be_rebound() {
    let env = env();
    let ty = Type::new(TypeKind::Enum {
        names: vec!["RED".into(), "GREEN".into()],
    });
    let mut id = typed(&env, "RED", ty);
    id.set_const();
    id.set_enum_const();
    let red = Rc::new(Value::Enum(EnumVal {
        name: "RED".into(),
        ordinal: 0,
    }));
    id.set_val(Rc::clone(&red), InitClass::Full).unwrap();
    let err = id.set_val(red, InitClass::Full).unwrap_err();
    assert!(matches!(err, BindError::Redefinition { .. }));
}

#[test]
fn test_incompatible_type_change_is_rejected() {
    let env = env();
    let mut id = typed(&env, "x", Type::count());
    id.set_val(Value::count(1), InitClass::Full).unwrap();

    let err = id.set_type(Type::string()).unwrap_err();
    assert!(matches!(err, BindError::TypeConflict { ref name, .. } if name == "x"));
    assert_eq!(id.ty().unwrap().tag_name(), "count");

    id.set_type(Type::count()).unwrap();
}

#[test]
fn test_type_change_without_value_is_free() {
    let env = env();
    let mut id = typed(&env, "x", Type::count());
    id.set_type(Type::string()).unwrap();
    assert_eq!(id.ty().unwrap().tag_name(), "string");
}

// ============================================================================
// Expression redefinition and initialization
// ============================================================================

#[test]
fn test_add_func_combines_old_and_new() {
    let env = env();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let add_func = Func::builtin("merge_nets", move |args| {
        counter.set(counter.get() + 1);
        let [old, new] = args else {
            return Err(FuncError("expected two arguments".into()));
        };
        let mut merged = old.as_table().cloned().unwrap_or_default();
        for (k, _) in new.as_table().into_iter().flat_map(|t| t.iter()) {
            merged.insert(Rc::clone(k), None);
        }
        merged.insert(Value::string("via-add-func"), None);
        Ok(Some(Rc::new(Value::Table(merged))))
    });

    let mut id = typed(&env, "local_nets", Type::set_of(vec![Type::string()]));
    id.add_attrs(global_attrs(vec![
        Attr::with_expr(AttrKind::AddFunc, func_expr(&add_func)).unwrap(),
    ]))
    .unwrap();
    assert!(id.is_redefinable());

    id.set_val(strings(&["a"]), InitClass::Full).unwrap();
    let addition = Expr::value(strings(&["b"]));
    id.set_val_expr(&addition, InitClass::Extra).unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(**id.val().unwrap(), *strings(&["a", "b", "via-add-func"]));
}

#[test]
fn test_set_val_expr_without_func_merges_directly() {
    let env = env();
    let mut id = typed(&env, "names", Type::set_of(vec![Type::string()]));
    id.set_val_expr(&Expr::value(strings(&["a", "b"])), InitClass::Full)
        .unwrap();
    id.set_val_expr(&Expr::value(strings(&["a"])), InitClass::Remove)
        .unwrap();
    assert_eq!(**id.val().unwrap(), *strings(&["b"]));
}

#[test]
fn test_set_val_expr_reports_evaluation_failure() {
    let env = env();
    let mut id = typed(&env, "x", Type::count());
    let err = id
        .set_val_expr(&Expr::name("not_a_constant"), InitClass::Full)
        .unwrap_err();
    assert!(matches!(err, BindError::Evaluation(_)));
    assert!(!id.has_val());
}

#[test]
fn test_initialize_prefers_initializer() {
    let env = env();
    let mut id = typed(&env, "x", Type::count());
    id.add_attrs(global_attrs(vec![
        Attr::with_expr(AttrKind::HasDefault, Expr::constant(Value::Count(42))).unwrap(),
    ]))
    .unwrap();
    id.initialize(Some(&Expr::Const(Value::count(7))), InitClass::Full)
        .unwrap();
    assert_eq!(**id.val().unwrap(), Value::Count(7));
}

#[test]
fn test_initialize_uses_default_attribute() {
    let env = env();
    let mut id = typed(&env, "x", Type::count());
    id.add_attrs(global_attrs(vec![
        Attr::with_expr(AttrKind::HasDefault, Expr::constant(Value::Count(42))).unwrap(),
    ]))
    .unwrap();
    id.initialize(None, InitClass::None).unwrap();
    assert_eq!(**id.val().unwrap(), Value::Count(42));
}

#[test]
fn test_initialize_ignores_table_default() {
    let env = env();
    let mut id = typed(&env, "t", Type::table_of(vec![Type::string()], Type::count()));
    id.add_attrs(global_attrs(vec![
        Attr::with_expr(AttrKind::HasDefault, Expr::constant(Value::Count(0))).unwrap(),
    ]))
    .unwrap();
    id.initialize(None, InitClass::None).unwrap();
    let table = id.val().unwrap().as_table().unwrap();
    assert!(table.is_empty());
}

#[test]
fn test_initialize_falls_back_to_type_default() {
    let env = env();
    let mut id = typed(&env, "s", Type::string());
    id.initialize(None, InitClass::None).unwrap();
    assert_eq!(id.val().unwrap().as_str(), Some(""));

    let mut fields = indexmap::IndexMap::new();
    fields.insert("host".to_string(), RecordField::new(Type::addr()));
    let mut rec = typed(&env, "r", Type::new(TypeKind::Record { fields }));
    rec.initialize(None, InitClass::None).unwrap();
    assert!(!rec.has_val());
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn test_redefinable_rules() {
    let env = env();
    let mut plain = typed(&env, "plain", Type::count());
    assert!(!plain.is_redefinable());

    plain
        .add_attrs(global_attrs(vec![Attr::new(AttrKind::Redefinable)]))
        .unwrap();
    assert!(plain.is_redefinable());

    plain.set_const();
    assert!(!plain.is_redefinable());

    let option = count_option(&env, "Site::threshold");
    assert!(option.attrs().is_none());
    assert!(option.is_redefinable());
}

#[test]
fn test_misplaced_attribute_is_rejected() {
    let env = env();
    let mut id = typed(&env, "x", Type::count());
    let err = id
        .add_attrs(global_attrs(vec![Attr::new(AttrKind::Optional)]))
        .unwrap_err();
    assert!(matches!(
        err,
        BindError::AttributeRejected {
            kind: AttrKind::Optional,
            ..
        }
    ));
    assert!(id.attrs().is_none());
}

#[test]
fn test_add_attrs_is_last_write_wins() {
    let env = env();
    let mut id = typed(&env, "x", Type::count());
    let second = Expr::constant(Value::Count(2));
    id.add_attrs(global_attrs(vec![
        Attr::with_expr(AttrKind::HasDefault, Expr::constant(Value::Count(1))).unwrap(),
    ]))
    .unwrap();
    id.add_attrs(global_attrs(vec![
        Attr::with_expr(AttrKind::HasDefault, Rc::clone(&second)).unwrap(),
    ]))
    .unwrap();

    let attrs = id.attrs().unwrap();
    assert_eq!(attrs.len(), 1);
    assert!(Rc::ptr_eq(attrs.find(AttrKind::HasDefault).unwrap().expr().unwrap(), &second));
}

#[test]
fn test_shared_attribute_set_is_copied_on_write() {
    let env = env();
    let shared = global_attrs(vec![Attr::new(AttrKind::Redefinable)]);
    let mut a = typed(&env, "a", Type::count());
    let mut b = typed(&env, "b", Type::count());
    a.set_attrs(Rc::clone(&shared)).unwrap();
    b.set_attrs(Rc::clone(&shared)).unwrap();
    assert!(Rc::ptr_eq(a.attrs().unwrap(), b.attrs().unwrap()));

    a.remove_attr(AttrKind::Redefinable).unwrap();
    assert!(!a.is_redefinable());
    assert!(b.is_redefinable());
    assert_eq!(shared.len(), 1);
}

#[test]
fn test_table_value_carries_binding_attributes() {
    let env = env();
    let mut id = typed(&env, "t", Type::set_of(vec![Type::string()]));
    id.add_attrs(global_attrs(vec![Attr::new(AttrKind::Redefinable)]))
        .unwrap();
    id.set_val(strings(&["a"]), InitClass::Full).unwrap();

    let table_attrs = id.val().unwrap().as_table().unwrap().attrs().cloned();
    assert!(Rc::ptr_eq(&table_attrs.unwrap(), id.attrs().unwrap()));

    id.add_attrs(global_attrs(vec![
        Attr::with_expr(AttrKind::ExpireRead, Expr::constant(Value::Interval(60.0))).unwrap(),
    ]))
    .unwrap();
    let table_attrs = id.val().unwrap().as_table().unwrap().attrs().cloned().unwrap();
    assert!(Rc::ptr_eq(&table_attrs, id.attrs().unwrap()));
    assert!(table_attrs.contains(AttrKind::ExpireRead));
}

#[test]
fn test_derived_flags_follow_attributes() {
    let env = env();
    let event = Type::new(TypeKind::Func {
        flavor: FuncFlavor::Event,
        params: vec![Type::string()],
        yield_type: None,
    });
    let mut id = typed(&env, "reporter_error", event);
    id.add_attrs(global_attrs(vec![Attr::new(AttrKind::ErrorHandler)]))
        .unwrap();
    assert!(id.is_error_handler());
    assert!(!id.is_logged());

    id.set_attrs(global_attrs(vec![])).unwrap();
    assert!(!id.is_error_handler());
}

#[test]
fn test_derived_flags_when_type_follows_attributes() {
    let env = env();
    let mut info = Identifier::new("Conn::Info", IdScope::Module, true, &env);
    info.add_attrs(global_attrs(vec![Attr::new(AttrKind::Logged)]))
        .unwrap();
    assert!(!info.is_logged());

    let mut fields = indexmap::IndexMap::new();
    fields.insert("uid".to_string(), RecordField::new(Type::string()));
    info.set_type(Type::new(TypeKind::Record { fields })).unwrap();
    assert!(info.is_logged());

    let mut reporter = Identifier::new("reporter_error", IdScope::Global, false, &env);
    reporter
        .add_attrs(global_attrs(vec![Attr::new(AttrKind::ErrorHandler)]))
        .unwrap();
    reporter
        .set_type(Type::new(TypeKind::Func {
            flavor: FuncFlavor::Event,
            params: vec![Type::string()],
            yield_type: None,
        }))
        .unwrap();
    assert!(reporter.is_error_handler());
}

#[test]
fn test_late_type_rechecks_attributes() {
    let env = env();
    let mut id = Identifier::new("n", IdScope::Global, false, &env);
    id.add_attrs(global_attrs(vec![Attr::new(AttrKind::Logged)]))
        .unwrap();

    let err = id.set_type(Type::count()).unwrap_err();
    assert!(matches!(
        err,
        BindError::AttributeRejected {
            kind: AttrKind::Logged,
            ..
        }
    ));
    assert!(id.ty().is_none());
    assert!(!id.is_logged());
}

// ============================================================================
// Deprecation
// ============================================================================

#[test]
fn test_deprecation_warning_without_message() {
    let env = env();
    let mut id = Identifier::new("Old::thing", IdScope::Module, true, &env);
    assert!(!id.is_deprecated());
    id.make_deprecated(None).unwrap();
    assert!(id.is_deprecated());
    assert_eq!(id.deprecation_warning(), "deprecated (Old::thing)");
}

#[test]
fn test_deprecation_warning_with_message() {
    let env = env();
    let mut id = Identifier::new("Old::thing", IdScope::Module, true, &env);
    let message = Expr::constant(Value::String("use X instead".into()));
    id.make_deprecated(Some(message)).unwrap();
    let warning = id.deprecation_warning();
    assert!(warning.contains("Old::thing"));
    assert!(warning.ends_with(": use X instead"), "{warning}");
}

#[test]
fn test_deprecation_message_that_fails_to_evaluate() {
    let env = env();
    let mut id = Identifier::new("old", IdScope::Global, false, &env);
    id.make_deprecated(Some(Expr::name("missing_message"))).unwrap();
    assert_eq!(id.deprecation_warning(), "deprecated (old)");
}

// ============================================================================
// Option handlers
// ============================================================================

#[test]
fn test_option_handlers_fire_by_ascending_priority() {
    let env = env();
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut id = count_option(&env, "Site::threshold");
    for priority in [5, 1, 3] {
        id.add_option_handler(recorder(&log, priority), priority);
    }

    id.set_val(Value::count(10), InitClass::Full).unwrap();
    assert_eq!(*log.borrow(), vec![1, 3, 5]);

    let names: Vec<_> = id.option_handlers().iter().map(|f| f.name().to_string()).collect();
    assert_eq!(names, ["handler_1", "handler_3", "handler_5"]);
}

#[test]
fn test_equal_priorities_fire_in_registration_order() {
    let env = env();
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut id = count_option(&env, "opt");
    id.add_option_handler(recorder(&log, 20), 0);
    id.add_option_handler(recorder(&log, 10), 0);
    id.set_val(Value::count(1), InitClass::Full).unwrap();
    assert_eq!(*log.borrow(), vec![20, 10]);
}

#[test]
fn test_option_handler_receives_name_and_value() {
    let env = env();
    let seen: Rc<RefCell<Vec<Vec<ValueRef>>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let handler = Func::builtin("watch", move |args| {
        sink.borrow_mut().push(args.to_vec());
        Ok(None)
    });

    let mut id = count_option(&env, "Site::threshold");
    id.add_option_handler(handler, 0);
    id.set_val(Value::count(5), InitClass::Full).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0][0].as_str(), Some("Site::threshold"));
    assert_eq!(*seen[0][1], Value::Count(5));
}

#[test]
fn test_handlers_skip_unchanged_value_and_first_binding() {
    let env = env();
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut id = Identifier::new("opt", IdScope::Global, false, &env);
    id.set_type(Type::count()).unwrap();
    id.set_option().unwrap();
    id.add_option_handler(recorder(&log, 1), 0);

    id.set_val(Value::count(0), InitClass::Full).unwrap();
    id.set_val(Value::count(0), InitClass::Full).unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn test_non_option_never_dispatches() {
    let env = env();
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut id = typed(&env, "x", Type::count());
    id.add_option_handler(recorder(&log, 1), 0);
    id.set_val(Value::count(1), InitClass::Full).unwrap();
    id.set_val(Value::count(2), InitClass::Full).unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn test_handler_failure_is_reported_after_commit() {
    let env = env();
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut id = count_option(&env, "opt");
    id.add_option_handler(
        Func::builtin("reject", |_| Err(FuncError("value out of range".into()))),
        1,
    );
    id.add_option_handler(recorder(&log, 2), 2);

    let err = id.set_val(Value::count(99), InitClass::Full).unwrap_err();
    assert_eq!(
        err,
        BindError::OptionHandler {
            name: "opt".into(),
            handler: "reject".into(),
            reason: "value out of range".into(),
        }
    );
    assert_eq!(**id.val().unwrap(), Value::Count(99));
    assert_eq!(*log.borrow(), vec![2]);
}

#[test]
fn test_stop_at_first_handler_failure() {
    let env = env_with(BindingOptions {
        handler_failures: HandlerFailurePolicy::StopAtFirst,
        ..BindingOptions::default()
    });
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut id = count_option(&env, "opt");
    id.add_option_handler(Func::builtin("reject", |_| Err(FuncError("no".into()))), 1);
    id.add_option_handler(recorder(&log, 2), 2);

    assert!(matches!(
        id.set_val(Value::count(1), InitClass::Full),
        Err(BindError::OptionHandler { .. })
    ));
    assert!(log.borrow().is_empty());
    assert_eq!(**id.val().unwrap(), Value::Count(1));
}

#[test]
fn test_on_change_attribute_registers_handler() {
    let env = env();
    let log = Rc::new(RefCell::new(Vec::new()));
    let on_change = recorder(&log, 7);
    let mut id = count_option(&env, "opt");

    let attrs = || {
        global_attrs(vec![
            Attr::with_expr(AttrKind::OnChange, func_expr(&on_change)).unwrap(),
            Attr::with_expr(AttrKind::Priority, Expr::constant(Value::Int(-5))).unwrap(),
        ])
    };
    id.add_attrs(attrs()).unwrap();
    id.add_option_handler(recorder(&log, 1), 0);
    assert_eq!(id.option_handlers().len(), 2);

    // Re-declaring the same handler does not register it twice.
    id.add_attrs(attrs()).unwrap();
    assert_eq!(id.option_handlers().len(), 2);

    id.set_val(Value::count(3), InitClass::Full).unwrap();
    assert_eq!(*log.borrow(), vec![7, 1]);

    id.remove_attr(AttrKind::OnChange).unwrap();
    assert_eq!(id.option_handlers().len(), 1);
    assert_eq!(id.option_handlers()[0].name(), "handler_1");
}

#[test]
fn test_on_change_registered_when_binding_becomes_option() {
    let env = env();
    let log = Rc::new(RefCell::new(Vec::new()));
    let on_change = recorder(&log, 3);
    let mut id = typed(&env, "Site::local_zones", Type::set_of(vec![Type::string()]));
    id.add_attrs(global_attrs(vec![
        Attr::with_expr(AttrKind::OnChange, func_expr(&on_change)).unwrap(),
    ]))
    .unwrap();
    assert!(!id.has_option_handlers());

    id.set_option().unwrap();
    assert_eq!(id.option_handlers().len(), 1);

    id.set_val(strings(&["a"]), InitClass::Full).unwrap();
    id.set_val(strings(&["b"]), InitClass::Full).unwrap();
    assert_eq!(*log.borrow(), vec![3]);
}

#[test]
fn test_on_change_must_be_a_function() {
    let env = env();
    let mut id = count_option(&env, "opt");
    let err = id
        .add_attrs(global_attrs(vec![
            Attr::with_expr(AttrKind::OnChange, Expr::constant(Value::Count(1))).unwrap(),
        ]))
        .unwrap_err();
    assert!(matches!(
        err,
        BindError::AttributeRejected {
            kind: AttrKind::OnChange,
            ..
        }
    ));
    assert!(!id.has_option_handlers());
}

// ============================================================================
// Change notification
// ============================================================================

#[test]
fn test_every_mutation_is_notified_once() {
    let env = env();
    let counter = Rc::new(Counter::default());
    env.notifier().register(counter.clone());

    let mut id = Identifier::new("x", IdScope::Global, false, &env);
    id.set_type(Type::count()).unwrap();
    id.set_val(Value::count(1), InitClass::Full).unwrap();
    id.clear_val();
    id.clear_val();
    id.set_export();
    id.set_export();
    id.add_attrs(global_attrs(vec![Attr::new(AttrKind::Redefinable)]))
        .unwrap();
    id.remove_attr(AttrKind::Redefinable).unwrap();
    id.remove_attr(AttrKind::Redefinable).unwrap();

    assert_eq!(counter.hits.get(), 6);
}

#[test]
fn test_receiver_sees_committed_state() {
    let env = env();
    let counter = Rc::new(Counter::default());
    env.notifier().register(counter.clone());

    let mut id = typed(&env, "x", Type::count());
    id.set_val(Value::count(1), InitClass::Full).unwrap();
    id.clear_val();
    assert_eq!(*counter.saw_value.borrow(), vec![false, true, false]);
}

#[test]
fn test_failing_receiver_does_not_affect_mutation() {
    let env = env();
    let counter = Rc::new(Counter::default());
    env.notifier().register(Rc::new(Failing));
    env.notifier().register(counter.clone());

    let mut id = typed(&env, "x", Type::count());
    id.set_val(Value::count(1), InitClass::Full).unwrap();
    assert!(id.has_val());
    assert_eq!(counter.hits.get(), 2);
}

#[test]
fn test_unregister_stops_notifications() {
    let env = env();
    let counter = Rc::new(Counter::default());
    let sub = env.notifier().register(counter.clone());
    assert!(env.notifier().unregister(sub));
    assert!(!env.notifier().unregister(sub));
    assert!(env.notifier().is_empty());

    let _id = typed(&env, "x", Type::count());
    assert_eq!(counter.hits.get(), 0);
}

#[test]
fn test_notifications_can_be_disabled() {
    let env = env_with(BindingOptions {
        notify_modifications: false,
        ..BindingOptions::default()
    });
    let counter = Rc::new(Counter::default());
    env.notifier().register(counter.clone());

    let mut id = typed(&env, "x", Type::count());
    id.set_val(Value::count(1), InitClass::Full).unwrap();
    assert_eq!(counter.hits.get(), 0);
}

// ============================================================================
// Scopes
// ============================================================================

#[test]
fn test_function_frame_assigns_offsets() {
    let env = env();
    let mut frame = Scope::function("Conn", &env);
    for name in ["a", "b", "c"] {
        frame.install(name, false);
    }
    // Re-declaration reuses the slot.
    frame.install("b", false);

    assert_eq!(frame.frame_size(), 3);
    assert_eq!(frame.lookup("a").unwrap().offset(), Some(0));
    assert_eq!(frame.lookup("c").unwrap().offset(), Some(2));
    assert_eq!(frame.lookup("c").unwrap().scope(), IdScope::Local);
    assert_eq!(frame.lookup("c").unwrap().name(), "c");
    assert!(frame.lookup("d").is_none());
}

#[test]
fn test_module_scope_qualifies_names() {
    let env = env();
    let mut module = Scope::module("Conn", &env);
    module.install("LOG", true);
    module.install("helper", false);

    let log = module.lookup("LOG").unwrap();
    assert_eq!(log.name(), "Conn::LOG");
    assert_eq!(log.module_name(), "Conn");
    assert_eq!(log.offset(), None);
    assert_eq!(module.frame_size(), 0);

    let exported: Vec<_> = module.exported().map(|id| id.name()).collect();
    assert_eq!(exported, ["Conn::LOG"]);
    let all: Vec<_> = module.iter().map(|id| id.name()).collect();
    assert_eq!(all, ["Conn::LOG", "Conn::helper"]);

    module.lookup_mut("helper").unwrap().set_type(Type::count()).unwrap();
    assert!(module.lookup("Conn::helper").unwrap().ty().is_some());
}

// ============================================================================
// Global symbol table
// ============================================================================

fn initialized_table() -> GlobalTable {
    let mut table = GlobalTable::new(&env());
    table.init().unwrap();
    table
}

#[test]
fn test_init_is_idempotent() {
    let mut table = initialized_table();
    let len = table.len();
    assert!(len > 0);
    table.init().unwrap();
    assert_eq!(table.len(), len);
    assert!(table.is_initialized());
}

#[test]
fn test_well_known_types_are_installed() {
    let table = initialized_table();
    for name in [
        "conn_id",
        "endpoint",
        "connection",
        "fa_file",
        "fa_metadata",
        "transport_proto",
        "string_set",
        "string_array",
        "count_set",
        "string_vec",
        "index_vec",
    ] {
        let id = table.find(name).unwrap_or_else(|| panic!("{name} missing"));
        assert!(id.is_type(), "{name} should be a type");
    }

    let connection = table.find_type("connection");
    assert!(connection.is_record());
    assert!(Rc::ptr_eq(
        &connection.field("id").unwrap().ty,
        &table.well_known().conn_id
    ));
    assert!(table.find_type("string_set").is_set());
}

#[test]
fn test_well_known_record_types_get_default_values() {
    let env = env();
    let mut table = GlobalTable::new(&env);
    table.init().unwrap();
    let fa_metadata = Rc::clone(table.find_type("fa_metadata"));

    let id = table.install("Files::last_meta", false);
    id.set_type(fa_metadata).unwrap();
    id.initialize(None, InitClass::None).unwrap();
    assert!(id.has_val());
}

#[test]
fn test_well_known_defaulted_fields_keep_their_default() {
    let types = WellKnownTypes::build().unwrap();
    for (ty, field) in [
        (&types.fa_file, "seen_bytes"),
        (&types.fa_file, "missing_bytes"),
        (&types.fa_metadata, "inferred"),
    ] {
        let attrs = ty.field(field).unwrap().attrs.as_ref().unwrap();
        let default = attrs.find(AttrKind::HasDefault).unwrap();
        assert!(default.expr().is_some(), "{field} lost its &default argument");
    }
}

#[test]
fn test_transport_proto_constants() {
    let table = initialized_table();
    assert_eq!(
        **table.find_const("udp"),
        Value::Enum(EnumVal {
            name: "udp".into(),
            ordinal: 2,
        })
    );
    let tcp = table.find("tcp").unwrap();
    assert!(tcp.is_const());
    assert!(tcp.is_enum_const());
}

#[test]
fn test_find_type_of_unknown_name_is_fatal() {
    let table = initialized_table();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        table.find_type("undefined_name");
    }));
    assert!(result.is_err());
}

#[test]
#[should_panic(expected = "not constant")]
fn test_find_const_of_non_constant_is_fatal() {
    let table = initialized_table();
    table.find_const("conn_id");
}

#[test]
#[should_panic(expected = "has no value")]
fn test_find_val_of_typed_binding_is_fatal() {
    let table = initialized_table();
    table.find_val("connection");
}

#[test]
#[should_panic(expected = "before the symbol table was initialized")]
fn test_well_known_before_init_is_fatal() {
    let table = GlobalTable::new(&env());
    table.well_known();
}

#[test]
fn test_recoverable_lookups() {
    let table = initialized_table();
    assert_eq!(
        table.lookup_type("nope").unwrap_err(),
        LookupError::NotFound("nope".into())
    );
    assert_eq!(
        table.lookup_val("conn_id").unwrap_err(),
        LookupError::NoValue("conn_id".into())
    );
    assert_eq!(
        table.lookup_const("conn_id").unwrap_err(),
        LookupError::NotConst("conn_id".into())
    );
    assert_eq!(
        table.lookup_func("tcp").unwrap_err(),
        LookupError::NotFunc("tcp".into())
    );
}

#[test]
fn test_find_func() {
    let mut table = initialized_table();
    let func_type = Type::new(TypeKind::Func {
        flavor: FuncFlavor::Function,
        params: vec![Type::string()],
        yield_type: Some(Type::string()),
    });
    let body = Func::builtin("to_upper", |args| {
        Ok(args.first().and_then(|a| a.as_str()).map(|s| Value::string(s.to_uppercase())))
    });
    let id = table.install("to_upper", true);
    id.set_type(func_type).unwrap();
    id.set_const();
    id.set_val(Rc::new(Value::Func(Rc::clone(&body))), InitClass::Full)
        .unwrap();

    assert!(Rc::ptr_eq(table.find_func("to_upper"), &body));
}

#[test]
fn test_install_normalizes_names() {
    let mut table = GlobalTable::new(&env());
    table.install("GLOBAL::x", false).set_type(Type::count()).unwrap();
    let x = table.find("x").unwrap();
    assert_eq!(x.name(), "x");
    assert_eq!(x.scope(), IdScope::Global);
    assert!(table.contains("GLOBAL::x"));

    table.install("Site::local_nets", true);
    let nets = table.find("Site::local_nets").unwrap();
    assert_eq!(nets.scope(), IdScope::Module);
    assert_eq!(nets.module_name(), "Site");

    // Installing again returns the existing binding.
    assert!(table.install("x", false).ty().is_some());
    assert_eq!(table.len(), 2);
}

#[test]
fn test_init_without_preloading() {
    let env = env_with(BindingOptions {
        preload_well_known: false,
        ..BindingOptions::default()
    });
    let mut table = GlobalTable::new(&env);
    table.init().unwrap();
    assert!(table.is_initialized());
    assert!(table.is_empty());
    assert!(table.find("conn_id").is_none());
}
