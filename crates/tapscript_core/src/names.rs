//! Module-qualified identifier names.
//!
//! A qualified name has the form `Module::name`. Names without a `::`
//! separator live in the global module.

/// Name of the module that holds unqualified identifiers.
pub const GLOBAL_MODULE: &str = "GLOBAL";

/// Separator between module and variable name.
pub const MODULE_SEPARATOR: &str = "::";

/// The module part of `name`, or [`GLOBAL_MODULE`] if it is unqualified.
pub fn extract_module_name(name: &str) -> &str {
    match name.rfind(MODULE_SEPARATOR) {
        Some(pos) => &name[..pos],
        None => GLOBAL_MODULE,
    }
}

/// The variable part of `name`, dropping any module qualifier.
pub fn extract_var_name(name: &str) -> &str {
    match name.rfind(MODULE_SEPARATOR) {
        Some(pos) => &name[pos + MODULE_SEPARATOR.len()..],
        None => name,
    }
}

/// Qualify `var` with `module`.
///
/// Already-qualified names are kept as they are, except that an explicit
/// `GLOBAL::` prefix is stripped. Names declared in the global module stay
/// unqualified.
pub fn make_full_var_name(module: &str, var: &str) -> String {
    if module.is_empty() || module == GLOBAL_MODULE || var.contains(MODULE_SEPARATOR) {
        if extract_module_name(var) == GLOBAL_MODULE {
            return extract_var_name(var).to_string();
        }
        return var.to_string();
    }
    format!("{module}{MODULE_SEPARATOR}{var}")
}
