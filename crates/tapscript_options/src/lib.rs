//! tapscript_options: Configuration of the binding layer.
//!
//! Options are read from JSON (camelCase keys). Every field has a default,
//! so an empty object is a valid configuration.

use serde::{Deserialize, Serialize};

/// Settings for identifier binding and the global symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BindingOptions {
    /// Deliver change notifications when a binding is mutated.
    pub notify_modifications: bool,
    /// How option-change handler failures are treated.
    pub handler_failures: HandlerFailurePolicy,
    /// Install the well-known bootstrap types during global table init.
    pub preload_well_known: bool,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            notify_modifications: true,
            handler_failures: HandlerFailurePolicy::ContinueAll,
            preload_well_known: true,
        }
    }
}

/// What happens to the remaining option handlers after one fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandlerFailurePolicy {
    /// Run every handler; report the first failure.
    #[default]
    ContinueAll,
    /// Stop dispatching at the first failure and report it.
    StopAtFirst,
}

/// Parse binding options from a JSON string.
pub fn parse_options(content: &str) -> Result<BindingOptions, serde_json::Error> {
    serde_json::from_str(content)
}

/// Parse binding options from a JSON file.
pub fn parse_options_file(path: &str) -> Result<BindingOptions, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let options = parse_options(&content)?;
    Ok(options)
}
