//! Executor script rendering.
//!
//! The executor template is a fixed resource with two literal placeholder
//! tokens: one for the function definition and one for the invocation. The
//! rendered script defines the function and calls it with the in-container
//! output path as its sole argument.
//!
//! Substitution is literal text replacement. A body that itself contains a
//! placeholder token would make the result undefined, so rendering rejects
//! it up front instead of emitting a corrupt script.

use crate::error::{Error, Result};
use crate::runner::GUEST_OUTPUT_FILE;
use crate::source::FunctionSpec;

const EXECUTOR_TEMPLATE: &str = include_str!("../resources/executor.py.tpl");

const DEFINITION_TOKEN: &str = "__function_definition__";
const INVOCATION_TOKEN: &str = "__function_call__";

/// Produce the ready-to-run executor script for a packaged function.
pub fn render(function: &FunctionSpec) -> Result<String> {
    for token in [DEFINITION_TOKEN, INVOCATION_TOKEN] {
        if function.source_body().contains(token) {
            return Err(Error::PlaceholderCollision { token });
        }
    }

    let invocation = format!("{}('{}')", function.name(), GUEST_OUTPUT_FILE);
    Ok(EXECUTOR_TEMPLATE
        .replace(DEFINITION_TOKEN, function.source_body())
        .replace(INVOCATION_TOKEN, &invocation))
}
