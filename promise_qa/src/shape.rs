//! # Shape Detection
//!
//! Decides whether a test function manages its own completion (it declares a
//! completion-callback parameter) or returns a promise-like value.
//!
//! Typed Rust functions carry their shape in the API they are registered
//! through (`it` vs `it_with_done`), so nothing is parsed for them. Functions
//! that only come with a textual signature, for example ones described by a
//! scripting front-end, go through [`declares_completion_param`]: comments are
//! stripped, the parameter list is split on commas, and each name is compared
//! against the configured completion-parameter names.

use regex::Regex;
use std::sync::OnceLock;

/// Default name of the completion-callback parameter.
pub const DEFAULT_COMPLETION_PARAM: &str = "done";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Receives the completion callback and signals completion itself.
    Callback,
    /// Returns a promise-like value (or nothing).
    Promise,
}

impl Shape {
    pub fn from_signature<S: AsRef<str>>(signature: &str, names: &[S]) -> Self {
        if declares_completion_param(signature, names) {
            Shape::Callback
        } else {
            Shape::Promise
        }
    }
}

fn comments() -> &'static Regex {
    static COMMENTS: OnceLock<Regex> = OnceLock::new();
    COMMENTS.get_or_init(|| {
        Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").expect("comment-stripping regex must compile")
    })
}

fn parameter_lists() -> &'static [Regex] {
    static LISTS: OnceLock<Vec<Regex>> = OnceLock::new();
    LISTS.get_or_init(|| {
        vec![
            // Closure form: `move |done| ...`
            Regex::new(r"^\s*(?:move\s+)?\|([^|]*)\|")
                .expect("closure parameter regex must compile"),
            // Bare single-parameter arrow: `done => ...`
            Regex::new(r"^\s*(?:async\s+)?([A-Za-z_$][\w$]*)\s*=>")
                .expect("arrow parameter regex must compile"),
            // Parenthesised form: `function name (a, b)`, `fn name(a: T)`, `(a) => ...`
            Regex::new(r"^[^(]*\(([^)]*)\)").expect("parameter list regex must compile"),
        ]
    })
}

/// Strips `/* ... */` and `// ...` comments from a signature.
pub fn strip_comments(signature: &str) -> String {
    comments().replace_all(signature, "").into_owned()
}

/// Extracts the declared parameter names of a signature, comments removed.
///
/// Returns `None` when no parameter list can be found.
pub fn parameter_names(signature: &str) -> Option<Vec<String>> {
    let stripped = strip_comments(signature);
    let list = parameter_lists()
        .iter()
        .find_map(|re| re.captures(&stripped))
        .and_then(|caps| caps.get(1))?
        .as_str();

    Some(
        list.split(',')
            .map(parameter_name)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

// `mut done: Done = x` -> `done`
fn parameter_name(raw: &str) -> &str {
    let name = raw.split([':', '=']).next().unwrap_or_default().trim();
    name.strip_prefix("mut ").map(str::trim).unwrap_or(name)
}

/// Reports whether `signature` declares a parameter named like one of `names`.
///
/// Unparseable signatures report `false`.
pub fn declares_completion_param<S: AsRef<str>>(signature: &str, names: &[S]) -> bool {
    let Some(params) = parameter_names(signature) else {
        tracing::trace!("No parameter list found in signature: {signature}");
        return false;
    };
    params
        .iter()
        .any(|param| names.iter().any(|name| name.as_ref() == param))
}
