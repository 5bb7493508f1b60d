//! Host-method registry: named single-string-argument steps the task author
//! exposes to the model.
//!
//! Names are registered explicitly by the run configuration; there is no
//! reflective lookup, and unregistered names come back as a typed error.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

type HostFn = Box<dyn Fn(&str) -> Result<Option<String>, String> + Send + Sync>;

/// Failures while invoking a host method. Callers report these as failed
/// results; they never crash the loop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostMethodError {
    #[error("unknown host method '{0}'")]
    Unknown(String),
    #[error("host method '{name}' failed: {detail}")]
    Failed { name: String, detail: String },
}

/// Registry of callable host methods, keyed by name.
#[derive(Default)]
pub struct HostMethods {
    methods: HashMap<String, HostFn>,
}

impl HostMethods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable under a name. Later registrations replace
    /// earlier ones.
    pub fn register<F>(&mut self, name: impl Into<String>, method: F)
    where
        F: Fn(&str) -> Result<Option<String>, String> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Box::new(method));
    }

    /// Invoke a registered method with its single string parameter.
    pub fn invoke(&self, name: &str, parameter: &str) -> Result<Option<String>, HostMethodError> {
        let method = self
            .methods
            .get(name)
            .ok_or_else(|| HostMethodError::Unknown(name.to_string()))?;
        method(parameter).map_err(|detail| HostMethodError::Failed {
            name: name.to_string(),
            detail,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for HostMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostMethods")
            .field("methods", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invokes_registered_methods() {
        let mut methods = HostMethods::new();
        methods.register("shout", |arg| Ok(Some(arg.to_uppercase())));
        assert_eq!(
            methods.invoke("shout", "hello").unwrap(),
            Some("HELLO".to_string())
        );
    }

    #[test]
    fn unknown_names_are_typed_errors() {
        let methods = HostMethods::new();
        assert_eq!(
            methods.invoke("nope", ""),
            Err(HostMethodError::Unknown("nope".to_string()))
        );
    }

    #[test]
    fn method_failures_carry_the_detail() {
        let mut methods = HostMethods::new();
        methods.register("boom", |_| Err("it broke".to_string()));
        match methods.invoke("boom", "x") {
            Err(HostMethodError::Failed { detail, .. }) => assert_eq!(detail, "it broke"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
