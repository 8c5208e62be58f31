//! Sample project for buildext
//!
//! [`Greeter`] is the plain implementation, [`ExtGreeter`] forwards to the
//! compiled [`ext::Greeter`] that buildext copies into the package.

use std::collections::BTreeMap;

pub mod ext;

#[cfg(feature = "python")]
mod python;

fn greeting(name: &str, common_message: &str) -> String {
    format!("Hello, {}! {}", name, common_message)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Greeter;

impl Greeter {
    pub fn new() -> Self {
        Self
    }

    pub fn simple_greet(&self) -> String {
        "Hello world!".to_string()
    }

    /// Greet every name with the same trailing message; later duplicates win
    pub fn complex_greet<S: AsRef<str>>(
        &self,
        names: &[S],
        common_message: &str,
    ) -> BTreeMap<String, String> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                (name.to_string(), greeting(name, common_message))
            })
            .collect()
    }
}

/// Greeter backed by the compiled extension object
#[derive(Debug, Default, Clone)]
pub struct ExtGreeter {
    inner: ext::Greeter,
}

impl ExtGreeter {
    pub fn new() -> Self {
        Self {
            inner: ext::Greeter::new(),
        }
    }

    pub fn simple_greet(&self) -> String {
        self.inner.simple_greet()
    }

    pub fn complex_greet<S: AsRef<str>>(
        &self,
        names: &[S],
        common_message: &str,
    ) -> BTreeMap<String, String> {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        self.inner.complex_greet(&names, common_message)
    }
}
