//! The compiled extension object

use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Greeter {
    greeting: String,
}

impl Default for Greeter {
    fn default() -> Self {
        Self::new()
    }
}

impl Greeter {
    pub fn new() -> Self {
        Self {
            greeting: "Hello world!".to_string(),
        }
    }

    pub fn simple_greet(&self) -> String {
        self.greeting.clone()
    }

    pub fn complex_greet(&self, names: &[String], common_message: &str) -> BTreeMap<String, String> {
        let mut res = BTreeMap::new();
        for name in names {
            res.insert(name.clone(), super::greeting(name, common_message));
        }
        res
    }
}
