use sqlplay_types::Value;
use std::collections::BTreeMap;

/// Bindings exported by the files that already ran.
///
/// A file sees every export of the files before it in run order; a later
/// export of the same name replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    exports: BTreeMap<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.exports.get(name)
    }

    pub fn exports(&self) -> &BTreeMap<String, Value> {
        &self.exports
    }

    pub fn merge(&mut self, exports: BTreeMap<String, Value>) {
        self.exports.extend(exports);
    }
}
