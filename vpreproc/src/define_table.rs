use std::collections::HashSet;

/// Names of the macros currently defined.
///
/// Only presence is tracked; a `define`'s body is never stored.
#[derive(Clone, Debug, Default)]
pub struct DefineTable {
    names: HashSet<String>,
}

impl DefineTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a macro; defining it again is a no-op
    pub fn define<S: Into<String>>(&mut self, name: S) {
        self.names.insert(name.into());
    }

    /// Remove a macro definition if present
    pub fn undef(&mut self, name: &str) {
        self.names.remove(name);
    }

    /// Forget every definition (`` `resetall ``)
    pub fn clear(&mut self) {
        self.names.clear();
    }

    /// Check if a macro is defined
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of defined macros
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no macro is defined
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over the defined names in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
