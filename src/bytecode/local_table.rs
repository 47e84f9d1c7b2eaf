use std::collections::HashMap;

/// Local variable slots of one scope.
///
/// Method, class and program bodies start a table at depth 0. A block's
/// table is one level deeper and owns the enclosing table as `upper` until
/// the block is finished.
#[derive(Debug, Default)]
pub struct LocalTable {
    store: HashMap<String, usize>,
    depth: usize,
    upper: Option<Box<LocalTable>>,
}

impl LocalTable {
    /// A block scope inside `upper`.
    pub fn nested(upper: LocalTable) -> Self {
        Self {
            store: HashMap::new(),
            depth: upper.depth + 1,
            upper: Some(Box::new(upper)),
        }
    }

    /// Gives back the enclosing table when a block ends.
    pub fn into_upper(self) -> Option<LocalTable> {
        self.upper.map(|upper| *upper)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn count(&self) -> usize {
        self.store.len()
    }

    /// Index of `name` in this table only.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.store.get(name).copied()
    }

    /// Binds `name` in this table, keeping an existing index.
    pub fn set(&mut self, name: &str) -> usize {
        let next = self.store.len();
        *self.store.entry(name.to_string()).or_insert(next)
    }

    /// `(depth, index)` of the nearest binding of `name`, where depth counts
    /// the scopes between this one and the one that binds it.
    pub fn lookup(&self, name: &str) -> Option<(usize, usize)> {
        let mut table = self;
        loop {
            if let Some(index) = table.get(name) {
                return Some((self.depth - table.depth, index));
            }
            table = table.upper.as_deref()?;
        }
    }

    /// Slot for a write to `name`: the visible binding if there is one,
    /// otherwise a new slot in this table.
    pub fn set_local(&mut self, name: &str) -> (usize, usize) {
        match self.lookup(name) {
            Some(found) => found,
            None => (0, self.set(name)),
        }
    }
}
