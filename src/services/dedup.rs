use std::collections::HashSet;

/// Names of the events already present in a destination calendar.
///
/// Built once per synchronization run and only ever grows during it, so a
/// name created earlier in the run is never created again.
#[derive(Debug, Default, Clone)]
pub struct DuplicateIndex {
    names: HashSet<String>,
}

impl DuplicateIndex {
    pub fn build<'a, I>(existing_names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            names: existing_names.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
