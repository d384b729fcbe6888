use std::fmt;

use crate::core::Value;

/// One step into a nested value: a map key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Path from the root of a snapshot to a changed value.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiffPath(Vec<PathSegment>);

impl DiffPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn key(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(name.to_string()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DiffPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// A single typed edit in a structural diff.
///
/// A closed set of variants, so converters can pattern-match instead of
/// introspecting arbitrary nested structures at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A map field that exists only in the new snapshot.
    Added { path: DiffPath, value: Value },

    /// A map field that exists only in the old snapshot.
    Removed { path: DiffPath },

    /// A value that differs between the snapshots. For lists whose length
    /// changed this carries the entire new list.
    Changed {
        path: DiffPath,
        old: Value,
        new: Value,
    },

    /// An in-place element modification at a fixed index of a list whose
    /// length is unchanged.
    ListElementChanged {
        path: DiffPath,
        index: usize,
        old: Value,
        new: Value,
    },
}

impl Change {
    pub fn path(&self) -> &DiffPath {
        match self {
            Change::Added { path, .. } => path,
            Change::Removed { path } => path,
            Change::Changed { path, .. } => path,
            Change::ListElementChanged { path, .. } => path,
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, Change::Removed { .. })
    }
}
