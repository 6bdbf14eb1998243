//! Run-length history of a single field.

use super::VersionId;
use crate::error::{Error, Result};

#[derive(Clone, Debug)]
struct Entry<T> {
    version: VersionId,
    value: T,
}

/// A field whose value can be read at any retained version.
///
/// Entries are kept in ascending version order and adjacent entries never
/// hold equal values, so the history grows only when the value actually
/// changes. Writes always land at [`current`](Self::current), which only moves
/// forward through [`advance_version`](Self::advance_version).
#[derive(Clone, Debug)]
pub struct VersionedCell<T> {
    entries: Vec<Entry<T>>,
    current: VersionId,
}

impl<T: Clone + PartialEq> VersionedCell<T> {
    /// Create a cell holding `value` from [`VersionId::INITIAL`] on.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::at(value, VersionId::INITIAL)
    }

    /// Create a cell holding `value` from `version` on.
    #[must_use]
    pub fn at(value: T, version: VersionId) -> Self {
        Self {
            entries: vec![Entry { version, value }],
            current: version,
        }
    }

    fn index_at(&self, version: VersionId) -> Option<usize> {
        let upper = self.entries.partition_point(|entry| entry.version <= version);
        upper.checked_sub(1)
    }

    fn tail(&self) -> &Entry<T> {
        // Entries are never empty: every constructor pushes one and no
        // operation removes the first.
        &self.entries[self.entries.len() - 1]
    }

    /// Value in effect at `version`.
    ///
    /// # Panics
    ///
    /// Panics when `version` is older than the oldest retained entry.
    #[must_use]
    pub fn get(&self, version: VersionId) -> &T {
        match self.index_at(version) {
            Some(index) => &self.entries[index].value,
            None => panic!(
                "version {version} is below the retained floor {}",
                self.floor()
            ),
        }
    }

    /// Checked form of [`get`](Self::get).
    pub fn try_get(&self, version: VersionId) -> Result<&T> {
        self.index_at(version)
            .map(|index| &self.entries[index].value)
            .ok_or(Error::VersionBelowFloor {
                requested: version,
                floor: self.floor(),
            })
    }

    /// Latest value.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.tail().value
    }

    /// Version writes currently land at.
    #[must_use]
    pub const fn current(&self) -> VersionId {
        self.current
    }

    /// Oldest version that can be queried.
    #[must_use]
    pub fn floor(&self) -> VersionId {
        self.entries[0].version
    }

    /// Number of retained history entries.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.entries.len()
    }

    /// Version at which the value effective at `version` was written.
    #[must_use]
    pub fn changed_at(&self, version: VersionId) -> Option<VersionId> {
        self.index_at(version).map(|index| self.entries[index].version)
    }

    /// Record `value` at the current version.
    pub fn set(&mut self, value: T) {
        let tail_version = self.tail().version;
        if self.current > tail_version {
            if self.tail().value != value {
                self.entries.push(Entry {
                    version: self.current,
                    value,
                });
            }
            return;
        }

        let len = self.entries.len();
        if len >= 2 && self.entries[len - 2].value == value {
            self.entries.pop();
        } else {
            self.entries[len - 1].value = value;
        }
    }

    /// Read-modify-write at the current version.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        let mut value = self.value().clone();
        f(&mut value);
        self.set(value);
    }

    /// Move the write position forward without changing the value.
    ///
    /// # Panics
    ///
    /// Panics if `version` is older than the current version.
    pub fn advance_version(&mut self, version: VersionId) {
        assert!(
            version >= self.current,
            "cannot move cell back from {} to {version}",
            self.current
        );
        self.current = version;
    }

    /// Whether the effective value differs between two versions.
    #[must_use]
    pub fn is_changed(&self, from: VersionId, to: VersionId) -> bool {
        self.index_at(from) != self.index_at(to)
    }

    /// Discard history older than `floor`, keeping the entry effective at
    /// `floor` and rebasing it onto `floor`.
    pub fn drop_versions(&mut self, floor: VersionId) {
        if let Some(index) = self.index_at(floor) {
            self.entries.drain(..index);
            if self.entries[0].version < floor {
                self.entries[0].version = floor;
            }
        }
        if self.current < floor {
            self.current = floor;
        }
    }

    /// Discard every entry written after `target`.
    ///
    /// Returns `true` when history was removed.
    ///
    /// # Panics
    ///
    /// Panics if `target` is older than the retained floor.
    pub fn truncate_after(&mut self, target: VersionId) -> bool {
        let keep = self.entries.partition_point(|entry| entry.version <= target);
        assert!(
            keep > 0,
            "cannot roll back to {target}, history starts at {}",
            self.floor()
        );
        let removed = keep < self.entries.len();
        self.entries.truncate(keep);
        self.current = self.current.min(target);
        removed
    }

    /// Iterate over retained `(version, value)` pairs, oldest first.
    pub fn history(&self) -> impl Iterator<Item = (VersionId, &T)> {
        self.entries.iter().map(|entry| (entry.version, &entry.value))
    }

    /// Mutable access to the latest value without recording history.
    ///
    /// Used to swap a shared child for its private copy, which is the same
    /// logical node and must not look like a content change.
    pub(crate) fn last_mut(&mut self) -> &mut T {
        let len = self.entries.len();
        &mut self.entries[len - 1].value
    }

    /// Mutable access to every retained value, for slot patching across the
    /// whole history.
    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut().map(|entry| &mut entry.value)
    }

    /// Collapse the history into a single entry holding the value at
    /// `version`, rebased onto [`VersionId::INITIAL`].
    #[must_use]
    pub fn rebased(&self, version: VersionId) -> Self {
        Self::new(self.get(version).clone())
    }
}
