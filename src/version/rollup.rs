//! Change sets recording when a node or its descendants were edited.

use super::VersionId;

/// Ascending set of versions at which something changed.
///
/// A node keeps one rollup for its own content and one for its descendants;
/// [`latest_at`](Self::latest_at) on both gives the node's stamp at any
/// retained version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionRollup {
    versions: Vec<VersionId>,
}

impl VersionRollup {
    #[must_use]
    pub fn new(version: VersionId) -> Self {
        Self {
            versions: vec![version],
        }
    }

    /// Most recent recorded version.
    #[must_use]
    pub fn last(&self) -> VersionId {
        self.versions[self.versions.len() - 1]
    }

    /// Record a change at `version`.
    ///
    /// Returns `false` when `version` was already the most recent entry.
    ///
    /// # Panics
    ///
    /// Panics if `version` precedes the most recent entry.
    pub fn advance(&mut self, version: VersionId) -> bool {
        let last = self.last();
        assert!(
            version >= last,
            "version {version} precedes recorded change at {last}"
        );
        if version == last {
            return false;
        }
        self.versions.push(version);
        true
    }

    /// Most recent recorded version at or before `version`.
    #[must_use]
    pub fn latest_at(&self, version: VersionId) -> Option<VersionId> {
        let upper = self.versions.partition_point(|&v| v <= version);
        upper.checked_sub(1).map(|index| self.versions[index])
    }

    #[must_use]
    pub fn contains(&self, version: VersionId) -> bool {
        self.versions.binary_search(&version).is_ok()
    }

    /// Forget versions older than `floor`, keeping the newest one at or below
    /// it so [`latest_at`](Self::latest_at) stays answerable from `floor` on.
    pub fn drop_versions(&mut self, floor: VersionId) {
        let upper = self.versions.partition_point(|&v| v <= floor);
        if upper > 1 {
            self.versions.drain(..upper - 1);
        }
    }

    /// Forget versions after `target`, always keeping the oldest entry.
    pub fn truncate_after(&mut self, target: VersionId) {
        let keep = self.versions.partition_point(|&v| v <= target).max(1);
        self.versions.truncate(keep);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
