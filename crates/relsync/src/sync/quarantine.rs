use std::collections::BTreeSet;

use crate::model::ReleaseId;

/// Releases that failed to fetch or map during the current run.
///
/// Quarantined ids are skipped by reconciliation so quota is not spent on
/// releases known to be unparseable. The set is cleared at the start of
/// every full sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuarantineSet {
    ids: BTreeSet<ReleaseId>,
}

impl QuarantineSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the id was not already quarantined.
    pub fn insert(&mut self, id: ReleaseId) -> bool {
        self.ids.insert(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ReleaseId) -> bool {
        self.ids.contains(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReleaseId> {
        self.ids.iter()
    }
}

impl Extend<ReleaseId> for QuarantineSet {
    fn extend<T: IntoIterator<Item = ReleaseId>>(&mut self, iter: T) {
        self.ids.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_new_ids_only() {
        let mut set = QuarantineSet::new();
        assert!(set.insert(ReleaseId::new("R1")));
        assert!(!set.insert(ReleaseId::new("R1")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn clear_empties_the_set() {
        let mut set = QuarantineSet::new();
        set.extend([ReleaseId::new("R1"), ReleaseId::new("R2")]);
        assert!(set.contains(&ReleaseId::new("R2")));
        set.clear();
        assert!(set.is_empty());
    }
}
