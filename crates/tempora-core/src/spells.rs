//! # Spell Store
//!
//! The existence intervals of one entity, kept as a minimal set of
//! non-overlapping spells.
//!
//! Adding a spell extends the first spell it overlaps, then coalesces the
//! store until no two spells overlap. The store is small in practice (a few
//! spells per entity), so coalescing is a simple pairwise fixed point that
//! keeps insertion order.

use crate::TemporaError;
use crate::time::Interval;
use serde::{Deserialize, Serialize};

/// Non-overlapping spells in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpellStore {
    spells: Vec<Interval>,
}

impl SpellStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spell.
    ///
    /// Fails only when spells from different time domains meet; every union
    /// is atomic, so the store stays consistent on error.
    pub fn add(&mut self, spell: Interval) -> Result<(), TemporaError> {
        let mut target = None;
        for (index, existing) in self.spells.iter().enumerate() {
            if existing.overlaps(&spell)? {
                target = Some(index);
                break;
            }
        }

        match target.and_then(|index| self.spells.get_mut(index)) {
            Some(existing) => {
                existing.union(&spell)?;
                self.coalesce()
            }
            None => {
                self.spells.push(spell);
                Ok(())
            }
        }
    }

    /// Merge overlapping pairs until none remain. The later spell of a pair
    /// is folded into the earlier one.
    fn coalesce(&mut self) -> Result<(), TemporaError> {
        while let Some((keep, fold)) = self.first_overlapping_pair()? {
            let later = self.spells.remove(fold);
            if let Some(earlier) = self.spells.get_mut(keep) {
                earlier.union(&later)?;
            }
        }
        Ok(())
    }

    fn first_overlapping_pair(&self) -> Result<Option<(usize, usize)>, TemporaError> {
        for (i, a) in self.spells.iter().enumerate() {
            for (j, b) in self.spells.iter().enumerate().skip(i + 1) {
                if a.overlaps(b)? {
                    return Ok(Some((i, j)));
                }
            }
        }
        Ok(None)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.spells.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.spells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeDomain;

    fn store(spells: &[(f64, f64)]) -> SpellStore {
        let mut store = SpellStore::new();
        for &(s, e) in spells {
            store.add(Interval::real(s, e)).expect("add");
        }
        store
    }

    #[test]
    fn disjoint_spells_are_appended() {
        let s = store(&[(1.0, 5.0), (10.0, 15.0)]);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn bridging_spell_coalesces_everything() {
        let s = store(&[(1.0, 5.0), (10.0, 15.0), (4.0, 11.0)]);
        let spells: Vec<_> = s.iter().cloned().collect();
        assert_eq!(spells, vec![Interval::real(1.0, 15.0)]);
    }

    #[test]
    fn coalescing_keeps_order_of_survivors() {
        let s = store(&[(20.0, 25.0), (1.0, 5.0), (10.0, 15.0), (4.0, 11.0)]);
        let spells: Vec<_> = s.iter().cloned().collect();
        assert_eq!(spells, vec![Interval::real(20.0, 25.0), Interval::real(1.0, 15.0)]);
    }

    #[test]
    fn contained_spell_changes_nothing() {
        let s = store(&[(1.0, 10.0), (2.0, 3.0)]);
        let spells: Vec<_> = s.iter().cloned().collect();
        assert_eq!(spells, vec![Interval::real(1.0, 10.0)]);
    }

    #[test]
    fn mixed_domains_are_rejected() {
        let mut s = store(&[(1.0, 5.0)]);
        let cal = Interval::parse(TimeDomain::Calendar, Some("2020-01-01"), Some("2020-02-01"))
            .expect("interval");
        assert!(s.add(cal).is_err());
        assert_eq!(s.len(), 1);
    }
}
