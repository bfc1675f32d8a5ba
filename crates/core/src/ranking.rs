//! Canonical queue ordering and dense position assignment.
//!
//! The canonical order is triage category (most urgent first), then arrival time. Sorting is
//! stable, so patients tied on both keep their relative snapshot order.

use crate::constants::TRIAGE_CATEGORY_COUNT;
use crate::patient::{Patient, QueuePosition};

/// Sorts `patients` into canonical queue order.
pub fn canonical_sort(patients: &mut [Patient]) {
    patients.sort_by_key(|p| (p.triage_category, p.arrival_time));
}

/// Hands out dense global and per-category positions, starting at 1.
///
/// A fresh counter is created once per pass, before any position is assigned.
#[derive(Clone, Debug)]
pub struct PositionCounter {
    next_global: u32,
    next_category: [u32; TRIAGE_CATEGORY_COUNT],
}

impl Default for PositionCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionCounter {
    pub fn new() -> Self {
        Self {
            next_global: 1,
            next_category: [1; TRIAGE_CATEGORY_COUNT],
        }
    }

    /// Writes the next positions into `patient` and returns them.
    pub fn assign(&mut self, patient: &mut Patient) -> QueuePosition {
        let slot = &mut self.next_category[patient.triage_category.index()];
        let position = QueuePosition {
            global: self.next_global,
            category: *slot,
        };
        self.next_global += 1;
        *slot += 1;
        patient.queue_position = position;
        position
    }

    /// Number of positions handed out so far.
    pub fn assigned(&self) -> usize {
        (self.next_global - 1) as usize
    }
}

/// Sorts `patients` canonically and renumbers them densely from 1.
///
/// Returns the counter so callers can append further patients after the ranked ones.
pub fn rank_in_place(patients: &mut [Patient]) -> PositionCounter {
    canonical_sort(patients);
    let mut counter = PositionCounter::new();
    for patient in patients.iter_mut() {
        counter.assign(patient);
    }
    counter
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::patient::TriageCategory;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    pub(crate) fn patient(category: u8, minute: u32) -> Patient {
        Patient::new(
            TriageCategory::new(category).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 1, 9, minute, 0).unwrap(),
        )
    }

    /// Asserts global positions are exactly 1..=N and category positions exactly 1..=M_k.
    pub(crate) fn assert_dense(patients: &[Patient]) {
        let mut globals: Vec<u32> = patients.iter().map(|p| p.queue_position.global).collect();
        globals.sort_unstable();
        let expected: Vec<u32> = (1..=patients.len() as u32).collect();
        assert_eq!(globals, expected, "global positions must be dense from 1");

        let mut per_category: BTreeMap<TriageCategory, Vec<u32>> = BTreeMap::new();
        for p in patients {
            per_category
                .entry(p.triage_category)
                .or_default()
                .push(p.queue_position.category);
        }
        for (category, mut positions) in per_category {
            positions.sort_unstable();
            let expected: Vec<u32> = (1..=positions.len() as u32).collect();
            assert_eq!(
                positions, expected,
                "category {category} positions must be dense from 1"
            );
        }
    }

    #[test]
    fn test_canonical_sort_orders_by_category_then_arrival() {
        let mut patients = vec![patient(3, 0), patient(1, 30), patient(1, 10), patient(2, 5)];
        canonical_sort(&mut patients);

        let keys: Vec<(u8, DateTime<Utc>)> = patients
            .iter()
            .map(|p| (p.triage_category.get(), p.arrival_time))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(patients[0].triage_category.get(), 1);
        assert_eq!(patients[3].triage_category.get(), 3);
    }

    #[test]
    fn test_canonical_sort_is_stable_for_ties() {
        let first = patient(2, 15);
        let second = patient(2, 15);
        let third = patient(2, 15);
        let ids = [first.id, second.id, third.id];

        let mut patients = vec![patient(4, 0), first, second, patient(1, 50), third];
        canonical_sort(&mut patients);

        let tied: Vec<_> = patients
            .iter()
            .filter(|p| p.triage_category.get() == 2)
            .map(|p| p.id)
            .collect();
        assert_eq!(tied, ids, "ties keep their snapshot order");
    }

    #[test]
    fn test_rank_in_place_assigns_dense_positions() {
        let mut patients = vec![
            patient(5, 1),
            patient(3, 2),
            patient(3, 3),
            patient(1, 4),
            patient(5, 5),
            patient(2, 6),
        ];
        let counter = rank_in_place(&mut patients);

        assert_eq!(counter.assigned(), 6);
        assert_dense(&patients);
        assert_eq!(patients[0].queue_position, QueuePosition { global: 1, category: 1 });
        let last_five = patients.last().unwrap();
        assert_eq!(last_five.triage_category.get(), 5);
        assert_eq!(last_five.queue_position, QueuePosition { global: 6, category: 2 });
    }

    #[test]
    fn test_counter_continues_after_ranking() {
        let mut patients = vec![patient(3, 0), patient(3, 1)];
        let mut counter = rank_in_place(&mut patients);

        let mut late = patient(3, 59);
        let position = counter.assign(&mut late);
        assert_eq!(position, QueuePosition { global: 3, category: 3 });

        let mut urgent = patient(1, 59);
        let position = counter.assign(&mut urgent);
        assert_eq!(position, QueuePosition { global: 4, category: 1 });
    }
}
