use std::sync::atomic::{AtomicU64, Ordering};

use super::outcome::Placement;
use crate::{SCORE_EPSILON, units::Length};

/// Where a record was found: the subtree it came from, then the order within that subtree.
/// Sorting by it reproduces the sequential expansion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordOrder {
    pub task: usize,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub placement: Placement,
    pub order: RecordOrder,
}

impl Record {
    fn score(&self) -> Length {
        self.placement.noncoverage
    }
}

/// Best placement found so far plus every placement within `tolerance` of it.
#[derive(Debug, Clone)]
pub struct RecordSchedule {
    ceiling: Length,
    tolerance: Option<Length>,
    limit: usize,
    task: usize,
    seq: u64,
    best: Option<Record>,
    alternatives: Vec<Record>,
}

impl RecordSchedule {
    /// `ceiling` is the worst score accepted while there is no record.
    /// With a `tolerance`, placements scoring within it of the record are kept as alternatives, at most `limit` of them.
    pub fn new(ceiling: Option<Length>, tolerance: Option<Length>, limit: usize) -> Self {
        Self {
            ceiling: ceiling.unwrap_or(Length::from_metres(f64::INFINITY)),
            tolerance,
            limit,
            task: 0,
            seq: 0,
            best: None,
            alternatives: Vec::new(),
        }
    }

    /// Empty schedule with the same settings, for records found in subtree `task`.
    pub fn for_task(&self, task: usize) -> Self {
        Self {
            task,
            seq: 0,
            best: None,
            alternatives: Vec::new(),
            ..self.clone()
        }
    }

    pub fn best(&self) -> Option<&Record> {
        self.best.as_ref()
    }

    pub fn best_score(&self) -> Option<Length> {
        self.best.as_ref().map(Record::score)
    }

    /// Worst score that could still be recorded.
    pub fn cutoff(&self) -> Length {
        match self.best_score() {
            Some(best) => best + self.tolerance.unwrap_or(Length::ZERO),
            None => self.ceiling,
        }
    }

    /// [`cutoff`](Self::cutoff) tightened by a record held elsewhere.
    pub fn cutoff_with(&self, shared: Option<Length>) -> Length {
        match shared {
            Some(shared) => self.cutoff().min(shared + self.tolerance.unwrap_or(Length::ZERO)),
            None => self.cutoff(),
        }
    }

    /// Offers a feasible placement found in expansion order. Returns `true` if it became the record.
    pub fn offer(&mut self, placement: Placement) -> bool {
        self.seq += 1;
        let order = RecordOrder {
            task: self.task,
            seq: self.seq,
        };
        self.offer_record(Record { placement, order })
    }

    fn offer_record(&mut self, record: Record) -> bool {
        let score = record.score().metres();

        let improves = match self.best_score() {
            Some(best) => score < best.metres() - SCORE_EPSILON,
            None => score <= self.ceiling.metres() + SCORE_EPSILON,
        };

        if improves {
            if let Some(previous) = self.best.replace(record) {
                self.push_alternative(previous);
            }
            self.trim_alternatives();
            return true;
        }

        if self.best.is_some() && score <= self.cutoff().metres() + SCORE_EPSILON {
            self.push_alternative(record);
        }

        false
    }

    fn push_alternative(&mut self, record: Record) {
        if self.tolerance.is_none() || self.limit == 0 {
            return;
        }

        let key = |r: &Record| (r.score().metres(), r.order);
        let at = self
            .alternatives
            .partition_point(|r| key(r).partial_cmp(&key(&record)).is_some_and(|o| o.is_lt()));
        self.alternatives.insert(at, record);
        self.alternatives.truncate(self.limit);
    }

    fn trim_alternatives(&mut self) {
        let cutoff = self.cutoff().metres() + SCORE_EPSILON;
        self.alternatives.retain(|r| r.score().metres() <= cutoff);
    }

    /// Combines schedules of disjoint subtrees as if they had been searched one after another.
    pub fn merge(template: &RecordSchedule, parts: Vec<RecordSchedule>) -> RecordSchedule {
        let mut records: Vec<Record> = parts
            .into_iter()
            .flat_map(|part| part.best.into_iter().chain(part.alternatives))
            .collect();
        records.sort_by_key(|r| r.order);

        let mut merged = template.for_task(0);
        for record in records {
            merged.offer_record(record);
        }
        merged
    }

    pub fn into_parts(self) -> (Option<Placement>, Vec<Placement>) {
        (
            self.best.map(|r| r.placement),
            self.alternatives.into_iter().map(|r| r.placement).collect(),
        )
    }
}

/// Record score visible to every worker, only ever lowered.
#[derive(Debug)]
pub struct SharedBound {
    bits: AtomicU64,
}

impl Default for SharedBound {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedBound {
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(f64::INFINITY.to_bits()),
        }
    }

    pub fn get(&self) -> Option<Length> {
        let value = f64::from_bits(self.bits.load(Ordering::Acquire));
        value.is_finite().then_some(Length::from_metres(value))
    }

    /// Lowers the bound to `score` if that is an improvement. Returns `true` if it was.
    pub fn tighten(&self, score: Length) -> bool {
        let candidate = score.metres();
        self.bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (candidate < f64::from_bits(current)).then_some(candidate.to_bits())
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{search::Assignment, units::Time};

    fn placement(id: usize, score: f64) -> Placement {
        Placement {
            assignment: Assignment::new(vec![Some(id)]),
            noncoverage: Length::from_metres(score),
            noncoverage_ratio: 0.0,
            cost: 0,
            delay: Time::ZERO,
        }
    }

    fn first_station(r: Option<&Record>) -> Option<usize> {
        r.and_then(|r| r.placement.assignment.slots()[0])
    }

    #[test]
    fn first_of_equal_scores_wins() {
        let mut s = RecordSchedule::new(None, None, 10);
        assert!(s.offer(placement(0, 5.0)));
        assert!(!s.offer(placement(1, 5.0)));
        assert!(s.offer(placement(2, 4.0)));
        assert_eq!(first_station(s.best()), Some(2));
        assert!(s.alternatives.is_empty());
    }

    #[test]
    fn ceiling_gates_first_record() {
        let mut s = RecordSchedule::new(Some(Length::from_metres(3.0)), None, 10);
        assert!(!s.offer(placement(0, 5.0)));
        assert!(s.best().is_none());
        assert_eq!(s.cutoff(), Length::from_metres(3.0));
        assert!(s.offer(placement(1, 3.0)));
    }

    #[test]
    fn alternatives_follow_record() {
        let mut s = RecordSchedule::new(None, Some(Length::from_metres(2.0)), 10);
        s.offer(placement(0, 10.0));
        s.offer(placement(1, 11.0));
        s.offer(placement(2, 13.0));
        assert_eq!(s.alternatives.len(), 1);

        s.offer(placement(3, 9.5));
        let (best, alternatives) = s.into_parts();
        assert_eq!(best.unwrap().assignment.slots()[0], Some(3));
        let ids: Vec<_> = alternatives.iter().map(|p| p.assignment.slots()[0]).collect();
        assert_eq!(ids, vec![Some(0), Some(1)]);
    }

    #[test]
    fn alternatives_capped() {
        let mut s = RecordSchedule::new(None, Some(Length::from_metres(10.0)), 2);
        for (i, score) in [1.0, 4.0, 3.0, 2.0, 2.0].into_iter().enumerate() {
            s.offer(placement(i, score));
        }
        let (_, alternatives) = s.into_parts();
        let ids: Vec<_> = alternatives.iter().map(|p| p.assignment.slots()[0]).collect();
        assert_eq!(ids, vec![Some(3), Some(4)]);
    }

    #[test]
    fn merge_keeps_task_order() {
        let template = RecordSchedule::new(None, None, 10);
        let mut a = template.for_task(0);
        let mut b = template.for_task(1);
        b.offer(placement(1, 2.0));
        a.offer(placement(0, 2.0));

        let merged = RecordSchedule::merge(&template, vec![b, a]);
        assert_eq!(first_station(merged.best()), Some(0));
    }

    #[test]
    fn shared_bound_only_lowers() {
        let bound = SharedBound::new();
        assert_eq!(bound.get(), None);
        assert!(bound.tighten(Length::from_metres(5.0)));
        assert!(!bound.tighten(Length::from_metres(6.0)));
        assert!(bound.tighten(Length::from_metres(1.0)));
        assert_eq!(bound.get(), Some(Length::from_metres(1.0)));
    }
}
