//! # Attribute Value Store
//!
//! Per-entity storage of timestamped attribute values, and the aggregation
//! policies that decide what happens when a new value collides with stored
//! ones.
//!
//! The store scans the stored values of the same attribute in insertion
//! order. The first stored value that triggers an action wins and the scan
//! stops; if nothing triggers, the new value is appended.
//!
//! | Policy   | Triggered by                       | Action                              |
//! |----------|------------------------------------|-------------------------------------|
//! | STANDARD | identical start                    | reject as duplicate                 |
//! | ADD      | overlapping interval               | sum / concatenate, union interval   |
//! | TOTAL    | any stored value                   | sum / concatenate, union interval   |
//! | MERGE    | overlapping interval               | fill sentinel, extend, or append    |
//!
//! Decoded documents and direct upserts go through the same [`AttributeValues::add`],
//! which is what makes a decode equivalent to replaying the upserts.

use crate::TemporaError;
use crate::primitives::{UNKNOWN_SENTINEL, VALUE_SEPARATOR};
use crate::schema::AttributeDef;
use crate::time::{Interval, format_real};
use crate::types::{AggregationPolicy, AttributeType};
use serde::{Deserialize, Serialize};

// =============================================================================
// ATTRIBUTE VALUE
// =============================================================================

/// One timestamped observation of an attribute.
///
/// The value is kept as the raw string it arrived as; it is only parsed when
/// a policy needs to sum it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub attribute_id: String,
    pub value: String,
    pub interval: Interval,
}

impl AttributeValue {
    #[must_use]
    pub fn new(attribute_id: impl Into<String>, value: impl Into<String>, interval: Interval) -> Self {
        Self {
            attribute_id: attribute_id.into(),
            value: value.into(),
            interval,
        }
    }

    /// True when the value is the "unknown" marker.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.value == UNKNOWN_SENTINEL
    }
}

/// What [`AttributeValues::add`] did with the incoming value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Appended as a new entry.
    Inserted,
    /// Summed or concatenated into an existing entry (ADD, TOTAL).
    Combined,
    /// Equal value; the existing entry's interval was widened (MERGE).
    Extended,
    /// The existing entry was a sentinel and took the new value (MERGE).
    Filled,
    /// Different value at an overlapping time; concatenated with a warning (MERGE).
    Conflicted,
    /// Same start as an existing entry; rejected (STANDARD).
    Duplicate,
    /// Incoming sentinel ignored because the attribute already has a value (MERGE).
    Discarded,
    /// A number or interval could not be compared; the store is unchanged.
    Skipped,
}

// =============================================================================
// STORE
// =============================================================================

/// The attribute values of one entity, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeValues {
    values: Vec<AttributeValue>,
}

impl AttributeValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, applying the policy of `def`.
    ///
    /// `def` is the schema entry resolved for `incoming.attribute_id`; a value
    /// with no resolvable entry is treated as a STANDARD string attribute.
    ///
    /// Only the first matching value absorbs `incoming`. Under ADD and MERGE a
    /// value that bridges two stored values widens the first one and leaves
    /// the second untouched, so stored values may overlap afterwards. They
    /// are not coalesced; decoding such a store folds them into one value.
    pub fn add(&mut self, incoming: AttributeValue, def: Option<&AttributeDef>) -> MergeOutcome {
        let policy = def.map_or(AggregationPolicy::Standard, |d| d.policy);
        let kind = def.map_or(AttributeType::String, |d| d.kind);

        for existing in self
            .values
            .iter_mut()
            .filter(|v| v.attribute_id == incoming.attribute_id)
        {
            match policy {
                AggregationPolicy::Total => return combine(existing, &incoming, kind),
                AggregationPolicy::Add => match incoming.interval.overlaps(&existing.interval) {
                    Ok(true) => return combine(existing, &incoming, kind),
                    Ok(false) => {}
                    Err(e) => return skip(&incoming, &e),
                },
                AggregationPolicy::Merge => {
                    if let Some(outcome) = merge(existing, &incoming) {
                        return outcome;
                    }
                }
                AggregationPolicy::Standard => {
                    if incoming.interval.same_start(&existing.interval) {
                        tracing::debug!(
                            attribute = %incoming.attribute_id,
                            value = %incoming.value,
                            "duplicate start time, value not added"
                        );
                        return MergeOutcome::Duplicate;
                    }
                }
            }
        }

        self.values.push(incoming);
        MergeOutcome::Inserted
    }

    /// First stored value for an attribute.
    #[must_use]
    pub fn get(&self, attribute_id: &str) -> Option<&AttributeValue> {
        self.values.iter().find(|v| v.attribute_id == attribute_id)
    }

    /// All stored values for an attribute, in insertion order.
    pub fn values_for<'a>(&'a self, attribute_id: &'a str) -> impl Iterator<Item = &'a AttributeValue> {
        self.values.iter().filter(move |v| v.attribute_id == attribute_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeValue> {
        self.values.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl IntoIterator for AttributeValues {
    type Item = AttributeValue;
    type IntoIter = std::vec::IntoIter<AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

// =============================================================================
// POLICY ACTIONS
// =============================================================================

/// ADD / TOTAL: fold `incoming` into `existing`.
fn combine(existing: &mut AttributeValue, incoming: &AttributeValue, kind: AttributeType) -> MergeOutcome {
    let value = if kind.is_numeric() {
        match sum_values(&existing.value, &incoming.value, kind) {
            Ok(sum) => sum,
            Err(e) => return skip(incoming, &e),
        }
    } else {
        concat(&existing.value, &incoming.value)
    };

    let mut interval = existing.interval.clone();
    if let Err(e) = interval.union(&incoming.interval) {
        return skip(incoming, &e);
    }

    existing.value = value;
    existing.interval = interval;
    MergeOutcome::Combined
}

/// MERGE against one stored value. `None` means "not this one, keep scanning".
fn merge(existing: &mut AttributeValue, incoming: &AttributeValue) -> Option<MergeOutcome> {
    if incoming.is_sentinel() {
        return Some(MergeOutcome::Discarded);
    }

    match incoming.interval.overlaps(&existing.interval) {
        Err(e) => Some(skip(incoming, &e)),
        Ok(false) => None,
        Ok(true) if existing.is_sentinel() => {
            // Interval stays as the sentinel's.
            existing.value.clone_from(&incoming.value);
            Some(MergeOutcome::Filled)
        }
        Ok(true) if existing.value == incoming.value => {
            match existing.interval.union(&incoming.interval) {
                Ok(()) => Some(MergeOutcome::Extended),
                Err(e) => Some(skip(incoming, &e)),
            }
        }
        Ok(true) => {
            if let Err(e) = existing.interval.union(&incoming.interval) {
                return Some(skip(incoming, &e));
            }
            existing.value = concat(&existing.value, &incoming.value);
            tracing::warn!(
                attribute = %incoming.attribute_id,
                value = %incoming.value,
                "conflicting value at an overlapping time, appended instead of merged"
            );
            Some(MergeOutcome::Conflicted)
        }
    }
}

fn skip(incoming: &AttributeValue, error: &TemporaError) -> MergeOutcome {
    tracing::warn!(
        attribute = %incoming.attribute_id,
        value = %incoming.value,
        "value skipped: {}",
        error
    );
    MergeOutcome::Skipped
}

fn concat(a: &str, b: &str) -> String {
    let mut out = String::with_capacity(a.len() + VALUE_SEPARATOR.len() + b.len());
    out.push_str(a);
    out.push_str(VALUE_SEPARATOR);
    out.push_str(b);
    out
}

/// Sum two raw numeric values.
///
/// Integral types use checked `i64` arithmetic and fall back to `f64` when
/// either side is not an integer or the sum overflows.
pub fn sum_values(a: &str, b: &str, kind: AttributeType) -> Result<String, TemporaError> {
    if kind.is_integral() {
        if let (Ok(x), Ok(y)) = (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
            if let Some(sum) = x.checked_add(y) {
                return Ok(sum.to_string());
            }
        }
    }
    let x = parse_number(a)?;
    let y = parse_number(b)?;
    Ok(format_real(x + y))
}

/// Parse a raw numeric value.
pub fn parse_number(raw: &str) -> Result<f64, TemporaError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| TemporaError::InvalidNumber(format!("{:?}", raw)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeDomain;

    fn def(kind: AttributeType, policy: AggregationPolicy) -> AttributeDef {
        AttributeDef::new("x", "X", kind).with_policy(policy)
    }

    fn val(value: &str, start: f64, end: f64) -> AttributeValue {
        AttributeValue::new("x", value, Interval::real(start, end))
    }

    fn cal(value: &str, start: &str, end: &str) -> AttributeValue {
        let interval =
            Interval::parse(TimeDomain::Calendar, Some(start), Some(end)).expect("interval");
        AttributeValue::new("x", value, interval)
    }

    #[test]
    fn standard_rejects_identical_start() {
        let d = def(AttributeType::String, AggregationPolicy::Standard);
        let mut store = AttributeValues::new();

        assert_eq!(store.add(val("a", 1.0, 2.0), Some(&d)), MergeOutcome::Inserted);
        assert_eq!(store.add(val("b", 1.0, 9.0), Some(&d)), MergeOutcome::Duplicate);
        assert_eq!(store.add(val("c", 2.0, 3.0), Some(&d)), MergeOutcome::Inserted);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("x").map(|v| v.value.as_str()), Some("a"));
    }

    #[test]
    fn bridging_value_only_widens_first_match() {
        let d = def(AttributeType::Integer, AggregationPolicy::Add);
        let mut store = AttributeValues::new();

        store.add(val("5", 1.0, 5.0), Some(&d));
        store.add(val("2", 10.0, 15.0), Some(&d));
        assert_eq!(store.add(val("4", 4.0, 11.0), Some(&d)), MergeOutcome::Combined);

        let values: Vec<_> = store.iter().map(|v| (v.value.as_str(), v.interval.clone())).collect();
        assert_eq!(
            values,
            vec![("9", Interval::real(1.0, 11.0)), ("2", Interval::real(10.0, 15.0))]
        );
        assert!(values[0].1.overlaps(&values[1].1).expect("same domain"));
    }

    #[test]
    fn unresolved_attribute_behaves_as_standard() {
        let mut store = AttributeValues::new();
        assert_eq!(store.add(val("a", 1.0, 2.0), None), MergeOutcome::Inserted);
        assert_eq!(store.add(val("a", 1.0, 2.0), None), MergeOutcome::Duplicate);
        assert_eq!(store.add(val("a", 3.0, 4.0), None), MergeOutcome::Inserted);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn add_sums_overlapping_calendar_values() {
        let d = def(AttributeType::Integer, AggregationPolicy::Add);
        let mut store = AttributeValues::new();

        store.add(cal("5", "2020-01-01", "2020-01-05"), Some(&d));
        let outcome = store.add(cal("7", "2020-01-03", "2020-01-10"), Some(&d));

        assert_eq!(outcome, MergeOutcome::Combined);
        assert_eq!(store.len(), 1);
        let only = store.get("x").expect("value");
        assert_eq!(only.value, "12");
        assert_eq!(
            only.interval,
            Interval::parse(TimeDomain::Calendar, Some("2020-01-01"), Some("2020-01-10"))
                .expect("interval")
        );
    }

    #[test]
    fn add_keeps_disjoint_values_apart() {
        let d = def(AttributeType::Double, AggregationPolicy::Add);
        let mut store = AttributeValues::new();

        store.add(val("1.5", 1.0, 2.0), Some(&d));
        assert_eq!(store.add(val("2", 5.0, 6.0), Some(&d)), MergeOutcome::Inserted);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn add_concatenates_strings() {
        let d = def(AttributeType::String, AggregationPolicy::Add);
        let mut store = AttributeValues::new();

        store.add(val("alpha", 1.0, 5.0), Some(&d));
        store.add(val("beta", 4.0, 6.0), Some(&d));

        let only = store.get("x").expect("value");
        assert_eq!(only.value, "alpha, beta");
        assert_eq!(only.interval, Interval::real(1.0, 6.0));
    }

    #[test]
    fn total_collapses_everything() {
        let d = def(AttributeType::Integer, AggregationPolicy::Total);
        let mut store = AttributeValues::new();

        store.add(val("10", 1.0, 2.0), Some(&d));
        store.add(val("20", 50.0, 60.0), Some(&d));
        store.add(val("5", 100.0, 200.0), Some(&d));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("x").map(|v| v.value.as_str()), Some("35"));
    }

    #[test]
    fn merge_extends_equal_values() {
        let d = def(AttributeType::String, AggregationPolicy::Merge);
        let mut store = AttributeValues::new();

        store.add(val("X", 1.0, 5.0), Some(&d));
        assert_eq!(store.add(val("X", 3.0, 9.0), Some(&d)), MergeOutcome::Extended);

        assert_eq!(store.len(), 1);
        let only = store.get("x").expect("value");
        assert_eq!(only.value, "X");
        assert_eq!(only.interval, Interval::real(1.0, 9.0));
    }

    #[test]
    fn merge_conflict_concatenates() {
        let d = def(AttributeType::String, AggregationPolicy::Merge);
        let mut store = AttributeValues::new();

        store.add(val("X", 1.0, 5.0), Some(&d));
        assert_eq!(store.add(val("Y", 3.0, 9.0), Some(&d)), MergeOutcome::Conflicted);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("x").map(|v| v.value.as_str()), Some("X, Y"));
    }

    #[test]
    fn merge_fills_sentinel_without_widening() {
        let d = def(AttributeType::String, AggregationPolicy::Merge);
        let mut store = AttributeValues::new();

        assert_eq!(store.add(val("na", 1.0, 5.0), Some(&d)), MergeOutcome::Inserted);
        assert_eq!(store.add(val("DEM", 3.0, 9.0), Some(&d)), MergeOutcome::Filled);

        let only = store.get("x").expect("value");
        assert_eq!(only.value, "DEM");
        assert_eq!(only.interval, Interval::real(1.0, 5.0));
    }

    #[test]
    fn merge_discards_incoming_sentinel() {
        let d = def(AttributeType::String, AggregationPolicy::Merge);
        let mut store = AttributeValues::new();

        store.add(val("DEM", 1.0, 5.0), Some(&d));
        assert_eq!(store.add(val("na", 20.0, 30.0), Some(&d)), MergeOutcome::Discarded);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn merge_first_overlap_wins() {
        let d = def(AttributeType::String, AggregationPolicy::Merge);
        let mut store = AttributeValues::new();

        store.add(val("A", 1.0, 5.0), Some(&d));
        store.add(val("B", 10.0, 15.0), Some(&d));
        // Overlaps both; only the first is touched.
        assert_eq!(store.add(val("B", 4.0, 11.0), Some(&d)), MergeOutcome::Conflicted);

        let values: Vec<_> = store.values_for("x").map(|v| v.value.as_str()).collect();
        assert_eq!(values, vec!["A, B", "B"]);
    }

    #[test]
    fn unparsable_number_is_skipped() {
        let d = def(AttributeType::Double, AggregationPolicy::Total);
        let mut store = AttributeValues::new();

        store.add(val("10", 1.0, 2.0), Some(&d));
        assert_eq!(store.add(val("ten", 1.0, 2.0), Some(&d)), MergeOutcome::Skipped);
        assert_eq!(store.get("x").map(|v| v.value.as_str()), Some("10"));
    }

    #[test]
    fn other_attributes_do_not_collide() {
        let d = def(AttributeType::Integer, AggregationPolicy::Total);
        let mut store = AttributeValues::new();

        store.add(val("1", 1.0, 2.0), Some(&d));
        store.add(AttributeValue::new("y", "2", Interval::real(1.0, 2.0)), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn integral_sum_falls_back_to_float() {
        assert_eq!(sum_values("3", "4", AttributeType::Integer).expect("sum"), "7");
        assert_eq!(sum_values("3.5", "4", AttributeType::Integer).expect("sum"), "7.5");
        assert_eq!(sum_values("0.25", "0.5", AttributeType::Double).expect("sum"), "0.75");
        assert!(sum_values("x", "4", AttributeType::Double).is_err());
    }
}
