//! # Temporal Intervals
//!
//! The interval algebra every other component builds on.
//!
//! An [`Interval`] is a closed `[start, end]` range in one of two domains:
//! calendar timestamps or plain reals. Either bound may be absent; an absent
//! `end` means "ongoing". Points are parsed once, at the edge of the system,
//! so comparisons never re-parse strings.
//!
//! ## Overlap
//!
//! - Either start absent: never overlaps.
//! - Either end absent: overlaps iff the starts are exactly equal.
//! - Otherwise: closed-interval intersection, `!(a.end < b.start || b.end < a.start)`.
//!
//! Comparing a calendar point with a real point is a [`TemporaError::DomainMismatch`];
//! callers must skip the update rather than guess.

use crate::TemporaError;
use crate::types::{TimeDomain, TimeFormat};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Naive layouts accepted for calendar bounds, interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Offset-bearing layouts that are not strict RFC 3339.
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

// =============================================================================
// TIME STYLE
// =============================================================================

/// How calendar points are rendered by the codec.
///
/// Passed explicitly to every writer; there is no shared formatter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeStyle {
    /// Fractional-second precision.
    pub seconds: SecondsFormat,
    /// Render a zero offset as `Z` instead of `+00:00`.
    pub use_z: bool,
    /// Render calendar points as `yyyy-MM-dd` only.
    pub date_only: bool,
}

impl TimeStyle {
    /// This style, narrowed to dates when the graph's time format is `date`.
    #[must_use]
    pub fn for_format(self, format: TimeFormat) -> Self {
        Self {
            date_only: self.date_only || format == TimeFormat::Date,
            ..self
        }
    }
}

impl Default for TimeStyle {
    fn default() -> Self {
        Self {
            seconds: SecondsFormat::Millis,
            use_z: true,
            date_only: false,
        }
    }
}

// =============================================================================
// TIME POINT
// =============================================================================

/// A single interval bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimePoint {
    Calendar(DateTime<FixedOffset>),
    Real(f64),
}

impl TimePoint {
    /// Parse a raw bound in the given domain.
    pub fn parse(raw: &str, domain: TimeDomain) -> Result<Self, TemporaError> {
        match domain {
            TimeDomain::Calendar => parse_calendar(raw).map(Self::Calendar),
            TimeDomain::Real => parse_real(raw).map(Self::Real),
        }
    }

    /// The domain this point belongs to.
    #[must_use]
    pub const fn domain(&self) -> TimeDomain {
        match self {
            Self::Calendar(_) => TimeDomain::Calendar,
            Self::Real(_) => TimeDomain::Real,
        }
    }

    /// Order two points of the same domain.
    pub fn compare(&self, other: &Self) -> Result<Ordering, TemporaError> {
        match (self, other) {
            (Self::Calendar(a), Self::Calendar(b)) => Ok(a.cmp(b)),
            (Self::Real(a), Self::Real(b)) => Ok(a.total_cmp(b)),
            _ => Err(TemporaError::DomainMismatch),
        }
    }

    /// Render for output.
    #[must_use]
    pub fn format(&self, style: &TimeStyle) -> String {
        match self {
            Self::Calendar(dt) if style.date_only => dt.format("%Y-%m-%d").to_string(),
            Self::Calendar(dt) => dt.to_rfc3339_opts(style.seconds, style.use_z),
            Self::Real(v) => format_real(*v),
        }
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(&TimeStyle::default()))
    }
}

/// Render a real number in its shortest round-trip form (`12`, not `12.0`).
#[must_use]
pub fn format_real(value: f64) -> String {
    format!("{}", value)
}

fn parse_real(raw: &str) -> Result<f64, TemporaError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(TemporaError::InvalidTime(format!(
            "{:?} is not a finite real number",
            raw
        ))),
    }
}

fn parse_calendar(raw: &str) -> Result<DateTime<FixedOffset>, TemporaError> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    for layout in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, layout) {
            return Ok(dt);
        }
    }
    for layout in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc().fixed_offset());
    }

    Err(TemporaError::InvalidTime(format!(
        "{:?} is not an ISO-8601 or 'yyyy-MM-dd HH:mm:ss' timestamp",
        raw
    )))
}

// =============================================================================
// INTERVAL
// =============================================================================

/// A validity range. See the module docs for overlap semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    domain: TimeDomain,
    start: Option<TimePoint>,
    end: Option<TimePoint>,
}

impl Interval {
    /// Build an interval, rejecting bounds from the wrong domain.
    ///
    /// Ordering of the bounds is not checked here; see [`Interval::is_valid`].
    pub fn new(
        domain: TimeDomain,
        start: Option<TimePoint>,
        end: Option<TimePoint>,
    ) -> Result<Self, TemporaError> {
        for point in start.iter().chain(end.iter()) {
            if point.domain() != domain {
                return Err(TemporaError::DomainMismatch);
            }
        }
        Ok(Self { domain, start, end })
    }

    /// An interval with neither bound.
    #[must_use]
    pub const fn empty(domain: TimeDomain) -> Self {
        Self {
            domain,
            start: None,
            end: None,
        }
    }

    /// A closed real interval.
    #[must_use]
    pub const fn real(start: f64, end: f64) -> Self {
        Self {
            domain: TimeDomain::Real,
            start: Some(TimePoint::Real(start)),
            end: Some(TimePoint::Real(end)),
        }
    }

    /// A real interval that starts at `start` and is still ongoing.
    #[must_use]
    pub const fn real_from(start: f64) -> Self {
        Self {
            domain: TimeDomain::Real,
            start: Some(TimePoint::Real(start)),
            end: None,
        }
    }

    /// Parse raw bounds. Empty strings count as absent.
    pub fn parse(
        domain: TimeDomain,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self, TemporaError> {
        let parse_bound = |raw: Option<&str>| -> Result<Option<TimePoint>, TemporaError> {
            match raw.map(str::trim) {
                None | Some("") => Ok(None),
                Some(s) => TimePoint::parse(s, domain).map(Some),
            }
        };
        Ok(Self {
            domain,
            start: parse_bound(start)?,
            end: parse_bound(end)?,
        })
    }

    #[must_use]
    pub const fn domain(&self) -> TimeDomain {
        self.domain
    }

    #[must_use]
    pub const fn start(&self) -> Option<&TimePoint> {
        self.start.as_ref()
    }

    #[must_use]
    pub const fn end(&self) -> Option<&TimePoint> {
        self.end.as_ref()
    }

    /// True when neither bound is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// `start <= end`, trivially true when either bound is absent.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match (&self.start, &self.end) {
            (Some(s), Some(e)) => s.compare(e).is_ok_and(|o| o != Ordering::Greater),
            _ => true,
        }
    }

    /// Whether two starts are identical (both absent counts as identical).
    #[must_use]
    pub fn same_start(&self, other: &Self) -> bool {
        match (&self.start, &other.start) {
            (Some(a), Some(b)) => a.compare(b).is_ok_and(Ordering::is_eq),
            (None, None) => true,
            _ => false,
        }
    }

    /// Overlap test; symmetric in its arguments.
    pub fn overlaps(&self, other: &Self) -> Result<bool, TemporaError> {
        let (Some(s1), Some(s2)) = (&self.start, &other.start) else {
            tracing::warn!("overlap test on an interval without a start: {} / {}", self, other);
            return Ok(false);
        };

        match (&self.end, &other.end) {
            (Some(e1), Some(e2)) => {
                let disjoint = e1.compare(s2)?.is_lt() || e2.compare(s1)?.is_lt();
                Ok(!disjoint)
            }
            _ => Ok(s1.compare(s2)?.is_eq()),
        }
    }

    /// Extend `self` to cover `other`.
    ///
    /// New start is the earlier of the present starts. The end stays absent
    /// if either side is ongoing, otherwise it is the later end. An empty
    /// `self` becomes a copy of `other`, domain included; an empty `other`
    /// changes nothing. On error `self` is left untouched.
    pub fn union(&mut self, other: &Self) -> Result<(), TemporaError> {
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            *self = other.clone();
            return Ok(());
        }
        if self.domain != other.domain {
            return Err(TemporaError::DomainMismatch);
        }

        let start = pick_bound(self.start, other.start, Ordering::Less)?;
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => pick_bound(Some(a), Some(b), Ordering::Greater)?,
            _ => None,
        };
        self.start = start;
        self.end = end;
        Ok(())
    }
}

/// Keep `a` unless `b` compares to it as `prefer`.
fn pick_bound(
    a: Option<TimePoint>,
    b: Option<TimePoint>,
    prefer: Ordering,
) -> Result<Option<TimePoint>, TemporaError> {
    match (a, b) {
        (Some(a), Some(b)) => Ok(Some(if b.compare(&a)? == prefer { b } else { a })),
        (Some(a), None) => Ok(Some(a)),
        (None, b) => Ok(b),
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |p: &Option<TimePoint>| p.map(|p| p.to_string()).unwrap_or_default();
        write!(f, "[{}, {}]", show(&self.start), show(&self.end))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cal(start: &str, end: &str) -> Interval {
        Interval::parse(TimeDomain::Calendar, Some(start), Some(end)).expect("parse")
    }

    #[test]
    fn closed_intervals_overlap() {
        let a = Interval::real(1.0, 5.0);
        let b = Interval::real(3.0, 9.0);
        let c = Interval::real(6.0, 9.0);

        assert!(a.overlaps(&b).expect("same domain"));
        assert!(!a.overlaps(&c).expect("same domain"));
    }

    #[test]
    fn touching_endpoints_overlap() {
        let a = Interval::real(1.0, 5.0);
        let b = Interval::real(5.0, 9.0);
        assert!(a.overlaps(&b).expect("same domain"));
    }

    #[test]
    fn open_intervals_overlap_only_on_equal_start() {
        let open = Interval::real_from(3.0);
        assert!(open.overlaps(&Interval::real(3.0, 10.0)).expect("ok"));
        assert!(!open.overlaps(&Interval::real(1.0, 10.0)).expect("ok"));
    }

    #[test]
    fn missing_start_never_overlaps() {
        let empty = Interval::empty(TimeDomain::Real);
        assert!(!empty.overlaps(&Interval::real(1.0, 2.0)).expect("ok"));
        assert!(!empty.overlaps(&empty).expect("ok"));
    }

    #[test]
    fn domain_mismatch_is_an_error() {
        let a = cal("2020-01-01", "2020-01-05");
        let b = Interval::real(1.0, 2.0);
        assert!(matches!(a.overlaps(&b), Err(TemporaError::DomainMismatch)));

        let mut c = a.clone();
        assert!(c.union(&b).is_err());
        assert_eq!(c, a, "failed union must not mutate");
    }

    #[test]
    fn union_extends_both_bounds() {
        let mut a = Interval::real(2.0, 5.0);
        a.union(&Interval::real(1.0, 3.0)).expect("union");
        assert_eq!(a, Interval::real(1.0, 5.0));

        a.union(&Interval::real(4.0, 9.0)).expect("union");
        assert_eq!(a, Interval::real(1.0, 9.0));
    }

    #[test]
    fn union_keeps_ongoing_end_open() {
        let mut a = Interval::real_from(4.0);
        a.union(&Interval::real(4.0, 8.0)).expect("union");
        assert_eq!(a, Interval::real_from(4.0));

        let mut b = Interval::real(1.0, 3.0);
        b.union(&Interval::real_from(2.0)).expect("union");
        assert_eq!(b, Interval::real_from(1.0));
    }

    #[test]
    fn union_with_empty_sides() {
        let mut a = Interval::empty(TimeDomain::Real);
        a.union(&Interval::real_from(2.0)).expect("union");
        assert_eq!(a, Interval::real_from(2.0));

        let mut b = Interval::real(1.0, 2.0);
        b.union(&Interval::empty(TimeDomain::Calendar)).expect("empty is a no-op");
        assert_eq!(b, Interval::real(1.0, 2.0));
    }

    #[test]
    fn empty_union_adopts_the_other_domain() {
        let mut a = Interval::empty(TimeDomain::Real);
        let b = cal("2020-01-01", "2020-01-05");
        a.union(&b).expect("union");

        assert_eq!(a.domain(), TimeDomain::Calendar);
        assert_eq!(a, b);
        assert!(Interval::new(a.domain(), a.start().copied(), a.end().copied()).is_ok());
    }

    #[test]
    fn union_rejects_foreign_domain_without_shared_bounds() {
        let mut a = Interval::real_from(1.0);
        let b = Interval::parse(TimeDomain::Calendar, None, Some("2020-01-05")).expect("parse");
        assert!(matches!(a.union(&b), Err(TemporaError::DomainMismatch)));
        assert_eq!(a, Interval::real_from(1.0));
    }

    #[test]
    fn date_only_style() {
        let p = TimePoint::parse("2020-03-04T10:30:00Z", TimeDomain::Calendar).expect("parse");
        let style = TimeStyle::default().for_format(TimeFormat::Date);
        assert_eq!(p.format(&style), "2020-03-04");
        assert_eq!(TimeStyle::default().for_format(TimeFormat::DateTime), TimeStyle::default());
        assert_eq!(TimePoint::Real(2.5).format(&style), "2.5");
    }

    #[test]
    fn validity() {
        assert!(Interval::real(1.0, 1.0).is_valid());
        assert!(!Interval::real(2.0, 1.0).is_valid());
        assert!(Interval::real_from(9.0).is_valid());
    }

    #[test]
    fn calendar_accepts_both_layouts() {
        let iso = TimePoint::parse("2020-01-03T00:00:00.000Z", TimeDomain::Calendar).expect("iso");
        let plain = TimePoint::parse("2020-01-03 00:00:00", TimeDomain::Calendar).expect("plain");
        let date = TimePoint::parse("2020-01-03", TimeDomain::Calendar).expect("date");
        let offset = TimePoint::parse("2020-01-03T02:00:00+02:00", TimeDomain::Calendar).expect("offset");

        assert_eq!(iso, plain);
        assert_eq!(iso, date);
        assert_eq!(iso, offset);
    }

    #[test]
    fn calendar_rejects_garbage() {
        assert!(matches!(
            TimePoint::parse("last tuesday", TimeDomain::Calendar),
            Err(TemporaError::InvalidTime(_))
        ));
        assert!(TimePoint::parse("NaN", TimeDomain::Real).is_err());
    }

    #[test]
    fn calendar_formats_as_rfc3339() {
        let p = TimePoint::parse("2020-01-01 00:00:00", TimeDomain::Calendar).expect("parse");
        assert_eq!(p.format(&TimeStyle::default()), "2020-01-01T00:00:00.000Z");
    }

    #[test]
    fn real_formats_without_trailing_zero() {
        assert_eq!(format_real(12.0), "12");
        assert_eq!(format_real(2.5), "2.5");
    }

    #[test]
    fn new_rejects_foreign_points() {
        let result = Interval::new(TimeDomain::Calendar, Some(TimePoint::Real(1.0)), None);
        assert!(matches!(result, Err(TemporaError::DomainMismatch)));
    }

    #[test]
    fn empty_strings_are_absent_bounds() {
        let i = Interval::parse(TimeDomain::Real, Some(""), Some("  ")).expect("parse");
        assert!(i.is_empty());
    }
}
