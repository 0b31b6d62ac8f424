//! Quantified resource bundles carried by offers and demanded by tasks.
//!
//! A [`ResourceSet`] holds three kinds of dimensions:
//!
//! - **Scalars** such as `cpus`, `mem`, or `disk`, summed on combination.
//! - **Ranges** such as `ports`, kept as sorted, coalesced inclusive intervals.
//! - **Sets** of discrete named items (for example GPU device ids), unioned.
//!
//! Subtraction never saturates: removing more than is present in any
//! dimension is reported as [`OfferError::InsufficientResources`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{OfferError, OfferResult};

/// Scalar CPU share resource name.
pub const CPUS: &str = "cpus";
/// Scalar memory (MiB) resource name.
pub const MEMORY: &str = "mem";
/// Scalar disk (MiB) resource name.
pub const DISK: &str = "disk";
/// Ranged port resource name.
pub const PORTS: &str = "ports";

/// Tolerance used when comparing scalar amounts.
const EPSILON: f64 = 1e-6;

/// An inclusive range of values, e.g. ports `31000..=31009`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueRange {
    /// First value in the range.
    pub begin: u64,
    /// Last value in the range (inclusive).
    pub end: u64,
}

impl ValueRange {
    /// Create a range; the bounds are swapped if given in reverse order.
    #[must_use]
    pub const fn new(begin: u64, end: u64) -> Self {
        if begin <= end {
            Self { begin, end }
        } else {
            Self {
                begin: end,
                end: begin,
            }
        }
    }

    /// Number of values covered by the range.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.begin + 1
    }

    /// Ranges always cover at least one value.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// True if `other` lies entirely within `self`.
    #[must_use]
    pub const fn covers(&self, other: &Self) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{}]", self.begin, self.end)
    }
}

/// A bundle of resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSet {
    #[serde(default)]
    scalars: BTreeMap<String, f64>,
    #[serde(default)]
    ranges: BTreeMap<String, Vec<ValueRange>>,
    #[serde(default)]
    sets: BTreeMap<String, BTreeSet<String>>,
}

impl ResourceSet {
    /// Create an empty resource set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scalar amount to the named dimension. Non-positive amounts are ignored.
    #[must_use]
    pub fn with_scalar(mut self, name: impl Into<String>, amount: f64) -> Self {
        if amount > EPSILON {
            *self.scalars.entry(name.into()).or_insert(0.0) += amount;
        }
        self
    }

    /// Add an inclusive range to the named dimension.
    #[must_use]
    pub fn with_range(mut self, name: impl Into<String>, begin: u64, end: u64) -> Self {
        let entry = self.ranges.entry(name.into()).or_default();
        entry.push(ValueRange::new(begin, end));
        *entry = coalesce(std::mem::take(entry));
        self
    }

    /// Add discrete items to the named set dimension.
    #[must_use]
    pub fn with_items<I, S>(mut self, name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.sets.entry(name.into()).or_default();
        entry.extend(items.into_iter().map(Into::into));
        if entry.is_empty() {
            // keep the invariant that stored dimensions are non-empty
            self.sets.retain(|_, items| !items.is_empty());
        }
        self
    }

    /// Convenience constructor for the common cpu/mem pair.
    #[must_use]
    pub fn cpus_mem(cpus: f64, mem: f64) -> Self {
        Self::new().with_scalar(CPUS, cpus).with_scalar(MEMORY, mem)
    }

    /// Amount of a scalar dimension, zero when absent.
    #[must_use]
    pub fn scalar(&self, name: &str) -> f64 {
        self.scalars.get(name).copied().unwrap_or(0.0)
    }

    /// Coalesced ranges of a ranged dimension, empty when absent.
    #[must_use]
    pub fn ranges(&self, name: &str) -> &[ValueRange] {
        self.ranges.get(name).map_or(&[], Vec::as_slice)
    }

    /// Items of a set dimension, if present.
    #[must_use]
    pub fn items(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.sets.get(name)
    }

    /// Names of every scalar dimension present.
    pub fn scalar_names(&self) -> impl Iterator<Item = &str> {
        self.scalars.keys().map(String::as_str)
    }

    /// True if no dimension holds any resource.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.ranges.is_empty() && self.sets.is_empty()
    }

    /// Union of two resource sets: scalars summed, ranges merged, sets unioned.
    #[must_use]
    pub fn combine(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (name, amount) in &other.scalars {
            *out.scalars.entry(name.clone()).or_insert(0.0) += amount;
        }
        for (name, ranges) in &other.ranges {
            let entry = out.ranges.entry(name.clone()).or_default();
            entry.extend(ranges.iter().copied());
            *entry = coalesce(std::mem::take(entry));
        }
        for (name, items) in &other.sets {
            out.sets
                .entry(name.clone())
                .or_default()
                .extend(items.iter().cloned());
        }
        out
    }

    /// Fold any number of resource sets into one pool.
    pub fn combine_all<'a, I>(sets: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        sets.into_iter()
            .fold(Self::new(), |acc, next| acc.combine(next))
    }

    /// Remove `demand` from `self`.
    ///
    /// # Errors
    ///
    /// Returns [`OfferError::InsufficientResources`] naming the first dimension
    /// in which `demand` exceeds `self`. `self` is never partially modified.
    pub fn subtract(&self, demand: &Self) -> OfferResult<Self> {
        let mut out = self.clone();

        for (name, amount) in &demand.scalars {
            let available = out.scalar(name);
            if *amount > available + EPSILON {
                return Err(insufficient(name, amount, available));
            }
            let remaining = available - amount;
            if remaining > EPSILON {
                out.scalars.insert(name.clone(), remaining);
            } else {
                out.scalars.remove(name);
            }
        }

        for (name, wanted) in &demand.ranges {
            let mut pool = out.ranges.remove(name).unwrap_or_default();
            for range in wanted {
                pool = carve(&pool, *range).ok_or_else(|| OfferError::InsufficientResources {
                    resource: name.clone(),
                    requested: range.to_string(),
                    available: format_ranges(self.ranges(name)),
                })?;
            }
            if !pool.is_empty() {
                out.ranges.insert(name.clone(), pool);
            }
        }

        for (name, wanted) in &demand.sets {
            let held = out.sets.remove(name).unwrap_or_default();
            if !wanted.is_subset(&held) {
                return Err(OfferError::InsufficientResources {
                    resource: name.clone(),
                    requested: format!("{wanted:?}"),
                    available: format!("{held:?}"),
                });
            }
            let remaining: BTreeSet<String> = held.difference(wanted).cloned().collect();
            if !remaining.is_empty() {
                out.sets.insert(name.clone(), remaining);
            }
        }

        Ok(out)
    }

    /// True if every dimension of `demand` can be carved out of `self`.
    #[must_use]
    pub fn contains(&self, demand: &Self) -> bool {
        let scalars_fit = demand
            .scalars
            .iter()
            .all(|(name, amount)| *amount <= self.scalar(name) + EPSILON);
        let ranges_fit = demand.ranges.iter().all(|(name, wanted)| {
            let pool = self.ranges(name);
            wanted
                .iter()
                .all(|range| pool.iter().any(|held| held.covers(range)))
        });
        let sets_fit = demand.sets.iter().all(|(name, wanted)| {
            self.sets
                .get(name)
                .is_some_and(|held| wanted.is_subset(held))
        });
        scalars_fit && ranges_fit && sets_fit
    }
}

impl fmt::Display for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for (name, amount) in &self.scalars {
            parts.push(format!("{name}:{amount}"));
        }
        for (name, ranges) in &self.ranges {
            parts.push(format!("{name}:{}", format_ranges(ranges)));
        }
        for (name, items) in &self.sets {
            let items: Vec<&str> = items.iter().map(String::as_str).collect();
            parts.push(format!("{name}:{{{}}}", items.join(",")));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

fn insufficient(name: &str, requested: &f64, available: f64) -> OfferError {
    OfferError::InsufficientResources {
        resource: name.to_string(),
        requested: requested.to_string(),
        available: available.to_string(),
    }
}

fn format_ranges(ranges: &[ValueRange]) -> String {
    let parts: Vec<String> = ranges.iter().map(ToString::to_string).collect();
    parts.join(",")
}

/// Sort and merge overlapping or adjacent ranges.
fn coalesce(mut ranges: Vec<ValueRange>) -> Vec<ValueRange> {
    ranges.sort_unstable();
    let mut merged: Vec<ValueRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.begin <= last.end.saturating_add(1) => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Remove `range` from a coalesced pool; `None` if no single pool range covers it.
fn carve(pool: &[ValueRange], range: ValueRange) -> Option<Vec<ValueRange>> {
    let idx = pool.iter().position(|held| held.covers(&range))?;
    let held = pool[idx];
    let mut out = Vec::with_capacity(pool.len() + 1);
    out.extend_from_slice(&pool[..idx]);
    if held.begin < range.begin {
        out.push(ValueRange::new(held.begin, range.begin - 1));
    }
    if range.end < held.end {
        out.push(ValueRange::new(range.end + 1, held.end));
    }
    out.extend_from_slice(&pool[idx + 1..]);
    Some(out)
}
