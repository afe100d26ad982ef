//! Explicit representation of statistics that may be undefined.
//!
//! A trailing ratio without enough history, a forward return without a
//! future observation and a join without a benchmark row are all undefined,
//! but for different reasons. `Datum` keeps the reason instead of folding
//! everything into a NaN that arithmetic would silently carry along.

use serde::{Deserialize, Serialize};

/// Why a value is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// Fewer trailing observations than the horizon requires.
    InsufficientHistory,
    /// No observation exists `horizon` rows ahead.
    NoForwardObservation,
    /// The benchmark has no value on this date.
    MissingBenchmark,
}

/// A value that is either defined or undefined for a known reason.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datum<T> {
    /// A computed value.
    Defined(T),
    /// No value, with the reason it could not be computed.
    Undefined(UndefinedReason),
}

impl<T: Copy> Datum<T> {
    /// Get the value if defined.
    #[inline]
    pub fn value(self) -> Option<T> {
        match self {
            Datum::Defined(v) => Some(v),
            Datum::Undefined(_) => None,
        }
    }

    /// Get the reason if undefined.
    #[inline]
    pub fn reason(self) -> Option<UndefinedReason> {
        match self {
            Datum::Defined(_) => None,
            Datum::Undefined(r) => Some(r),
        }
    }

    #[inline]
    pub fn is_defined(self) -> bool {
        matches!(self, Datum::Defined(_))
    }

    /// Apply `f` to a defined value; undefined passes through with its reason.
    #[inline]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Datum<U> {
        match self {
            Datum::Defined(v) => Datum::Defined(f(v)),
            Datum::Undefined(r) => Datum::Undefined(r),
        }
    }

    /// Combine two values. When both are undefined the left reason wins.
    #[inline]
    pub fn zip_with<U: Copy, R>(self, other: Datum<U>, f: impl FnOnce(T, U) -> R) -> Datum<R> {
        match (self, other) {
            (Datum::Defined(a), Datum::Defined(b)) => Datum::Defined(f(a, b)),
            (Datum::Undefined(r), _) | (_, Datum::Undefined(r)) => Datum::Undefined(r),
        }
    }
}

impl<T> From<Datum<T>> for Option<T> {
    fn from(d: Datum<T>) -> Self {
        match d {
            Datum::Defined(v) => Some(v),
            Datum::Undefined(_) => None,
        }
    }
}
