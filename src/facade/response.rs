//! Response shapes shared by every facade operation.

#![allow(missing_docs)]

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

use crate::core::errors::{ErrorKind, SgqError};
use crate::logs::engine::LogPage;
use crate::store::aggregate::AggregateSeries;
use crate::topology::resolver::Topology;

/// Uniform failure handed to callers: stable code, coarse kind, no paths.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[error("[{code}] {message}")]
pub struct QueryFailure {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
}

impl From<&SgqError> for QueryFailure {
    fn from(err: &SgqError) -> Self {
        Self {
            kind: err.kind(),
            code: err.code(),
            message: err.public_message(),
        }
    }
}

pub type QueryResult<T> = std::result::Result<T, QueryFailure>;

/// Optional single result; absent serializes as `{}` rather than `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Maybe<T>(pub Option<T>);

impl<T> Maybe<T> {
    pub fn into_option(self) -> Option<T> {
        self.0
    }

    pub const fn as_ref(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub const fn is_absent(&self) -> bool {
        self.0.is_none()
    }
}

impl<T> From<Option<T>> for Maybe<T> {
    fn from(value: Option<T>) -> Self {
        Self(value)
    }
}

impl<T: Serialize> Serialize for Maybe<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            Some(value) => value.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

/// Number of items a response carries, for the journal's `result_count`.
pub trait Counted {
    fn result_count(&self) -> u64;
}

fn widen(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

impl<T> Counted for Vec<T> {
    fn result_count(&self) -> u64 {
        widen(self.len())
    }
}

impl<T> Counted for Maybe<T> {
    fn result_count(&self) -> u64 {
        u64::from(self.0.is_some())
    }
}

impl Counted for Topology {
    fn result_count(&self) -> u64 {
        widen(self.len())
    }
}

impl Counted for LogPage {
    fn result_count(&self) -> u64 {
        widen(self.logs.len())
    }
}

impl Counted for AggregateSeries {
    fn result_count(&self) -> u64 {
        widen(self.len())
    }
}

/// Bytes copied by raw log retrieval.
impl Counted for u64 {
    fn result_count(&self) -> u64 {
        *self
    }
}
