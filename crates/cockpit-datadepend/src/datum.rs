//! Observed values and provider inputs

use crate::error::ComputationError;
use serde_json::Value;
use smallvec::SmallVec;

/// Current state of a key as seen by an observer
///
/// `Undefined` is a normal signal ("no value available yet"), not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// No node in the lookup chain provides the key
    Undefined,
    /// Computation not yet settled
    Pending,
    /// Settled value
    Resolved(Value),
    /// Settled failure, delivered as a value
    Failed(ComputationError),
}

impl Datum {
    /// Resolved value, if any
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// Captured failure, if any
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&ComputationError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the datum is still waiting on a computation
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether the datum reached a settled state (including undefined)
    #[inline]
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Convert a settled datum into a result
    ///
    /// Returns `None` for pending data.
    #[must_use]
    pub fn into_result(self) -> Option<Result<Option<Value>, ComputationError>> {
        match self {
            Self::Pending => None,
            Self::Undefined => Some(Ok(None)),
            Self::Resolved(value) => Some(Ok(Some(value))),
            Self::Failed(err) => Some(Err(err)),
        }
    }
}

/// Dependency values handed to a provider, in declaration order
///
/// Values are resolved from the node that requested the key, so an inherited
/// provider sees the requesting node's shadowed dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    keys: SmallVec<[String; 4]>,
    values: Vec<Option<Value>>,
}

impl Args {
    pub(crate) fn new(keys: SmallVec<[String; 4]>, values: Vec<Option<Value>>) -> Self {
        debug_assert_eq!(keys.len(), values.len());
        Self { keys, values }
    }

    /// Number of declared dependencies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the provider declared no dependencies
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Dependency value by position, `None` when undefined
    #[inline]
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx).and_then(Option::as_ref)
    }

    /// Dependency value by key, `None` when undefined or not declared
    #[must_use]
    pub fn by_key(&self, key: &str) -> Option<&Value> {
        let idx = self.keys.iter().position(|k| k == key)?;
        self.get(idx)
    }

    /// Dependency value by position, failing when undefined
    ///
    /// # Errors
    /// [`ComputationError`] naming the undefined dependency
    pub fn require(&self, idx: usize) -> Result<&Value, ComputationError> {
        self.get(idx).ok_or_else(|| {
            let key = self.keys.get(idx).map_or("<missing>", String::as_str);
            ComputationError::undefined(key)
        })
    }

    /// Dependency as `i64`, failing when undefined or not an integer
    ///
    /// # Errors
    /// [`ComputationError`] when the value is missing or has another type
    pub fn require_i64(&self, idx: usize) -> Result<i64, ComputationError> {
        let value = self.require(idx)?;
        value.as_i64().ok_or_else(|| {
            ComputationError::new(format!(
                "dependency '{}' is not an integer: {value}",
                self.keys[idx]
            ))
        })
    }

    /// Declared dependency keys
    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Take ownership of the values
    #[inline]
    #[must_use]
    pub fn into_values(self) -> Vec<Option<Value>> {
        self.values
    }
}
