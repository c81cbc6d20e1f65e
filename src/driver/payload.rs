//! Request payloads and the generators that fill them in per iteration

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FixtureError;

/// Body POSTed to the queue endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub priority: i32,
    pub data: Value,
}

/// Produces the priority for the next request
pub trait PriorityGenerator: Send + Sync {
    fn next_priority(&self) -> i32;

    /// Inclusive range every generated value falls in
    fn bounds(&self) -> (i32, i32);
}

/// Always the same priority
#[derive(Debug, Clone, Copy)]
pub struct FixedPriority(pub i32);

impl PriorityGenerator for FixedPriority {
    fn next_priority(&self) -> i32 {
        self.0
    }

    fn bounds(&self) -> (i32, i32) {
        (self.0, self.0)
    }
}

/// Uniform priority in the half-open range `[low, high)`
pub struct UniformPriority {
    low: i32,
    high: i32,
    rng: Option<Mutex<StdRng>>,
}

impl UniformPriority {
    pub const DEFAULT_LOW: i32 = 0;
    pub const DEFAULT_HIGH: i32 = 10;

    /// Returns `None` for an empty range
    pub fn new(low: i32, high: i32) -> Option<Self> {
        (low < high).then_some(Self {
            low,
            high,
            rng: None,
        })
    }

    /// Reproducible sequence for a given seed
    pub fn seeded(low: i32, high: i32, seed: u64) -> Option<Self> {
        Self::new(low, high).map(|g| Self {
            rng: Some(Mutex::new(StdRng::seed_from_u64(seed))),
            ..g
        })
    }
}

impl Default for UniformPriority {
    fn default() -> Self {
        Self {
            low: Self::DEFAULT_LOW,
            high: Self::DEFAULT_HIGH,
            rng: None,
        }
    }
}

impl PriorityGenerator for UniformPriority {
    fn next_priority(&self) -> i32 {
        match &self.rng {
            Some(rng) => rng.lock().gen_range(self.low..self.high),
            None => rand::thread_rng().gen_range(self.low..self.high),
        }
    }

    fn bounds(&self) -> (i32, i32) {
        (self.low, self.high - 1)
    }
}

/// Cycles through a fixed list of priorities
pub struct SequencePriority {
    values: Vec<i32>,
    cursor: AtomicUsize,
}

impl SequencePriority {
    /// Returns `None` for an empty list
    pub fn new(values: Vec<i32>) -> Option<Self> {
        (!values.is_empty()).then_some(Self {
            values,
            cursor: AtomicUsize::new(0),
        })
    }
}

impl PriorityGenerator for SequencePriority {
    fn next_priority(&self) -> i32 {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.values.len();
        self.values[idx]
    }

    fn bounds(&self) -> (i32, i32) {
        let min = self.values.iter().copied().min().unwrap_or_default();
        let max = self.values.iter().copied().max().unwrap_or_default();
        (min, max)
    }
}

/// Where the `data` field comes from
#[derive(Debug, Clone)]
pub enum DataSource {
    Literal(Value),
    Fixture(FixtureValues),
}

/// Values loaded from a fixture file, never empty.
///
/// Only built by [`DataSource::from_fixture`].
#[derive(Debug, Clone)]
pub struct FixtureValues {
    path: PathBuf,
    values: Arc<Vec<Value>>,
}

impl FixtureValues {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn sample(&self) -> Value {
        match self.values.as_slice() {
            [only] => only.clone(),
            values => values
                .choose(&mut rand::thread_rng())
                .cloned()
                .unwrap_or_default(),
        }
    }
}

impl Default for DataSource {
    fn default() -> Self {
        Self::Literal(Value::String("1".to_string()))
    }
}

impl DataSource {
    /// Load a JSON fixture once.
    ///
    /// A non-empty top-level array is sampled per iteration. Any other value is
    /// sent as-is on every request.
    pub fn from_fixture(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref().to_path_buf();
        let raw = std::fs::read_to_string(&path).map_err(|source| FixtureError::Read {
            path: path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|source| FixtureError::Parse {
            path: path.clone(),
            source,
        })?;

        let values = match value {
            Value::Array(items) if items.is_empty() => return Err(FixtureError::Empty(path)),
            Value::Array(items) => items,
            other => vec![other],
        };

        tracing::debug!("Loaded {} fixture value(s) from {}", values.len(), path.display());
        Ok(Self::Fixture(FixtureValues {
            path,
            values: Arc::new(values),
        }))
    }

    pub fn next_value(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Fixture(fixture) => fixture.sample(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Literal(value) => format!("literal {}", value),
            Self::Fixture(fixture) => {
                format!("fixture {} ({} value(s))", fixture.path().display(), fixture.len())
            }
        }
    }
}

/// Builds a fresh payload for every iteration
#[derive(Clone)]
pub struct PayloadFactory {
    priority: Arc<dyn PriorityGenerator>,
    data: DataSource,
    data_as_string: bool,
}

impl PayloadFactory {
    pub fn new(priority: Arc<dyn PriorityGenerator>, data: DataSource) -> Self {
        Self {
            priority,
            data,
            data_as_string: false,
        }
    }

    /// Send non-string `data` values as their JSON text.
    ///
    /// The `/push` server only accepts a string in the `data` field.
    pub fn with_data_as_string(mut self, enabled: bool) -> Self {
        self.data_as_string = enabled;
        self
    }

    pub fn priority_bounds(&self) -> (i32, i32) {
        self.priority.bounds()
    }

    pub fn data_source(&self) -> &DataSource {
        &self.data
    }

    pub fn build(&self) -> RequestPayload {
        let data = match self.data.next_value() {
            Value::String(s) => Value::String(s),
            other if self.data_as_string => Value::String(other.to_string()),
            other => other,
        };

        RequestPayload {
            priority: self.priority.next_priority(),
            data,
        }
    }
}

impl Default for PayloadFactory {
    fn default() -> Self {
        Self::new(Arc::new(FixedPriority(1)), DataSource::default())
    }
}

impl std::fmt::Debug for PayloadFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadFactory")
            .field("priority_bounds", &self.priority.bounds())
            .field("data", &self.data.describe())
            .field("data_as_string", &self.data_as_string)
            .finish()
    }
}
