use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A named, calorie-valued record. Meals and workouts share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub calories: f64,
}

impl Item {
    pub fn with_id(id: i64, name: impl Into<String>, calories: f64) -> Self {
        Self {
            id,
            name: name.into(),
            calories,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Meal,
    Workout,
}

impl ItemKind {
    /// Storage key holding the serialized list for this kind.
    pub fn storage_key(&self) -> &'static str {
        match self {
            ItemKind::Meal => "meal",
            ItemKind::Workout => "workout",
        }
    }

    /// Signed effect of `calories` of this kind on the balance.
    pub fn signed(&self, calories: f64) -> f64 {
        match self {
            ItemKind::Meal => calories,
            ItemKind::Workout => -calories,
        }
    }
}

/// Hands out creation-timestamp ids that never repeat within a session.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure later ids sort after `id`, so loaded items are never shadowed.
    pub fn observe(&mut self, id: i64) {
        self.last = self.last.max(id);
    }

    pub fn next_id(&mut self) -> i64 {
        self.next_at(Utc::now().timestamp_millis())
    }

    pub fn next_at(&mut self, now_millis: i64) -> i64 {
        if now_millis > self.last {
            self.last = now_millis;
            return now_millis;
        }
        match self.last.checked_add(1) {
            Some(id) => {
                self.last = id;
                id
            }
            None => {
                warn!(last = self.last, "item id space exhausted, reusing the largest id");
                self.last
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressLevel {
    Under,
    Near,
    Over,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub percent: f64,
    pub width: f64,
    pub level: ProgressLevel,
}

#[derive(Debug, Deserialize)]
pub struct NewItemRequest {
    #[serde(default)]
    pub name: String,
    pub calories: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct LimitRequest {
    pub limit: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub filter: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub limit: f64,
    pub balance: f64,
    pub consumed: f64,
    pub burned: f64,
    pub remaining: f64,
    pub progress: Progress,
    pub meals: Vec<Item>,
    pub workouts: Vec<Item>,
}
