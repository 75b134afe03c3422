//! The calorie ledger: meals, workouts, a daily limit and the running balance.
//!
//! Every mutation writes through to the [`Persistence`] adapter, so the store
//! always mirrors the in-memory state once an operation returns.

use crate::models::{IdGenerator, Item, ItemKind, Progress, ProgressLevel, SummaryResponse};
use crate::persistence::Persistence;
use crate::storage::KeyValueStore;
use tracing::{debug, warn};

const NEAR_LIMIT_PERCENT: f64 = 70.0;

#[derive(Debug, Clone)]
pub struct Ledger<S> {
    calorie_limit: f64,
    calorie_balance: f64,
    meals: Vec<Item>,
    workouts: Vec<Item>,
    ids: IdGenerator,
    persistence: Persistence<S>,
}

impl<S: KeyValueStore> Ledger<S> {
    /// Loads the ledger from `store`, recomputing the balance from the items.
    pub fn load(store: S) -> Self {
        let mut persistence = Persistence::new(store);
        let meals = persistence.items(ItemKind::Meal);
        let workouts = persistence.items(ItemKind::Workout);

        let mut ids = IdGenerator::new();
        for item in meals.iter().chain(workouts.iter()) {
            ids.observe(item.id);
        }

        let calorie_balance = net(&meals, &workouts);
        let stored_balance = persistence.calorie_balance();
        if stored_balance != calorie_balance {
            warn!(
                stored = stored_balance,
                computed = calorie_balance,
                "stored balance disagrees with items, using computed value"
            );
            persistence.set_calorie_balance(calorie_balance);
        }

        Self {
            calorie_limit: persistence.calorie_limit(),
            calorie_balance,
            meals,
            workouts,
            ids,
            persistence,
        }
    }

    pub fn store(&self) -> &S {
        self.persistence.store()
    }

    pub fn into_store(self) -> S {
        self.persistence.into_store()
    }

    pub fn calorie_limit(&self) -> f64 {
        self.calorie_limit
    }

    pub fn calorie_balance(&self) -> f64 {
        self.calorie_balance
    }

    pub fn meals(&self) -> &[Item] {
        &self.meals
    }

    pub fn workouts(&self) -> &[Item] {
        &self.workouts
    }

    pub fn items(&self, kind: ItemKind) -> &[Item] {
        match kind {
            ItemKind::Meal => &self.meals,
            ItemKind::Workout => &self.workouts,
        }
    }

    pub fn contains(&self, kind: ItemKind, id: i64) -> bool {
        self.items(kind).iter().any(|item| item.id == id)
    }

    /// Builds an item stamped with a fresh creation-time id.
    pub fn new_item(&mut self, name: impl Into<String>, calories: f64) -> Item {
        Item::with_id(self.ids.next_id(), name, calories)
    }

    pub fn add_meal(&mut self, item: Item) {
        self.add(ItemKind::Meal, item);
    }

    pub fn add_workout(&mut self, item: Item) {
        self.add(ItemKind::Workout, item);
    }

    pub fn add(&mut self, kind: ItemKind, item: Item) {
        debug!(?kind, id = item.id, calories = item.calories, "adding item");
        self.ids.observe(item.id);
        self.list_mut(kind).push(item);
        self.write_items(kind);
    }

    pub fn remove_meal(&mut self, id: i64) -> Option<Item> {
        self.remove(ItemKind::Meal, id)
    }

    pub fn remove_workout(&mut self, id: i64) -> Option<Item> {
        self.remove(ItemKind::Workout, id)
    }

    /// Removes the item with `id`. An unknown id leaves everything untouched.
    pub fn remove(&mut self, kind: ItemKind, id: i64) -> Option<Item> {
        let list = self.list_mut(kind);
        let position = list.iter().position(|item| item.id == id)?;
        let item = list.remove(position);

        debug!(?kind, id, calories = item.calories, "removed item");
        self.write_items(kind);
        Some(item)
    }

    /// Clears both lists and the store. The limit survives and is re-written.
    pub fn reset_day(&mut self) {
        debug!("resetting day");
        self.calorie_balance = 0.0;
        self.meals.clear();
        self.workouts.clear();
        self.persistence.clear_all();
        self.persistence.set_calorie_limit(self.calorie_limit);
    }

    pub fn set_limit(&mut self, limit: f64) {
        debug!(limit, "setting calorie limit");
        self.calorie_limit = limit;
        self.persistence.set_calorie_limit(limit);
    }

    pub fn consumed(&self) -> f64 {
        total(&self.meals)
    }

    pub fn burned(&self) -> f64 {
        total(&self.workouts)
    }

    pub fn remaining(&self) -> f64 {
        self.calorie_limit - self.calorie_balance
    }

    pub fn progress(&self) -> Progress {
        let percent = if self.calorie_limit == 0.0 {
            0.0
        } else {
            let raw = self.calorie_balance / self.calorie_limit * 100.0;
            (raw * 100.0).round() / 100.0
        };

        let level = if percent < NEAR_LIMIT_PERCENT {
            ProgressLevel::Under
        } else if percent <= 100.0 {
            ProgressLevel::Near
        } else {
            ProgressLevel::Over
        };

        Progress {
            percent,
            width: percent.clamp(0.0, 100.0),
            level,
        }
    }

    /// Items of `kind` whose name contains `text`, ignoring case.
    pub fn filter(&self, kind: ItemKind, text: &str) -> Vec<Item> {
        let needle = text.to_lowercase();
        self.items(kind)
            .iter()
            .filter(|item| item.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> SummaryResponse {
        SummaryResponse {
            limit: self.calorie_limit,
            balance: self.calorie_balance,
            consumed: self.consumed(),
            burned: self.burned(),
            remaining: self.remaining(),
            progress: self.progress(),
            meals: self.meals.clone(),
            workouts: self.workouts.clone(),
        }
    }

    fn list_mut(&mut self, kind: ItemKind) -> &mut Vec<Item> {
        match kind {
            ItemKind::Meal => &mut self.meals,
            ItemKind::Workout => &mut self.workouts,
        }
    }

    /// Balance is re-derived from both lists so it never drifts from them.
    fn write_items(&mut self, kind: ItemKind) {
        self.calorie_balance = net(&self.meals, &self.workouts);
        let items = match kind {
            ItemKind::Meal => &self.meals,
            ItemKind::Workout => &self.workouts,
        };
        self.persistence.set_items(kind, items);
        self.persistence.set_calorie_balance(self.calorie_balance);
    }
}

// Folds start at +0.0 so an empty list never reports -0.
fn total(items: &[Item]) -> f64 {
    items.iter().fold(0.0, |sum, item| sum + item.calories)
}

fn net(meals: &[Item], workouts: &[Item]) -> f64 {
    meals
        .iter()
        .map(|item| ItemKind::Meal.signed(item.calories))
        .chain(workouts.iter().map(|item| ItemKind::Workout.signed(item.calories)))
        .fold(0.0, |sum, calories| sum + calories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{CALORIE_BALANCE_KEY, CALORIE_LIMIT_KEY};
    use crate::storage::LocalStorage;

    fn empty() -> Ledger<LocalStorage> {
        Ledger::load(LocalStorage::new())
    }

    fn assert_balanced(ledger: &Ledger<LocalStorage>) {
        assert_eq!(ledger.calorie_balance(), net(ledger.meals(), ledger.workouts()));
        assert_eq!(
            ledger.store().get(CALORIE_BALANCE_KEY),
            Some(ledger.calorie_balance().to_string())
        );
    }

    #[test]
    fn fresh_ledger_uses_defaults() {
        let ledger = empty();
        assert_eq!(ledger.calorie_limit(), 2000.0);
        assert_eq!(ledger.calorie_balance(), 0.0);
        assert!(ledger.meals().is_empty());
        assert!(ledger.workouts().is_empty());
        assert_eq!(ledger.remaining(), 2000.0);
    }

    #[test]
    fn eggs_and_run_scenario() {
        let mut ledger = empty();

        let eggs = ledger.new_item("Eggs", 300.0);
        let eggs_id = eggs.id;
        ledger.add_meal(eggs);
        assert_eq!(ledger.calorie_balance(), 300.0);

        let run = ledger.new_item("Run", 250.0);
        ledger.add_workout(run);
        assert_eq!(ledger.calorie_balance(), 50.0);

        ledger.set_limit(2000.0);
        assert_eq!(ledger.remaining(), 1950.0);

        let removed = ledger.remove_meal(eggs_id).expect("eggs present");
        assert_eq!(removed.name, "Eggs");
        assert_eq!(ledger.calorie_balance(), -250.0);
        assert_eq!(ledger.remaining(), 2250.0);
        assert_balanced(&ledger);
    }

    #[test]
    fn balance_tracks_items_across_mixed_operations() {
        let mut ledger = empty();
        let mut ids = Vec::new();
        for (index, calories) in [120.0, 0.0, 640.5, 0.1, 310.2].into_iter().enumerate() {
            let item = ledger.new_item(format!("entry {index}"), calories);
            ids.push((index, item.id));
            if index % 2 == 0 {
                ledger.add_meal(item);
            } else {
                ledger.add_workout(item);
            }
            assert_balanced(&ledger);
        }

        for (index, id) in ids.into_iter().rev() {
            if index % 2 == 0 {
                assert!(ledger.remove_meal(id).is_some());
            } else {
                assert!(ledger.remove_workout(id).is_some());
            }
            assert_balanced(&ledger);
        }
        assert_eq!(ledger.calorie_balance(), 0.0);
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let mut ledger = empty();
        let toast = ledger.new_item("Toast", 90.0);
        let toast_id = toast.id;
        ledger.add_meal(toast);
        let before = ledger.store().clone();

        assert!(ledger.remove_meal(toast_id + 1).is_none());
        assert!(ledger.remove_workout(toast_id).is_none());

        assert_eq!(ledger.calorie_balance(), 90.0);
        assert_eq!(ledger.meals().len(), 1);
        assert_eq!(ledger.store(), &before);
        assert!(ledger.contains(ItemKind::Meal, toast_id));
        assert!(!ledger.contains(ItemKind::Workout, toast_id));
    }

    #[test]
    fn reset_day_clears_items_and_keeps_limit() {
        let mut ledger = empty();
        ledger.set_limit(1800.0);
        let soup = ledger.new_item("Soup", 200.0);
        ledger.add_meal(soup);
        let walk = ledger.new_item("Walk", 80.0);
        ledger.add_workout(walk);

        ledger.reset_day();

        assert_eq!(ledger.calorie_balance(), 0.0);
        assert!(ledger.meals().is_empty());
        assert!(ledger.workouts().is_empty());
        assert_eq!(ledger.calorie_limit(), 1800.0);
        let keys: Vec<&str> = ledger.store().keys().collect();
        assert_eq!(keys, vec![CALORIE_LIMIT_KEY]);
    }

    #[test]
    fn reload_reproduces_state() {
        let mut ledger = empty();
        ledger.set_limit(2400.0);
        let oats = ledger.new_item("Oats", 350.5);
        ledger.add_meal(oats);
        let bike = ledger.new_item("Bike", 500.0);
        ledger.add_workout(bike);

        let meals = ledger.meals().to_vec();
        let workouts = ledger.workouts().to_vec();
        let reloaded = Ledger::load(ledger.into_store());

        assert_eq!(reloaded.calorie_limit(), 2400.0);
        assert_eq!(reloaded.calorie_balance(), -149.5);
        assert_eq!(reloaded.meals(), meals.as_slice());
        assert_eq!(reloaded.workouts(), workouts.as_slice());
    }

    #[test]
    fn load_repairs_a_stale_balance() {
        let mut store = LocalStorage::new();
        store.set("meal", r#"[{"id":1,"name":"Rice","calories":400}]"#.to_string());
        store.set(CALORIE_BALANCE_KEY, "9999".to_string());

        let ledger = Ledger::load(store);
        assert_eq!(ledger.calorie_balance(), 400.0);
        assert_eq!(ledger.store().get(CALORIE_BALANCE_KEY).as_deref(), Some("400"));
    }

    #[test]
    fn fractional_item_survives_the_next_write() {
        let mut store = LocalStorage::new();
        store.set(
            "meal",
            r#"[{"id":1,"name":"Eggs","calories":300},{"id":2,"name":"Mint","calories":2.5}]"#
                .to_string(),
        );
        let mut ledger = Ledger::load(store);
        assert_eq!(ledger.calorie_balance(), 302.5);

        let toast = ledger.new_item("Toast", 90.0);
        ledger.add_meal(toast);

        let reloaded = Ledger::load(ledger.into_store());
        let names: Vec<&str> = reloaded.meals().iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["Eggs", "Mint", "Toast"]);
        assert_eq!(reloaded.calorie_balance(), 392.5);
    }

    #[test]
    fn new_items_never_collide_with_loaded_ids() {
        let future = chrono::Utc::now().timestamp_millis() + 60_000;
        let mut store = LocalStorage::new();
        store.set(
            "workout",
            format!(r#"[{{"id":{future},"name":"Row","calories":100}}]"#),
        );
        let mut ledger = Ledger::load(store);
        let item = ledger.new_item("Row again", 100.0);
        assert!(item.id > future);
    }

    #[test]
    fn maximal_stored_id_does_not_panic() {
        let mut store = LocalStorage::new();
        store.set(
            "meal",
            format!(r#"[{{"id":{},"name":"X","calories":1}}]"#, i64::MAX),
        );
        let mut ledger = Ledger::load(store);
        let item = ledger.new_item("Y", 1.0);
        assert_eq!(item.id, i64::MAX);
        ledger.add_meal(item);
        assert_eq!(ledger.calorie_balance(), 2.0);
    }

    #[test]
    fn progress_levels_follow_thresholds() {
        let mut ledger = empty();
        ledger.set_limit(1000.0);
        assert_eq!(ledger.progress().level, ProgressLevel::Under);

        let lunch = ledger.new_item("Lunch", 700.0);
        ledger.add_meal(lunch);
        let progress = ledger.progress();
        assert_eq!(progress.percent, 70.0);
        assert_eq!(progress.level, ProgressLevel::Near);

        let dinner = ledger.new_item("Dinner", 300.0);
        ledger.add_meal(dinner);
        assert_eq!(ledger.progress().level, ProgressLevel::Near);

        let snack = ledger.new_item("Snack", 1.0);
        ledger.add_meal(snack);
        let progress = ledger.progress();
        assert_eq!(progress.level, ProgressLevel::Over);
        assert_eq!(progress.percent, 100.1);
        assert_eq!(progress.width, 100.0);
    }

    #[test]
    fn progress_rounds_and_floors_width() {
        let mut ledger = empty();
        ledger.set_limit(3.0);
        let bite = ledger.new_item("Bite", 1.0);
        ledger.add_meal(bite);
        assert_eq!(ledger.progress().percent, 33.33);

        let mut ledger = empty();
        let hike = ledger.new_item("Hike", 500.0);
        ledger.add_workout(hike);
        let progress = ledger.progress();
        assert_eq!(progress.percent, -25.0);
        assert_eq!(progress.width, 0.0);
        assert_eq!(progress.level, ProgressLevel::Under);
    }

    #[test]
    fn zero_limit_reports_zero_progress() {
        let mut ledger = empty();
        ledger.set_limit(0.0);
        let apple = ledger.new_item("Apple", 80.0);
        ledger.add_meal(apple);
        assert_eq!(ledger.progress().percent, 0.0);
    }

    #[test]
    fn filter_is_case_insensitive_and_ordered() {
        let mut ledger = empty();
        for name in ["Chicken Salad", "Pasta", "salad bowl"] {
            let item = ledger.new_item(name, 100.0);
            ledger.add_meal(item);
        }

        let names: Vec<String> = ledger
            .filter(ItemKind::Meal, "SALAD")
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["Chicken Salad", "salad bowl"]);
        assert_eq!(ledger.filter(ItemKind::Meal, "").len(), 3);
        assert_eq!(ledger.filter(ItemKind::Meal, "salad ").len(), 1);
        assert!(ledger.filter(ItemKind::Workout, "salad").is_empty());
    }
}
