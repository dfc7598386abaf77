//! In-memory car store.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::model::{Car, Color, NewCar};

/// Id → car, in insertion order.
///
/// A cheap handle: clones share the same cars. Every operation takes the
/// lock once, so operations are atomic with respect to each other.
#[derive(Clone, Debug, Default)]
pub struct CarRegistry {
    cars: Arc<RwLock<IndexMap<String, Car>>>,
}

impl CarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, id: &str) -> bool {
        self.cars.read().contains_key(id)
    }

    /// Inserts `car`, replacing any car with the same id.
    pub fn upsert(&self, car: Car) -> Car {
        self.cars.write().insert(car.id.clone(), car.clone());
        car
    }

    pub fn get(&self, id: &str) -> Option<Car> {
        self.cars.read().get(id).cloned()
    }

    /// Every car whose color is in `colors`; every car when `colors` is empty.
    pub fn get_all(&self, colors: &[Color]) -> Vec<Car> {
        self.cars
            .read()
            .values()
            .filter(|car| colors.is_empty() || colors.contains(&car.color))
            .cloned()
            .collect()
    }

    /// `true` if a car was removed.
    pub fn delete(&self, id: &str) -> bool {
        self.cars.write().shift_remove(id).is_some()
    }

    /// Stores `car` under a freshly generated id.
    pub fn create(&self, car: NewCar) -> Car {
        self.upsert(car.with_id(Uuid::new_v4().to_string()))
    }

    /// Replaces the data of an existing car. `None`, and nothing stored, if
    /// `id` is unknown.
    pub fn replace(&self, id: &str, car: NewCar) -> Option<Car> {
        let mut cars = self.cars.write();
        let slot = cars.get_mut(id)?;
        *slot = car.with_id(id);
        Some(slot.clone())
    }

    pub fn len(&self) -> usize {
        self.cars.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn payload(color: Color, nick_name: Option<&str>) -> NewCar {
        NewCar {
            color,
            production_year: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            nick_name: nick_name.map(str::to_owned),
        }
    }

    #[test]
    fn create_generates_distinct_ids() {
        let store = CarRegistry::new();
        let a = store.create(payload(Color::Red, None));
        let b = store.create(payload(Color::Red, None));
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
        assert_eq!(store.get(&a.id), Some(a));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn upsert_inserts_then_replaces() {
        let store = CarRegistry::new();
        store.upsert(payload(Color::Red, None).with_id("1"));
        store.upsert(payload(Color::Blue, None).with_id("1"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("1").map(|c| c.color), Some(Color::Blue));
    }

    #[test]
    fn get_all_filters_by_color_in_insertion_order() {
        let store = CarRegistry::new();
        let red = store.create(payload(Color::Red, None));
        let blue = store.create(payload(Color::Blue, None));
        let green = store.create(payload(Color::Green, None));

        assert_eq!(store.get_all(&[]), vec![red.clone(), blue.clone(), green]);
        assert_eq!(store.get_all(&[Color::Blue, Color::Red]), vec![red, blue]);
        assert!(store.get_all(&[Color::Beige]).is_empty());
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let store = CarRegistry::new();
        let car = store.create(payload(Color::Black, None));
        assert!(store.delete(&car.id));
        assert!(!store.delete(&car.id));
        assert!(!store.exists(&car.id));
        assert!(store.is_empty());
    }

    #[test]
    fn replace_only_touches_existing_cars() {
        let store = CarRegistry::new();
        assert_eq!(store.replace("missing", payload(Color::Red, None)), None);
        assert!(store.is_empty());

        let car = store.create(payload(Color::White, Some("Snowy")));
        let replaced = store.replace(&car.id, payload(Color::Yellow, None)).unwrap();
        assert_eq!(replaced.id, car.id);
        assert_eq!(replaced.color, Color::Yellow);
        assert_eq!(replaced.nick_name, None);
        assert_eq!(store.get(&car.id), Some(replaced));
    }

    #[test]
    fn clones_share_the_same_cars() {
        let store = CarRegistry::new();
        let handle = store.clone();
        let car = handle.create(payload(Color::Green, None));
        assert!(store.exists(&car.id));
    }
}
