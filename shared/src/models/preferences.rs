//! Weekday-keyed maps (dinner preferences, cooking days)
//!
//! Stored as a JSON object with Danish weekday keys. The in-memory form is a
//! fixed array indexed by [`WeekDay`], so a lookup can never miss a day.

use crate::error::{AppError, AppResult};
use crate::types::{DinnerMode, WeekDay};
use chrono::NaiveDate;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One value per weekday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekDayMap<T>([T; 7]);

/// Per-weekday dinner mode of one inhabitant
pub type DinnerPreferences = WeekDayMap<DinnerMode>;

/// Which weekdays a season cooks on
pub type CookingDays = WeekDayMap<bool>;

impl<T: Copy> WeekDayMap<T> {
    /// Same value for every day
    pub fn uniform(value: T) -> Self {
        Self([value; 7])
    }

    pub fn from_fn(mut f: impl FnMut(WeekDay) -> T) -> Self {
        Self(WeekDay::ALL.map(&mut f))
    }

    pub fn get(&self, day: WeekDay) -> T {
        self.0[day.index()]
    }

    pub fn set(&mut self, day: WeekDay, value: T) {
        self.0[day.index()] = value;
    }

    /// Builder-style `set`
    pub fn with(mut self, day: WeekDay, value: T) -> Self {
        self.set(day, value);
        self
    }

    /// Value for the weekday the date falls on
    pub fn for_date(&self, date: NaiveDate) -> T {
        self.get(WeekDay::of(date))
    }

    pub fn iter(&self) -> impl Iterator<Item = (WeekDay, T)> + '_ {
        WeekDay::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

impl<T: Copy + Default> Default for WeekDayMap<T> {
    fn default() -> Self {
        Self::uniform(T::default())
    }
}

impl<T: Serialize + Copy> Serialize for WeekDayMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(7))?;
        for (day, value) in self.iter() {
            map.serialize_entry(day.key(), &value)?;
        }
        map.end()
    }
}

impl<'de, T> Deserialize<'de> for WeekDayMap<T>
where
    T: Deserialize<'de> + Copy + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<WeekDay, T>::deserialize(deserializer)?;
        let mut map = Self::default();
        for (day, value) in entries {
            map.set(day, value);
        }
        Ok(map)
    }
}

impl WeekDayMap<DinnerMode> {
    /// Parse a stored preference string, reporting every bad field
    ///
    /// `null` and the empty string mean "no preferences" (all NONE). Missing
    /// weekdays default to NONE. Unknown keys, non-string values and unknown
    /// modes are rejected with one detail entry per offending key.
    pub fn parse_preferences(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_str(trimmed).map_err(|e| {
            AppError::validation("Dinner preferences are not valid JSON")
                .with_detail("json", e.to_string())
        })?;
        let Value::Object(entries) = value else {
            return Err(AppError::validation("Dinner preferences must be a JSON object")
                .with_detail("json", "expected object"));
        };

        let mut map = Self::default();
        let mut error: Option<AppError> = None;
        let mut reject = |key: &str, msg: String| {
            let err = error
                .take()
                .unwrap_or_else(|| AppError::validation("Invalid dinner preferences"));
            error = Some(err.with_detail(key, msg));
        };

        for (key, value) in &entries {
            let Some(day) = WeekDay::from_key(key) else {
                reject(key, format!("unknown weekday '{}'", key));
                continue;
            };
            match value.as_str() {
                Some(s) => match DinnerMode::parse(s) {
                    Some(mode) => map.set(day, mode),
                    None => reject(key, format!("unknown dinner mode '{}'", s)),
                },
                None => reject(key, format!("expected a dinner mode string, got {}", value)),
            }
        }

        match error {
            Some(err) => Err(err),
            None => Ok(map),
        }
    }

    /// Storage form (always all seven keys)
    pub fn to_json(&self) -> String {
        let entries: serde_json::Map<String, Value> = self
            .iter()
            .map(|(day, mode)| (day.key().to_string(), Value::from(mode.as_str())))
            .collect();
        Value::Object(entries).to_string()
    }

    /// True when at least one weekday wants a ticket
    pub fn any_attending(&self) -> bool {
        self.0.iter().any(|m| m.is_attending())
    }
}
