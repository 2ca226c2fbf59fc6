use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantArray};
use time::{Date, OffsetDateTime, PrimitiveDateTime, macros::format_description};
use validator::Validate;

#[derive(
    EnumString,
    VariantArray,
    Display,
    AsRefStr,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    #[default]
    Lunch,
    Dinner,
}

/// Formats a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub fn parse_date(value: &str) -> crate::Result<Date> {
    Ok(Date::parse(value, format_description!("[year]-[month]-[day]"))?)
}

/// Anything that falls on a calendar day.
pub trait AsDay {
    fn day(&self) -> Date;
}

impl AsDay for Date {
    fn day(&self) -> Date {
        *self
    }
}

impl AsDay for PrimitiveDateTime {
    fn day(&self) -> Date {
        self.date()
    }
}

impl AsDay for OffsetDateTime {
    fn day(&self) -> Date {
        self.date()
    }
}

/// Identity of a (day, meal) cell on the board.
///
/// The string form `{date}_{meal}` is the join key shared by the drag engine,
/// the store and the remote association.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub date: Date,
    pub meal_type: MealType,
}

impl SlotKey {
    pub fn new(date: Date, meal_type: MealType) -> Self {
        Self { date, meal_type }
    }

    pub fn at(at: impl AsDay, meal_type: MealType) -> Self {
        Self::new(at.day(), meal_type)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", format_date(self.date), self.meal_type)
    }
}

impl FromStr for SlotKey {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((date, meal_type)) = s.rsplit_once('_') else {
            crate::bail!("invalid slot key '{s}'");
        };

        Ok(Self::new(parse_date(date)?, meal_type.parse()?))
    }
}

/// Stable string key for a slot. Time of day is discarded.
pub fn slot_key(at: impl AsDay, meal_type: MealType) -> String {
    SlotKey::at(at, meal_type).to_string()
}

/// Saved recipe card shown next to the board.
#[derive(Validate, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RecipeSummary {
    #[validate(length(min = 1, message = "recipe id is required"))]
    pub recipe_id: String,
    pub title: String,
    pub image_url: Option<String>,
}

impl RecipeSummary {
    pub fn new(recipe_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            recipe_id: recipe_id.into(),
            title: title.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MealPlanEntry {
    pub recipe_id: String,
    pub display_name: String,
    pub image_url: Option<String>,
    /// Id of the persisted association, `None` while the write is in flight.
    pub remote_association_id: Option<String>,
    pub is_pending: bool,
}

impl MealPlanEntry {
    pub fn pending(recipe: &RecipeSummary) -> Self {
        Self {
            recipe_id: recipe.recipe_id.to_owned(),
            display_name: recipe.title.to_owned(),
            image_url: recipe.image_url.to_owned(),
            remote_association_id: None,
            is_pending: true,
        }
    }

    pub fn confirm(&mut self, association_id: impl Into<String>) {
        self.remote_association_id = Some(association_id.into());
        self.is_pending = false;
    }
}

/// Inclusive window of days.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> crate::Result<Self> {
        if start > end {
            crate::bail!(
                "range start {} is after end {}",
                format_date(start),
                format_date(end)
            );
        }

        Ok(Self { start, end })
    }

    pub fn day(date: Date) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Canonical key used to detect an already satisfied range.
    pub fn key(&self) -> String {
        format!("{}..{}", format_date(self.start), format_date(self.end))
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = Date> + '_ {
        let mut next = Some(self.start);
        std::iter::from_fn(move || {
            let current = next.filter(|d| *d <= self.end)?;
            next = current.next_day();
            Some(current)
        })
    }
}
