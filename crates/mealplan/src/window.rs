use imkitchen_shared::{Result, mealplan::DateRange};
use serde::Deserialize;
use strum::{AsRefStr, Display, EnumString, VariantArray};
use time::{Date, Duration, OffsetDateTime};
use time_tz::{ToTimezone, timezones};

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
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BoardView {
    Daily,
    #[default]
    Weekly,
}

/// Today's date in the given IANA timezone, UTC when unknown.
pub fn today(tz: &str) -> Date {
    let mut now = OffsetDateTime::now_utc();

    if let Some(tz) = timezones::get_by_name(tz) {
        now = now.to_timezone(tz);
    }

    now.date()
}

pub fn is_known_timezone(tz: &str) -> bool {
    timezones::get_by_name(tz).is_some()
}

/// Monday to Sunday week containing `date`. Fails when the week runs past
/// the supported calendar.
pub fn week_of(date: Date) -> Result<DateRange> {
    let from_monday = Duration::days(date.weekday().number_days_from_monday() as i64);
    let Some(start) = date.checked_sub(from_monday) else {
        imkitchen_shared::bail!("week of {date} starts before the first supported date");
    };
    let Some(end) = start.checked_add(Duration::days(6)) else {
        imkitchen_shared::bail!("week of {date} ends after the last supported date");
    };

    Ok(DateRange { start, end })
}

/// Days shown by the board for `view` around `anchor`.
pub fn window(view: BoardView, anchor: Date) -> Result<DateRange> {
    match view {
        BoardView::Daily => Ok(DateRange::day(anchor)),
        BoardView::Weekly => week_of(anchor),
    }
}

/// Anchor of the window `offset` windows away (negative goes back).
pub fn shift(view: BoardView, anchor: Date, offset: i64) -> Result<Date> {
    let days = match view {
        BoardView::Daily => Some(offset),
        BoardView::Weekly => offset.checked_mul(7),
    };

    // Duration::days panics past i64::MAX seconds.
    let Some(shifted) = days
        .filter(|days| days.checked_mul(86_400).is_some())
        .and_then(|days| anchor.checked_add(Duration::days(days)))
    else {
        imkitchen_shared::bail!("cannot move {offset} {view} windows from {anchor}");
    };

    Ok(shifted)
}
