// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Business hours and holidays from the `[business_hours]` config section.

use std::collections::HashSet;

use atenea_config::model::{BusinessHoursConfig, DayOfWeek};
use atenea_core::{AteneaError, BusinessCalendar};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};

#[derive(Debug, Clone)]
struct Window {
    day: Weekday,
    start: NaiveTime,
    end: NaiveTime,
}

/// Calendar evaluated in a fixed local offset.
#[derive(Debug, Clone)]
pub struct ConfigCalendar {
    enabled: bool,
    offset: FixedOffset,
    windows: Vec<Window>,
    holidays: HashSet<NaiveDate>,
}

impl ConfigCalendar {
    pub fn from_config(config: &BusinessHoursConfig) -> Result<Self, AteneaError> {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).ok_or_else(|| {
            AteneaError::Config(format!(
                "business_hours.utc_offset_minutes {} is out of range",
                config.utc_offset_minutes
            ))
        })?;

        let windows = config
            .days
            .iter()
            .map(|day| {
                Ok(Window {
                    day: weekday(day.day),
                    start: parse_time(&day.start)?,
                    end: parse_time(&day.end)?,
                })
            })
            .collect::<Result<Vec<_>, AteneaError>>()?;

        let holidays = config
            .holidays
            .iter()
            .map(|h| {
                NaiveDate::parse_from_str(h, "%Y-%m-%d").map_err(|e| {
                    AteneaError::Config(format!("business_hours holiday `{h}` is invalid: {e}"))
                })
            })
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(Self {
            enabled: config.enabled,
            offset,
            windows,
            holidays,
        })
    }
}

impl BusinessCalendar for ConfigCalendar {
    fn is_open(&self, at: DateTime<Utc>) -> bool {
        if !self.enabled {
            return true;
        }
        let local = at.with_timezone(&self.offset);
        if self.holidays.contains(&local.date_naive()) {
            return false;
        }
        let time = local.time();
        self.windows
            .iter()
            .any(|w| w.day == local.weekday() && w.start <= time && time < w.end)
    }
}

fn parse_time(value: &str) -> Result<NaiveTime, AteneaError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| AteneaError::Config(format!("business_hours time `{value}` is invalid: {e}")))
}

fn weekday(day: DayOfWeek) -> Weekday {
    match day {
        DayOfWeek::Monday => Weekday::Mon,
        DayOfWeek::Tuesday => Weekday::Tue,
        DayOfWeek::Wednesday => Weekday::Wed,
        DayOfWeek::Thursday => Weekday::Thu,
        DayOfWeek::Friday => Weekday::Fri,
        DayOfWeek::Saturday => Weekday::Sat,
        DayOfWeek::Sunday => Weekday::Sun,
    }
}
