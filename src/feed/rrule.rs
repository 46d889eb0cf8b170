// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Syntax check for iCalendar (RFC 5545 section 3.3.10) recurrence rules.

use std::collections::BTreeSet;

use crate::error::RecurrenceError;

const FREQUENCIES: &[&str] = &[
    "SECONDLY", "MINUTELY", "HOURLY", "DAILY", "WEEKLY", "MONTHLY", "YEARLY",
];

const WEEKDAYS: &[&str] = &["SU", "MO", "TU", "WE", "TH", "FR", "SA"];

/// The parts of a recurrence rule other code cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub freq: String,
    pub interval: Option<u32>,
    pub count: Option<u32>,
    pub until: Option<String>,
}

fn positive(key: &str, value: &str) -> Result<u32, RecurrenceError> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(RecurrenceError::NotPositive {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn invalid_entry(key: &str, value: &str) -> RecurrenceError {
    RecurrenceError::InvalidEntry {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Each comma separated entry must be an integer in `min..=max`, optionally
/// signed when `signed` is set; zero is never accepted for signed lists.
fn int_list(
    key: &str,
    value: &str,
    min: i32,
    max: i32,
    signed: bool,
) -> Result<(), RecurrenceError> {
    for item in value.split(',') {
        let has_sign = item.starts_with('+') || item.starts_with('-');
        let parsed = item.parse::<i32>().ok().filter(|n| {
            if signed {
                *n != 0 && n.abs() >= min && n.abs() <= max
            } else {
                !has_sign && *n >= min && *n <= max
            }
        });
        if parsed.is_none() {
            return Err(invalid_entry(key, item));
        }
    }
    Ok(())
}

fn weekday(value: &str) -> bool {
    WEEKDAYS.contains(&value)
}

/// `[+|-][1..53]DAY`
fn weekday_num(item: &str) -> bool {
    if item.len() < 2 || !item.is_char_boundary(item.len() - 2) {
        return false;
    }
    let (ordinal, day) = item.split_at(item.len() - 2);
    if !weekday(day) {
        return false;
    }
    if ordinal.is_empty() {
        return true;
    }

    let digits = ordinal.trim_start_matches(['+', '-']);
    if ordinal.len() - digits.len() > 1 || digits.is_empty() || digits.len() > 2 {
        return false;
    }
    digits
        .parse::<u32>()
        .is_ok_and(|n| (1..=53).contains(&n))
}

/// `YYYYMMDD` or `YYYYMMDDTHHMMSS[Z]`
fn until_value(value: &str) -> bool {
    let (date, time) = match value.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (value, None),
    };
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if chrono::NaiveDate::parse_from_str(date, "%Y%m%d").is_err() {
        return false;
    }
    match time {
        None => true,
        Some(time) => {
            let time = time.strip_suffix('Z').unwrap_or(time);
            time.len() == 6
                && chrono::NaiveTime::parse_from_str(time, "%H%M%S").is_ok()
        }
    }
}

/// Validate a recurrence rule such as `FREQ=WEEKLY;INTERVAL=2;BYDAY=MO`
///
/// Keys are matched case-insensitively. `FREQ` is required, keys may
/// appear once, and `COUNT` and `UNTIL` exclude each other.
pub fn parse_rrule(rule: &str) -> Result<RecurrenceRule, RecurrenceError> {
    let rule = rule.trim();
    let rule = rule
        .strip_prefix("RRULE:")
        .or_else(|| rule.strip_prefix("rrule:"))
        .unwrap_or(rule);

    let mut seen = BTreeSet::new();
    let mut freq = None;
    let mut interval = None;
    let mut count = None;
    let mut until = None;

    for part in rule.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            return Err(RecurrenceError::NotKeyValue(part.to_string()));
        };
        let key = key.trim().to_ascii_uppercase();
        let value = value.trim().to_ascii_uppercase();

        if !seen.insert(key.clone()) {
            return Err(RecurrenceError::DuplicateKey(key));
        }
        if value.is_empty() {
            return Err(RecurrenceError::EmptyValue(key));
        }

        match key.as_str() {
            "FREQ" => {
                if !FREQUENCIES.contains(&value.as_str()) {
                    return Err(RecurrenceError::UnknownFrequency(value));
                }
                freq = Some(value);
            }
            "INTERVAL" => interval = Some(positive(&key, &value)?),
            "COUNT" => count = Some(positive(&key, &value)?),
            "UNTIL" => {
                if !until_value(&value) {
                    return Err(invalid_entry(&key, &value));
                }
                until = Some(value);
            }
            "BYSECOND" => int_list(&key, &value, 0, 60, false)?,
            "BYMINUTE" => int_list(&key, &value, 0, 59, false)?,
            "BYHOUR" => int_list(&key, &value, 0, 23, false)?,
            "BYMONTHDAY" => int_list(&key, &value, 1, 31, true)?,
            "BYYEARDAY" => int_list(&key, &value, 1, 366, true)?,
            "BYWEEKNO" => int_list(&key, &value, 1, 53, true)?,
            "BYSETPOS" => int_list(&key, &value, 1, 366, true)?,
            "BYMONTH" => int_list(&key, &value, 1, 12, false)?,
            "BYDAY" => {
                if let Some(bad) = value.split(',').find(|item| !weekday_num(item)) {
                    return Err(invalid_entry(&key, bad));
                }
            }
            "WKST" => {
                if !weekday(&value) {
                    return Err(invalid_entry(&key, &value));
                }
            }
            other => return Err(RecurrenceError::UnknownPart(other.to_string())),
        }
    }

    let freq = freq.ok_or(RecurrenceError::MissingFrequency)?;
    if count.is_some() && until.is_some() {
        return Err(RecurrenceError::CountWithUntil);
    }

    Ok(RecurrenceRule {
        freq,
        interval,
        count,
        until,
    })
}
