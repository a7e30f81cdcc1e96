//! Maps raw source records onto the canonical [`Review`] shape.
//!
//! Nothing here returns an error: a missing or malformed field becomes
//! `None` (or is dropped from `categories`) and an unparseable date is
//! forwarded as-is, so one bad record never sinks a batch.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::models::{Review, LOCAL_CHANNEL, REMOTE_CHANNEL};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%b %d, %Y"];

const REMOTE_STATUS: &str = "published";

/// Normalizes one record of the local dataset, which wraps the review in a
/// `result` object.
pub fn normalize_local(raw: &Value) -> Review {
    let result = raw.get("result").filter(|value| value.is_object());
    let field = |key: &str| result.and_then(|value| value.get(key));

    Review {
        id: field("id").and_then(as_integer),
        listing: field("listingName").and_then(as_text),
        review_type: field("type").and_then(as_text),
        channel: LOCAL_CHANNEL.to_string(),
        date: field("submittedAt").and_then(normalize_date),
        review_text: field("publicReview").and_then(as_text),
        categories: field("reviewCategory")
            .map(collect_categories)
            .unwrap_or_default(),
        rating: field("rating").and_then(as_integer),
        status: field("status").and_then(as_text),
        guest_name: field("guestName").and_then(as_text),
    }
}

/// Normalizes the `index`-th review of a place-details response. Ids are
/// negative and 1-based so they cannot collide with local dataset ids; they
/// are only unique within a single response.
pub fn normalize_remote(raw: &Value, index: usize) -> Review {
    let field = |key: &str| raw.get(key);
    let date = field("relative_time_description")
        .and_then(as_text)
        .filter(|text| !text.trim().is_empty())
        .or_else(|| field("time").and_then(as_text));

    Review {
        id: Some(-(index as i64) - 1),
        listing: None,
        review_type: None,
        channel: REMOTE_CHANNEL.to_string(),
        date,
        review_text: field("text").and_then(as_text),
        categories: BTreeMap::new(),
        rating: field("rating").and_then(as_integer),
        status: Some(REMOTE_STATUS.to_string()),
        guest_name: field("author_name").and_then(as_text),
    }
}

/// Best-effort conversion to `YYYY-MM-DDTHH:MM:SS`. Datetime strings are
/// tried before the epoch-seconds fallback; anything else passes through.
pub fn normalize_date(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(normalize_date_text(text)),
        Value::Number(number) => {
            let formatted = number
                .as_i64()
                .or_else(|| number.as_f64().map(|secs| secs.trunc() as i64))
                .and_then(format_epoch);
            Some(formatted.unwrap_or_else(|| number.to_string()))
        }
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

pub fn normalize_date_text(text: &str) -> String {
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return parsed.format(ISO_FORMAT).to_string();
        }
    }
    for format in DATE_FORMATS {
        if let Some(parsed) = NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return parsed.format(ISO_FORMAT).to_string();
        }
    }
    text.trim()
        .parse::<i64>()
        .ok()
        .and_then(format_epoch)
        .unwrap_or_else(|| text.to_string())
}

fn format_epoch(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc().format(ISO_FORMAT).to_string())
}

fn collect_categories(value: &Value) -> BTreeMap<String, i64> {
    let mut categories = BTreeMap::new();
    let Some(entries) = value.as_array() else {
        return categories;
    };
    for entry in entries {
        let category = entry.get("category").and_then(Value::as_str);
        let rating = entry.get("rating").and_then(as_integer);
        if let (Some(category), Some(rating)) = (category, rating) {
            categories.insert(category.to_string(), rating);
        }
    }
    categories
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.fract() == 0.0)
                .map(|float| float as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
