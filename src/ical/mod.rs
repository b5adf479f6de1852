//! This module handles conversion between iCal files and internal representations
//!
//! It is a wrapper around different Rust third-party libraries, since I haven't find any complete library that is able to parse _and_ generate iCal files

mod parser;
pub use parser::parse;
mod builder;
pub use builder::build_new;
mod patcher;
pub use patcher::patch;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

pub fn default_prod_id() -> String {
    format!("-//{}//{}//EN", super::ORG_NAME, super::PRODUCT_NAME)
}

/// The vendor property that marks a `VALARM` as a proximity alarm
pub const PROXIMITY_MARKER: &str = "X-APPLE-PROXIMITY";
/// The vendor property carrying the `geo:` payload of a proximity alarm
pub const STRUCTURED_LOCATION: &str = "X-APPLE-STRUCTURED-LOCATION";
/// Geofence radius parameter, in meters
pub const RADIUS_PARAM: &str = "X-APPLE-RADIUS";
pub const DEFAULT_RADIUS_M: u32 = 100;

/// The fixed trigger timestamp mobile clients expect on proximity alarms.
/// This is a magic marker, not a real alarm time: geofencing clients key on this exact
/// instant to tell location alarms apart from timed ones.
pub const PROXIMITY_SENTINEL_TRIGGER: &str = "19760401T005545Z";

pub(crate) fn format_date_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

pub(crate) fn format_date(date: &NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parse an iCal date or date-time value down to its date part
pub(crate) fn parse_date_value(value: &str) -> Option<NaiveDate> {
    let date_part = match value.find('T') {
        Some(pos) => &value[..pos],
        None => value,
    };
    NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()
}

/// Parse an iCal date-time value. A bare date is promoted to midnight UTC
pub(crate) fn parse_date_time_value(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    // Some servers omit the Z; treat the value as UTC anyway
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    parse_date_value(value).and_then(|date| {
        date.and_hms_opt(0, 0, 0)
            .map(|midnight| Utc.from_utc_datetime(&midnight))
    })
}

/// Escape a text value for serialization (RFC5545 §3.3.11)
pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// The reverse of [`escape_text`], applied to parsed property values
pub(crate) fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
