//! Patching existing ICal files in place.
//!
//! Replacing a remote calendar object with a freshly built document would destroy every
//! property this crate does not model (server- or device-specific metadata, vendor
//! extensions...). To avoid such lossy round-trips, the existing document is parsed into an
//! ordered property bag, only the known fields are swapped out, and the whole bag is written
//! back. "Unknown property" therefore always has a representable slot.

use std::error::Error;

use chrono::Utc;
use ical::parser::ical::component::{IcalAlarm, IcalCalendar, IcalTodo};
use ical::property::Property;

use super::builder::quote_param;
use crate::task::{Task, TaskLocation};

/// Re-encode `task` onto the raw calendar object it was decoded from.
///
/// The first VTODO component is patched field by field; every other property and
/// sub-component passes through untouched. Any prior proximity alarm is stripped before the
/// current one (if any) is added back, so toggling a location alarm off leaves no orphan.
pub fn patch(existing: &str, task: &Task) -> Result<String, Box<dyn Error>> {
    let mut reader = ical::IcalParser::new(existing.as_bytes());
    let mut calendar: IcalCalendar = match reader.next() {
        None => return Err("No iCal data to patch".into()),
        Some(Err(err)) => return Err(format!("Unable to parse iCal data to patch: {}", err).into()),
        Some(Ok(calendar)) => calendar,
    };

    let todo = match calendar.todos.first_mut() {
        None => return Err(format!("No VTODO component to patch for task {}", task.uid).into()),
        Some(todo) => todo,
    };

    patch_todo(todo, task);

    Ok(write_calendar(&calendar))
}

fn patch_todo(todo: &mut IcalTodo, task: &Task) {
    let now = super::format_date_time(&Utc::now());

    set_value(&mut todo.properties, "SUMMARY", super::escape_text(&task.title));

    match &task.description {
        Some(description) => {
            set_value(&mut todo.properties, "DESCRIPTION", super::escape_text(description))
        }
        None => remove_all(&mut todo.properties, "DESCRIPTION"),
    }

    match &task.due {
        Some(due) => set_value_with_params(
            &mut todo.properties,
            "DUE",
            super::format_date(due),
            vec![("VALUE".to_string(), vec!["DATE".to_string()])],
        ),
        None => remove_all(&mut todo.properties, "DUE"),
    }

    set_value(&mut todo.properties, "PRIORITY", task.priority.to_string());

    if task.tags.is_empty() {
        remove_all(&mut todo.properties, "CATEGORIES");
    } else {
        let joined = task
            .tags
            .iter()
            .map(|tag| super::escape_text(tag))
            .collect::<Vec<_>>()
            .join(",");
        // Collapse however many CATEGORIES properties the server sent into a single one
        set_value(&mut todo.properties, "CATEGORIES", joined);
        remove_extra(&mut todo.properties, "CATEGORIES");
    }

    set_value(&mut todo.properties, "STATUS", task.status.to_ical().to_string());

    if task.is_completed() {
        let completed_on = task
            .completed
            .map(|dt| super::format_date_time(&dt))
            .unwrap_or_else(|| now.clone());
        set_value(&mut todo.properties, "COMPLETED", completed_on);
    } else {
        remove_all(&mut todo.properties, "COMPLETED");
    }

    match &task.recurrence {
        Some(rule) => set_value(
            &mut todo.properties,
            "RRULE",
            crate::recur::normalize_rule(rule).to_string(),
        ),
        None => remove_all(&mut todo.properties, "RRULE"),
    }

    set_value(&mut todo.properties, "LAST-MODIFIED", now);

    // At most one proximity alarm is expected; strip whatever is there before adding the
    // current one back. Alarms without the vendor marker are none of our business.
    todo.alarms
        .retain(|alarm| has_property(&alarm.properties, super::PROXIMITY_MARKER) == false);
    if let Some(location) = &task.location_alarm {
        todo.alarms.push(build_proximity_alarm(location));
    }
}

fn build_proximity_alarm(location: &TaskLocation) -> IcalAlarm {
    let mut properties = vec![
        property(
            "TRIGGER",
            super::PROXIMITY_SENTINEL_TRIGGER,
            vec![("VALUE".to_string(), vec!["DATE-TIME".to_string()])],
        ),
        property_plain("ACTION", "DISPLAY"),
        property_plain("DESCRIPTION", "Reminder"),
        property_plain(super::PROXIMITY_MARKER, location.proximity.to_ical()),
    ];

    if let Some((lat, lng)) = location.coordinates() {
        properties.push(property(
            super::STRUCTURED_LOCATION,
            &format!("geo:{},{}", lat, lng),
            vec![
                ("VALUE".to_string(), vec!["URI".to_string()]),
                ("X-TITLE".to_string(), vec![location.title.clone()]),
                ("X-ADDRESS".to_string(), vec![location.address.clone()]),
                (
                    super::RADIUS_PARAM.to_string(),
                    vec![super::DEFAULT_RADIUS_M.to_string()],
                ),
            ],
        ));
    }

    IcalAlarm { properties }
}

fn property(name: &str, value: &str, params: Vec<(String, Vec<String>)>) -> Property {
    Property {
        name: name.to_string(),
        params: Some(params),
        value: Some(value.to_string()),
    }
}

fn property_plain(name: &str, value: &str) -> Property {
    Property {
        name: name.to_string(),
        params: None,
        value: Some(value.to_string()),
    }
}

fn has_property(properties: &[Property], name: &str) -> bool {
    properties.iter().any(|prop| prop.name == name)
}

/// Replace the value of the first property with that name, keeping its position and its
/// parameters; append the property if it does not exist yet
fn set_value(properties: &mut Vec<Property>, name: &str, value: String) {
    match properties.iter_mut().find(|prop| prop.name == name) {
        Some(prop) => prop.value = Some(value),
        None => properties.push(Property {
            name: name.to_string(),
            params: None,
            value: Some(value),
        }),
    }
}

/// Same as [`set_value`], but the parameters are ours to dictate (e.g. `DUE;VALUE=DATE`
/// replacing a date-time due)
fn set_value_with_params(
    properties: &mut Vec<Property>,
    name: &str,
    value: String,
    params: Vec<(String, Vec<String>)>,
) {
    match properties.iter_mut().find(|prop| prop.name == name) {
        Some(prop) => {
            prop.value = Some(value);
            prop.params = Some(params);
        }
        None => properties.push(Property {
            name: name.to_string(),
            params: Some(params),
            value: Some(value),
        }),
    }
}

fn remove_all(properties: &mut Vec<Property>, name: &str) {
    properties.retain(|prop| prop.name != name);
}

/// Remove every occurrence but the first
fn remove_extra(properties: &mut Vec<Property>, name: &str) {
    let mut seen = false;
    properties.retain(|prop| {
        if prop.name != name {
            return true;
        }
        if seen {
            false
        } else {
            seen = true;
            true
        }
    });
}

//
// Serialization of the property bag back to an iCal file
//

fn write_calendar(calendar: &IcalCalendar) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCALENDAR");
    write_properties(&mut out, &calendar.properties);

    for timezone in &calendar.timezones {
        push_line(&mut out, "BEGIN:VTIMEZONE");
        write_properties(&mut out, &timezone.properties);
        for transition in &timezone.transitions {
            // The transition type is a fieldless enum whose variants are named after their
            // iCal counterparts (STANDARD/DAYLIGHT)
            let kind = format!("{:?}", transition.transition);
            push_line(&mut out, &format!("BEGIN:{}", kind));
            write_properties(&mut out, &transition.properties);
            push_line(&mut out, &format!("END:{}", kind));
        }
        push_line(&mut out, "END:VTIMEZONE");
    }

    for event in &calendar.events {
        push_line(&mut out, "BEGIN:VEVENT");
        write_properties(&mut out, &event.properties);
        write_alarms(&mut out, &event.alarms);
        push_line(&mut out, "END:VEVENT");
    }

    for todo in &calendar.todos {
        push_line(&mut out, "BEGIN:VTODO");
        write_properties(&mut out, &todo.properties);
        write_alarms(&mut out, &todo.alarms);
        push_line(&mut out, "END:VTODO");
    }

    for journal in &calendar.journals {
        push_line(&mut out, "BEGIN:VJOURNAL");
        write_properties(&mut out, &journal.properties);
        push_line(&mut out, "END:VJOURNAL");
    }

    for free_busy in &calendar.free_busys {
        push_line(&mut out, "BEGIN:VFREEBUSY");
        write_properties(&mut out, &free_busy.properties);
        push_line(&mut out, "END:VFREEBUSY");
    }

    write_alarms(&mut out, &calendar.alarms);

    push_line(&mut out, "END:VCALENDAR");
    out
}

fn write_alarms(out: &mut String, alarms: &[IcalAlarm]) {
    for alarm in alarms {
        push_line(out, "BEGIN:VALARM");
        write_properties(out, &alarm.properties);
        push_line(out, "END:VALARM");
    }
}

fn write_properties(out: &mut String, properties: &[Property]) {
    for prop in properties {
        let mut line = prop.name.clone();
        if let Some(params) = &prop.params {
            for (key, values) in params {
                line.push(';');
                line.push_str(key);
                line.push('=');
                let quoted = values
                    .iter()
                    .map(|value| quote_param(value))
                    .collect::<Vec<_>>()
                    .join(",");
                line.push_str(&quoted);
            }
        }
        line.push(':');
        if let Some(value) = &prop.value {
            line.push_str(value);
        }
        push_line(out, &line);
    }
}

/// Content lines are folded at 75 octets (RFC5545 §3.1), splitting on char boundaries
fn push_line(out: &mut String, line: &str) {
    const LIMIT: usize = 75;

    let mut remaining = line;
    let mut width = LIMIT;
    let mut first = true;
    while remaining.len() > width {
        let mut split = width;
        while remaining.is_char_boundary(split) == false {
            split -= 1;
        }
        if first == false {
            out.push(' ');
        }
        out.push_str(&remaining[..split]);
        out.push_str("\r\n");
        remaining = &remaining[split..];
        // Continuation lines start with a space, which counts against the limit
        width = LIMIT - 1;
        first = false;
    }
    if first == false {
        out.push(' ');
    }
    out.push_str(remaining);
    out.push_str("\r\n");
}
