//! A module to parse ICal files

use ical::parser::ical::component::{IcalAlarm, IcalTodo};
use ical::property::Property;

use crate::task::{Proximity, Task, TaskLocation, TaskStatus};

/// Parse a raw calendar object into a [`Task`].
///
/// Returns `None` for anything that is not a usable task: no VTODO component, a missing or
/// empty UID or SUMMARY, or data the iCal parser chokes on. This is a sentinel, not a hard
/// error: decoding one malformed item must never abort processing of the rest, so failures
/// are logged and swallowed here.
pub fn parse(content: &str) -> Option<Task> {
    let mut reader = ical::IcalParser::new(content.as_bytes());
    let calendar = match reader.next() {
        None => return None,
        Some(Err(err)) => {
            log::warn!("Unable to parse iCal data: {}", err);
            return None;
        }
        Some(Ok(calendar)) => calendar,
    };

    let todo = match calendar.todos.first() {
        None => return None,
        Some(todo) => todo,
    };

    parse_todo(todo)
}

fn parse_todo(todo: &IcalTodo) -> Option<Task> {
    let uid = text_value(&todo.properties, "UID")?;
    let title = text_value(&todo.properties, "SUMMARY")?;
    if uid.is_empty() || title.is_empty() {
        return None;
    }

    let description = text_value(&todo.properties, "DESCRIPTION").filter(|d| d.is_empty() == false);

    // DUE may be a date or a date-time; only the date part is kept
    let due = prop_value(&todo.properties, "DUE").and_then(super::parse_date_value);

    // A bare COMPLETED date is promoted to midnight UTC
    let completed = prop_value(&todo.properties, "COMPLETED").and_then(super::parse_date_time_value);

    let priority = prop_value(&todo.properties, "PRIORITY")
        .and_then(|p| p.trim().parse::<u8>().ok())
        .unwrap_or(0);

    let status = prop_value(&todo.properties, "STATUS")
        .map(TaskStatus::from_ical)
        .unwrap_or_default();

    let recurrence = prop_value(&todo.properties, "RRULE").map(|r| r.to_string());

    let tags = parse_categories(&todo.properties);

    let location_alarm = todo.alarms.iter().find_map(parse_proximity_alarm);

    Some(Task {
        uid,
        title,
        description,
        due,
        priority,
        tags,
        status,
        recurrence,
        completed,
        location_alarm,
    })
}

/// Flatten the CATEGORIES representation(s) into one ordered tag list.
///
/// Servers vary here: some send one multi-value property, some repeat the property once per
/// category. Splitting every value on commas covers both, and doubles as a last-resort
/// fallback for representations we don't otherwise recognize.
fn parse_categories(properties: &[Property]) -> Vec<String> {
    let mut tags = Vec::new();
    for prop in properties {
        if prop.name != "CATEGORIES" {
            continue;
        }
        let value = match &prop.value {
            Some(v) => v,
            None => continue,
        };
        for tag in value.split(',') {
            let tag = super::unescape_text(tag.trim());
            if tag.is_empty() == false {
                tags.push(tag);
            }
        }
    }
    tags
}

/// Extract a proximity alarm from a `VALARM`, if it carries the vendor marker.
///
/// Coordinates are parsed defensively: a malformed `geo:` payload yields a location without
/// coordinates, not a decode failure.
fn parse_proximity_alarm(alarm: &IcalAlarm) -> Option<TaskLocation> {
    let marker = prop_value(&alarm.properties, super::PROXIMITY_MARKER)?;
    let proximity = Proximity::from_ical(marker);

    // CarPlay triggers carry no location payload at all
    if proximity == Proximity::Connect || proximity == Proximity::Disconnect {
        return Some(TaskLocation::carplay(proximity));
    }

    let structured = alarm
        .properties
        .iter()
        .find(|p| p.name == super::STRUCTURED_LOCATION);

    let (lat, lng) = structured
        .and_then(|p| p.value.as_deref())
        .and_then(parse_geo)
        .map(|(lat, lng)| (Some(lat), Some(lng)))
        .unwrap_or((None, None));

    let title = structured
        .and_then(|p| param_value(p, "X-TITLE"))
        .filter(|t| t.is_empty() == false)
        .unwrap_or_else(|| "Location".to_string());
    let address = structured
        .and_then(|p| param_value(p, "X-ADDRESS"))
        .unwrap_or_default();

    Some(TaskLocation {
        title,
        address,
        lat,
        lng,
        proximity,
    })
}

fn parse_geo(value: &str) -> Option<(f64, f64)> {
    let coords = if value.len() >= 4 && value[..4].eq_ignore_ascii_case("geo:") {
        &value[4..]
    } else {
        return None;
    };
    let mut parts = coords.splitn(2, ',');
    let lat = parts.next()?.trim().parse::<f64>().ok()?;
    let lng = parts.next()?.trim().parse::<f64>().ok()?;
    Some((lat, lng))
}

fn prop_value<'p>(properties: &'p [Property], name: &str) -> Option<&'p str> {
    properties
        .iter()
        .find(|prop| prop.name == name)
        .and_then(|prop| prop.value.as_deref())
}

fn text_value(properties: &[Property], name: &str) -> Option<String> {
    prop_value(properties, name).map(super::unescape_text)
}

fn param_value(property: &Property, name: &str) -> Option<String> {
    property.params.as_ref().and_then(|params| {
        params
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, values)| values.first())
            .cloned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const EXAMPLE_ICAL: &str = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//Nextcloud Tasks v0.13.6
BEGIN:VTODO
UID:0633de27-8c32-42be-bcb8-63bc879c6185
CREATED:20210321T001600
LAST-MODIFIED:20210321T001600
DTSTAMP:20210321T001600
SUMMARY:Do not forget to do this
DUE;VALUE=DATE:20240110
PRIORITY:1
CATEGORIES:a, b, c
STATUS:IN-PROCESS
RRULE:FREQ=WEEKLY;INTERVAL=2
END:VTODO
END:VCALENDAR
"#;

    const EXAMPLE_ICAL_NO_SUMMARY: &str = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//Nextcloud Tasks v0.13.6
BEGIN:VTODO
UID:0633de27-8c32-42be-bcb8-63bc879c6185
DTSTAMP:20210321T001600
DUE:20240110T120000Z
END:VTODO
END:VCALENDAR
"#;

    const EXAMPLE_ICAL_REPEATED_CATEGORIES: &str = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//Test//EN
BEGIN:VTODO
UID:abc
SUMMARY:Sort the categories out
CATEGORIES:one,two
CATEGORIES:three
END:VTODO
END:VCALENDAR
"#;

    const EXAMPLE_ICAL_CARPLAY: &str = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//Test//EN
BEGIN:VTODO
UID:abc
SUMMARY:Call Mom from the car
BEGIN:VALARM
TRIGGER;VALUE=DATE-TIME:19760401T005545Z
ACTION:DISPLAY
DESCRIPTION:Reminder
X-APPLE-PROXIMITY:CONNECT
END:VALARM
END:VTODO
END:VCALENDAR
"#;

    const EXAMPLE_ICAL_GEOFENCE: &str = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//Test//EN
BEGIN:VTODO
UID:abc
SUMMARY:Buy groceries
BEGIN:VALARM
TRIGGER;VALUE=DATE-TIME:19760401T005545Z
ACTION:DISPLAY
DESCRIPTION:Reminder
X-APPLE-PROXIMITY:ARRIVE
X-APPLE-STRUCTURED-LOCATION;VALUE=URI;X-TITLE=Supermarket;X-ADDRESS=1 Market
 Square;X-APPLE-RADIUS=100:geo:48.85837,2.294481
END:VALARM
END:VTODO
END:VCALENDAR
"#;

    const EXAMPLE_ICAL_BROKEN_GEO: &str = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//Test//EN
BEGIN:VTODO
UID:abc
SUMMARY:Go somewhere
BEGIN:VALARM
TRIGGER;VALUE=DATE-TIME:19760401T005545Z
ACTION:DISPLAY
DESCRIPTION:Reminder
X-APPLE-PROXIMITY:DEPART
X-APPLE-STRUCTURED-LOCATION;VALUE=URI:geo:not-a-number
END:VALARM
END:VTODO
END:VCALENDAR
"#;

    #[test]
    fn test_ical_parsing() {
        let task = parse(EXAMPLE_ICAL).unwrap();

        assert_eq!(task.uid, "0633de27-8c32-42be-bcb8-63bc879c6185");
        assert_eq!(task.title, "Do not forget to do this");
        assert_eq!(task.due, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(task.priority, 1);
        assert_eq!(task.tags, vec!["a", "b", "c"]);
        assert_eq!(task.status, TaskStatus::InProcess);
        assert_eq!(task.recurrence.as_deref(), Some("FREQ=WEEKLY;INTERVAL=2"));
        assert_eq!(task.completed, None);
        assert!(task.location_alarm.is_none());
    }

    #[test]
    fn missing_summary_yields_absent() {
        assert!(parse(EXAMPLE_ICAL_NO_SUMMARY).is_none());
    }

    #[test]
    fn garbage_yields_absent() {
        assert!(parse("this is not a calendar").is_none());
        assert!(parse("").is_none());
    }

    #[test]
    fn datetime_due_is_truncated_to_date() {
        let raw = EXAMPLE_ICAL.replace("DUE;VALUE=DATE:20240110", "DUE:20240110T153000Z");
        let task = parse(&raw).unwrap();
        assert_eq!(task.due, NaiveDate::from_ymd_opt(2024, 1, 10));
    }

    #[test]
    fn bare_completed_date_is_midnight_utc() {
        let raw = EXAMPLE_ICAL.replace("STATUS:IN-PROCESS", "STATUS:COMPLETED\nCOMPLETED:20240105");
        let task = parse(&raw).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(
            task.completed.map(|c| super::super::format_date_time(&c)),
            Some("20240105T000000Z".to_string())
        );
    }

    #[test]
    fn repeated_categories_are_concatenated() {
        let task = parse(EXAMPLE_ICAL_REPEATED_CATEGORIES).unwrap();
        assert_eq!(task.tags, vec!["one", "two", "three"]);
    }

    #[test]
    fn defaults_for_absent_fields() {
        let task = parse(EXAMPLE_ICAL_REPEATED_CATEGORIES).unwrap();
        assert_eq!(task.priority, 0);
        assert_eq!(task.status, TaskStatus::NeedsAction);
        assert_eq!(task.due, None);
        assert_eq!(task.description, None);
    }

    #[test]
    fn unparsable_priority_defaults_to_none() {
        let raw = EXAMPLE_ICAL.replace("PRIORITY:1", "PRIORITY:high");
        let task = parse(&raw).unwrap();
        assert_eq!(task.priority, 0);
    }

    #[test]
    fn carplay_alarm() {
        let task = parse(EXAMPLE_ICAL_CARPLAY).unwrap();
        let location = task.location_alarm.unwrap();
        assert_eq!(location.title, "Getting In Car");
        assert_eq!(location.proximity, Proximity::Connect);
        assert_eq!(location.lat, None);
        assert_eq!(location.lng, None);
    }

    #[test]
    fn geofence_alarm() {
        let task = parse(EXAMPLE_ICAL_GEOFENCE).unwrap();
        let location = task.location_alarm.unwrap();
        assert_eq!(location.title, "Supermarket");
        assert_eq!(location.address, "1 MarketSquare");
        assert_eq!(location.proximity, Proximity::Arrive);
        assert_eq!(location.lat, Some(48.85837));
        assert_eq!(location.lng, Some(2.294481));
    }

    #[test]
    fn malformed_geo_payload_keeps_the_alarm() {
        let task = parse(EXAMPLE_ICAL_BROKEN_GEO).unwrap();
        let location = task.location_alarm.unwrap();
        assert_eq!(location.proximity, Proximity::Depart);
        assert_eq!(location.title, "Location");
        assert_eq!(location.coordinates(), None);
    }
}
