//! A module to build ICal files

use chrono::Utc;
use ics::components::{Parameter, Property};
use ics::properties::{
    Categories, Completed, Created, Description, Due, LastModified, Priority, RRule, Status,
    Summary, Trigger,
};
use ics::{Alarm, ICalendar, ToDo};

use crate::task::{Task, TaskLocation, TaskStatus};

/// Build a complete calendar document containing exactly one task component.
///
/// Creation/modification/DTSTAMP fields are stamped to now (UTC); a completion timestamp is
/// written only when the task status is `COMPLETED`.
pub fn build_new(task: &Task) -> String {
    let now = super::format_date_time(&Utc::now());

    let mut todo = ToDo::new(task.uid.clone(), now.clone());
    todo.push(Created::new(now.clone()));
    todo.push(LastModified::new(now.clone()));
    todo.push(Summary::new(super::escape_text(&task.title)));

    if let Some(description) = &task.description {
        todo.push(Description::new(super::escape_text(description)));
    }

    if let Some(due) = &task.due {
        let mut due_prop = Due::new(super::format_date(due));
        due_prop.add(Parameter::new("VALUE", "DATE"));
        todo.push(due_prop);
    }

    todo.push(Priority::new(task.priority.to_string()));

    if task.tags.is_empty() == false {
        let joined = task
            .tags
            .iter()
            .map(|tag| super::escape_text(tag))
            .collect::<Vec<_>>()
            .join(",");
        todo.push(Categories::new(joined));
    }

    todo.push(match task.status {
        TaskStatus::NeedsAction => Status::needs_action(),
        TaskStatus::InProcess => Status::in_process(),
        TaskStatus::Completed => Status::completed(),
        TaskStatus::Cancelled => Status::cancelled(),
    });

    if let Some(rule) = &task.recurrence {
        todo.push(RRule::new(crate::recur::normalize_rule(rule).to_string()));
    }

    if task.is_completed() {
        let completed_on = task
            .completed
            .map(|dt| super::format_date_time(&dt))
            .unwrap_or(now);
        todo.push(Completed::new(completed_on));
    }

    if let Some(location) = &task.location_alarm {
        todo.add_alarm(build_proximity_alarm(location));
    }

    let mut calendar = ICalendar::new("2.0", super::default_prod_id());
    calendar.add_todo(todo);

    calendar.to_string()
}

/// Build the vendor proximity `VALARM`.
///
/// The trigger is a fixed historical instant used as a magic marker rather than a real alarm
/// time; geofencing clients require it. Only `ARRIVE`/`DEPART` alarms with known coordinates
/// get a structured location.
fn build_proximity_alarm(location: &TaskLocation) -> Alarm<'static> {
    let mut trigger = Trigger::new(super::PROXIMITY_SENTINEL_TRIGGER);
    trigger.add(Parameter::new("VALUE", "DATE-TIME"));

    let mut alarm = Alarm::display(trigger, Description::new("Reminder"));
    alarm.push(Property::new(
        super::PROXIMITY_MARKER,
        location.proximity.to_ical(),
    ));

    if let Some((lat, lng)) = location.coordinates() {
        let mut structured = Property::new(super::STRUCTURED_LOCATION, format!("geo:{},{}", lat, lng));
        structured.add(Parameter::new("VALUE", "URI"));
        structured.add(Parameter::new("X-TITLE", quote_param(&location.title)));
        structured.add(Parameter::new("X-ADDRESS", quote_param(&location.address)));
        structured.add(Parameter::new(
            super::RADIUS_PARAM,
            super::DEFAULT_RADIUS_M.to_string(),
        ));
        alarm.push(structured);
    }

    alarm
}

/// Quote a parameter value when it contains characters that would end the parameter early
pub(crate) fn quote_param(value: &str) -> String {
    if value.contains(',') || value.contains(';') || value.contains(':') {
        format!("\"{}\"", value.replace('"', ""))
    } else {
        value.to_string()
    }
}
