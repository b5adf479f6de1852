//! To-do tasks (iCal `VTODO` items) and their sub-structures

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The tag that marks a task as a favorite.
/// This is an internal marker, not a user-facing category: display code is expected to filter it out of the visible tag list.
pub const FAV_TAG: &str = "fav";

/// RFC5545 `STATUS` values for a `VTODO`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    NeedsAction,
    InProcess,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Parse an iCal `STATUS` value.
    /// Unknown or missing values are mapped to `NEEDS-ACTION` rather than rejected
    pub fn from_ical(status: &str) -> Self {
        match status.to_uppercase().as_str() {
            "COMPLETED" => Self::Completed,
            "IN-PROCESS" => Self::InProcess,
            "CANCELLED" => Self::Cancelled,
            _ => Self::NeedsAction,
        }
    }

    pub fn to_ical(self) -> &'static str {
        match self {
            Self::NeedsAction => "NEEDS-ACTION",
            Self::InProcess => "IN-PROCESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::NeedsAction
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_ical())
    }
}

/// How a proximity alarm is triggered.
///
/// `Arrive`/`Depart` are geofence triggers and carry coordinates.
/// `Connect`/`Disconnect` are CarPlay triggers and never do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proximity {
    Arrive,
    Depart,
    Connect,
    Disconnect,
}

impl Proximity {
    pub fn from_ical(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "DEPART" => Self::Depart,
            "CONNECT" => Self::Connect,
            "DISCONNECT" => Self::Disconnect,
            _ => Self::Arrive,
        }
    }

    pub fn to_ical(self) -> &'static str {
        match self {
            Self::Arrive => "ARRIVE",
            Self::Depart => "DEPART",
            Self::Connect => "CONNECT",
            Self::Disconnect => "DISCONNECT",
        }
    }
}

/// A proximity alarm attached to a task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskLocation {
    /// Display name of the place (or a synthesized CarPlay label)
    pub title: String,
    /// Free-text address. Empty for CarPlay triggers
    pub address: String,
    /// Coordinates are both-or-neither, and always absent for CarPlay triggers
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub proximity: Proximity,
}

impl TaskLocation {
    /// A CarPlay trigger (`CONNECT`/`DISCONNECT`), with its synthesized title and no coordinates
    pub fn carplay(proximity: Proximity) -> Self {
        let title = match proximity {
            Proximity::Disconnect => "Getting Out Of Car",
            _ => "Getting In Car",
        };
        Self {
            title: title.to_string(),
            address: String::new(),
            lat: None,
            lng: None,
            proximity,
        }
    }

    /// Both coordinates, or nothing
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// A to-do task.
///
/// This is the canonical in-memory representation. The remote calendar object is the source of
/// truth: tasks are decoded from it on every read, and mutated by replacing it in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Persistent, globally unique identifier for the calendar component.
    /// The [RFC](https://tools.ietf.org/html/rfc5545#page-117) recommends concatenating a timestamp with the server's domain name, but UUID are even better
    pub uid: String,

    /// The display name of the task. Never empty once decoded
    pub title: String,

    pub description: Option<String>,

    /// Due date, at day granularity (time-of-day is dropped on decode)
    pub due: Option<NaiveDate>,

    /// RFC5545 priority. 0=none, 1=high, 5=medium, 9=low; anything else displays as "none"
    pub priority: u8,

    /// Ordered categories. Duplicates from parsing are kept as-is; display logic treats membership, not order, as significant
    pub tags: Vec<String>,

    pub status: TaskStatus,

    /// Raw recurrence rule body (e.g. `FREQ=WEEKLY;INTERVAL=2`), without the `RRULE:` prefix
    pub recurrence: Option<String>,

    /// Completion timestamp. Only meaningful when `status` is `Completed`
    pub completed: Option<DateTime<Utc>>,

    pub location_alarm: Option<TaskLocation>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_favorite(&self) -> bool {
        self.tags.iter().any(|t| t == FAV_TAG)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.due {
            Some(due) => due < today && self.is_completed() == false,
            None => false,
        }
    }

    pub fn is_due_today(&self, today: NaiveDate) -> bool {
        self.due == Some(today)
    }

    /// Short display label for the priority
    pub fn priority_label(&self) -> &'static str {
        priority_label(self.priority)
    }
}

pub fn priority_label(priority: u8) -> &'static str {
    match priority {
        1 => "H",
        5 => "M",
        9 => "L",
        _ => "none",
    }
}

/// The reverse of [`priority_label`], as used by search filters ("H", "m", "none", ...)
pub fn priority_from_label(label: &str) -> Option<u8> {
    match label.to_uppercase().as_str() {
        "H" => Some(1),
        "M" => Some(5),
        "L" => Some(9),
        "NONE" => Some(0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        assert_eq!(TaskStatus::from_ical("COMPLETED"), TaskStatus::Completed);
        assert_eq!(TaskStatus::from_ical("in-process"), TaskStatus::InProcess);
        assert_eq!(TaskStatus::from_ical("CANCELLED"), TaskStatus::Cancelled);
        assert_eq!(TaskStatus::from_ical("whatever"), TaskStatus::NeedsAction);
        assert_eq!(TaskStatus::Completed.to_ical(), "COMPLETED");
    }

    #[test]
    fn carplay_locations_have_no_coordinates() {
        let getting_in = TaskLocation::carplay(Proximity::Connect);
        assert_eq!(getting_in.title, "Getting In Car");
        assert_eq!(getting_in.coordinates(), None);

        let getting_out = TaskLocation::carplay(Proximity::Disconnect);
        assert_eq!(getting_out.title, "Getting Out Of Car");
        assert_eq!(getting_out.address, "");
    }

    #[test]
    fn priority_labels() {
        assert_eq!(priority_label(1), "H");
        assert_eq!(priority_label(5), "M");
        assert_eq!(priority_label(9), "L");
        assert_eq!(priority_label(0), "none");
        assert_eq!(priority_label(4), "none");

        assert_eq!(priority_from_label("h"), Some(1));
        assert_eq!(priority_from_label("none"), Some(0));
        assert_eq!(priority_from_label("urgent"), None);
    }
}
