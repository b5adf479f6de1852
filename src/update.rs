//! Partial updates to tasks.
//!
//! The web layer sends `TaskUpdate`-shaped input where every field is optional, and where
//! "field omitted" and "field explicitly cleared" mean different things. A plain
//! `Option<Option<T>>` encoding is easy to get wrong, so each update carries an explicit
//! bitset of the fields that were provided: a field whose bit is not set passes through the
//! merge unmodified, whatever its value.

use bitflags::bitflags;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskLocation, TaskStatus};

bitflags! {
    /// Which fields of a [`TaskUpdate`] were provided by the caller
    pub struct ProvidedFields: u16 {
        const TITLE          = 0b0000_0001;
        const DESCRIPTION    = 0b0000_0010;
        const DUE            = 0b0000_0100;
        const PRIORITY       = 0b0000_1000;
        const TAGS           = 0b0001_0000;
        const STATUS         = 0b0010_0000;
        const RECURRENCE     = 0b0100_0000;
        const LOCATION_ALARM = 0b1000_0000;
    }
}

impl Default for ProvidedFields {
    fn default() -> Self {
        ProvidedFields::empty()
    }
}

/// Input shape for creating a task. Only the title is required
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskCreate {
    pub title: String,
    pub description: Option<String>,
    pub due: Option<NaiveDate>,
    pub priority: u8,
    pub tags: Vec<String>,
    pub status: TaskStatus,
    pub recurrence: Option<String>,
    pub location_alarm: Option<TaskLocation>,
}

impl TaskCreate {
    pub fn new<S: ToString>(title: S) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            due: None,
            priority: 0,
            tags: Vec::new(),
            status: TaskStatus::NeedsAction,
            recurrence: None,
            location_alarm: None,
        }
    }

    /// Turn this input into a [`Task`] carrying the given fresh uid
    pub fn into_task(self, uid: String) -> Task {
        Task {
            uid,
            title: self.title,
            description: self.description,
            due: self.due,
            priority: self.priority,
            tags: self.tags,
            status: self.status,
            recurrence: self.recurrence,
            completed: None,
            location_alarm: self.location_alarm,
        }
    }
}

/// Input shape for a partial update.
///
/// Setters take `Into<Option<T>>`, so `update.due(None)` explicitly clears the due date while
/// an update that never called `due()` leaves it alone.
#[derive(Clone, Debug, Default)]
pub struct TaskUpdate {
    provided: ProvidedFields,
    title: Option<String>,
    description: Option<String>,
    due: Option<NaiveDate>,
    priority: Option<u8>,
    tags: Option<Vec<String>>,
    status: Option<TaskStatus>,
    recurrence: Option<String>,
    location_alarm: Option<TaskLocation>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provided(&self) -> ProvidedFields {
        self.provided
    }

    pub fn title<V: Into<Option<String>>>(mut self, title: V) -> Self {
        self.provided |= ProvidedFields::TITLE;
        self.title = title.into();
        self
    }

    pub fn description<V: Into<Option<String>>>(mut self, description: V) -> Self {
        self.provided |= ProvidedFields::DESCRIPTION;
        self.description = description.into();
        self
    }

    pub fn due<V: Into<Option<NaiveDate>>>(mut self, due: V) -> Self {
        self.provided |= ProvidedFields::DUE;
        self.due = due.into();
        self
    }

    pub fn priority<V: Into<Option<u8>>>(mut self, priority: V) -> Self {
        self.provided |= ProvidedFields::PRIORITY;
        self.priority = priority.into();
        self
    }

    pub fn tags<V: Into<Option<Vec<String>>>>(mut self, tags: V) -> Self {
        self.provided |= ProvidedFields::TAGS;
        self.tags = tags.into();
        self
    }

    pub fn status<V: Into<Option<TaskStatus>>>(mut self, status: V) -> Self {
        self.provided |= ProvidedFields::STATUS;
        self.status = status.into();
        self
    }

    pub fn recurrence<V: Into<Option<String>>>(mut self, recurrence: V) -> Self {
        self.provided |= ProvidedFields::RECURRENCE;
        self.recurrence = recurrence.into();
        self
    }

    pub fn location_alarm<V: Into<Option<TaskLocation>>>(mut self, location_alarm: V) -> Self {
        self.provided |= ProvidedFields::LOCATION_ALARM;
        self.location_alarm = location_alarm.into();
        self
    }

    /// Resolve this update against the currently stored task.
    ///
    /// Provided fields win, including explicit clears. Everything else is carried forward
    /// from `existing`, so a caller that only wants to flip the status can send an update
    /// touching solely that field.
    pub fn merge_into(&self, existing: &Task) -> Task {
        let pick_title = if self.provided.contains(ProvidedFields::TITLE) {
            // An explicitly cleared title falls back to the existing one: a task title
            // must stay non-empty
            match &self.title {
                Some(t) if t.is_empty() == false => t.clone(),
                _ => existing.title.clone(),
            }
        } else {
            existing.title.clone()
        };

        Task {
            uid: existing.uid.clone(),
            title: pick_title,
            description: if self.provided.contains(ProvidedFields::DESCRIPTION) {
                self.description.clone()
            } else {
                existing.description.clone()
            },
            due: if self.provided.contains(ProvidedFields::DUE) {
                self.due
            } else {
                existing.due
            },
            priority: if self.provided.contains(ProvidedFields::PRIORITY) {
                self.priority.unwrap_or(0)
            } else {
                existing.priority
            },
            // An explicitly cleared tag list normalizes to an empty list, never to "null"
            tags: if self.provided.contains(ProvidedFields::TAGS) {
                self.tags.clone().unwrap_or_default()
            } else {
                existing.tags.clone()
            },
            status: if self.provided.contains(ProvidedFields::STATUS) {
                self.status.unwrap_or_default()
            } else {
                existing.status
            },
            recurrence: if self.provided.contains(ProvidedFields::RECURRENCE) {
                self.recurrence.clone()
            } else {
                existing.recurrence.clone()
            },
            completed: existing.completed,
            location_alarm: if self.provided.contains(ProvidedFields::LOCATION_ALARM) {
                self.location_alarm.clone()
            } else {
                existing.location_alarm.clone()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing_task() -> Task {
        Task {
            uid: "some-uid".to_string(),
            title: "Water the plants".to_string(),
            description: Some("The ones on the balcony".to_string()),
            due: NaiveDate::from_ymd_opt(2024, 1, 10),
            priority: 5,
            tags: vec!["home".to_string(), "garden".to_string()],
            status: TaskStatus::NeedsAction,
            recurrence: Some("FREQ=WEEKLY".to_string()),
            completed: None,
            location_alarm: None,
        }
    }

    #[test]
    fn update_with_only_status_touches_nothing_else() {
        let existing = existing_task();
        let update = TaskUpdate::new().status(TaskStatus::Completed);

        let merged = update.merge_into(&existing);

        assert_eq!(merged.status, TaskStatus::Completed);
        assert_eq!(merged.title, existing.title);
        assert_eq!(merged.description, existing.description);
        assert_eq!(merged.due, existing.due);
        assert_eq!(merged.priority, existing.priority);
        assert_eq!(merged.tags, existing.tags);
        assert_eq!(merged.recurrence, existing.recurrence);
    }

    #[test]
    fn explicit_clear_wins_over_existing_value() {
        let existing = existing_task();
        let update = TaskUpdate::new().due(None).description(None);

        let merged = update.merge_into(&existing);

        assert_eq!(merged.due, None);
        assert_eq!(merged.description, None);
        // Not provided, carried forward
        assert_eq!(merged.recurrence, existing.recurrence);
    }

    #[test]
    fn cleared_tags_become_an_empty_list() {
        let existing = existing_task();
        let update = TaskUpdate::new().tags(None);

        let merged = update.merge_into(&existing);
        assert_eq!(merged.tags, Vec::<String>::new());
    }

    #[test]
    fn omitted_tags_are_carried_forward() {
        let existing = existing_task();
        let update = TaskUpdate::new().priority(1);

        let merged = update.merge_into(&existing);
        assert_eq!(merged.tags, existing.tags);
        assert_eq!(merged.priority, 1);
    }

    #[test]
    fn cleared_title_keeps_the_existing_one() {
        let existing = existing_task();
        let update = TaskUpdate::new().title(None);

        let merged = update.merge_into(&existing);
        assert_eq!(merged.title, "Water the plants");
    }
}
