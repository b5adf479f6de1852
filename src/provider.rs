//! The high-level task operations, composing the decoder, the encoders, the merge logic and
//! the recurrence evaluator over a [`VtodoStore`].
//!
//! The store is the single source of truth: nothing is cached here, every operation starts
//! by reading the remote collection. Note that fetch-then-replace is not atomic; see
//! [`VtodoStore`] for the accepted race.

use std::error::Error;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::item::CalendarObject;
use crate::task::{Task, TaskStatus, FAV_TAG};
use crate::traits::VtodoStore;
use crate::update::{TaskCreate, TaskUpdate};

pub struct TaskProvider<S: VtodoStore> {
    store: S,
}

impl<S: VtodoStore> TaskProvider<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch and decode every task.
    ///
    /// This is deliberately best-effort: an object that does not decode is skipped (and
    /// logged), and a failure to fetch the collection degrades to an empty list so that list
    /// views stay functional. Mutating operations, in contrast, propagate store failures.
    pub async fn list_tasks(&self, include_completed: bool) -> Vec<Task> {
        let objects = match self.store.list_all(include_completed).await {
            Ok(objects) => objects,
            Err(err) => {
                log::warn!("Unable to fetch the task collection: {}", err);
                return Vec::new();
            }
        };

        objects
            .iter()
            .filter_map(|object| match object.decode() {
                Some(task) => Some(task),
                None => {
                    log::warn!("Skipping unusable calendar object {}", object.id());
                    None
                }
            })
            .collect()
    }

    /// Look a task up by uid.
    ///
    /// There is no server-side index: this scans the whole collection, decoding each object
    /// far enough to compare identifiers
    async fn find_raw(&self, uid: &str) -> Result<Option<(CalendarObject, Task)>, Box<dyn Error>> {
        for object in self.store.list_all(true).await? {
            if let Some(task) = object.decode() {
                if task.uid == uid {
                    return Ok(Some((object, task)));
                }
            }
        }
        Ok(None)
    }

    pub async fn find_task(&self, uid: &str) -> Result<Option<Task>, Box<dyn Error>> {
        Ok(self.find_raw(uid).await?.map(|(_object, task)| task))
    }

    /// Create a task from user input, under a fresh random uid
    pub async fn create_task(&self, input: TaskCreate) -> Result<Task, Box<dyn Error>> {
        let uid = Uuid::new_v4().to_hyphenated().to_string();
        let task = input.into_task(uid.clone());

        let ical_text = crate::ical::build_new(&task);
        self.store.save_new(&uid, &ical_text).await?;

        // Read the task back: the store is the source of truth, and may have normalized
        // or completed fields on its side
        match self.find_task(&uid).await? {
            Some(stored) => Ok(stored),
            None => {
                log::warn!("Unable to read task {} back after creating it", uid);
                Ok(task)
            }
        }
    }

    /// Apply a partial update to the task with this uid.
    /// Returns `None` when no such task exists
    pub async fn update_task(&self, uid: &str, update: &TaskUpdate) -> Result<Option<Task>, Box<dyn Error>> {
        let (object, existing) = match self.find_raw(uid).await? {
            None => return Ok(None),
            Some(found) => found,
        };
        let merged = self.apply_update(&object, &existing, update).await?;
        Ok(Some(merged))
    }

    pub async fn delete_task(&self, uid: &str) -> Result<bool, Box<dyn Error>> {
        let object = match self.find_raw(uid).await? {
            None => return Ok(false),
            Some((object, _task)) => object,
        };
        self.store.delete(&object).await?;
        Ok(true)
    }

    /// Flip the completion status of a task.
    ///
    /// Completing a recurring task advances it instead of terminating it: the due date moves
    /// to the next occurrence (computed from the current due date, or from today when there
    /// is none) and the status stays `NEEDS-ACTION`.
    pub async fn toggle_complete(&self, uid: &str) -> Result<Option<Task>, Box<dyn Error>> {
        self.toggle_complete_on(uid, Utc::now().date_naive()).await
    }

    /// Same as [`toggle_complete`](Self::toggle_complete), with an explicit "today"
    pub async fn toggle_complete_on(&self, uid: &str, today: NaiveDate) -> Result<Option<Task>, Box<dyn Error>> {
        let (object, existing) = match self.find_raw(uid).await? {
            None => return Ok(None),
            Some(found) => found,
        };

        let update = match &existing.recurrence {
            Some(rule) if existing.is_completed() == false => {
                let anchor = existing.due.unwrap_or(today);
                match crate::recur::next_occurrence(rule, anchor) {
                    Some(next_due) => TaskUpdate::new()
                        .status(TaskStatus::NeedsAction)
                        .due(next_due),
                    None => {
                        // The rule has run out: the due date is cleared and the task stays
                        // actionable, it is not marked completed
                        log::warn!(
                            "Recurrence of task {} yields no further occurrence, clearing its due date",
                            uid
                        );
                        TaskUpdate::new().status(TaskStatus::NeedsAction).due(None)
                    }
                }
            }
            _ => {
                let new_status = if existing.is_completed() {
                    TaskStatus::NeedsAction
                } else {
                    TaskStatus::Completed
                };
                TaskUpdate::new().status(new_status)
            }
        };

        let merged = self.apply_update(&object, &existing, &update).await?;
        Ok(Some(merged))
    }

    /// Flip the internal `fav` tag of a task.
    /// Returns `None` when no such task exists
    pub async fn toggle_favorite(&self, uid: &str) -> Result<Option<Task>, Box<dyn Error>> {
        let (object, existing) = match self.find_raw(uid).await? {
            None => return Ok(None),
            Some(found) => found,
        };

        let mut tags = existing.tags.clone();
        match tags.iter().position(|tag| tag == FAV_TAG) {
            Some(position) => {
                tags.remove(position);
            }
            None => tags.push(FAV_TAG.to_string()),
        }

        let update = TaskUpdate::new().tags(tags);
        let merged = self.apply_update(&object, &existing, &update).await?;
        Ok(Some(merged))
    }

    /// Merge, patch the raw object in place, and replace it on the store
    async fn apply_update(
        &self,
        object: &CalendarObject,
        existing: &Task,
        update: &TaskUpdate,
    ) -> Result<Task, Box<dyn Error>> {
        let merged = update.merge_into(existing);
        let patched = crate::ical::patch(object.data(), &merged)?;
        self.store.replace(object, &patched).await?;
        Ok(merged)
    }
}
