use std::error::Error;

use async_trait::async_trait;

use crate::item::CalendarObject;

/// The addressable store of `VTODO` objects this crate reads from and writes to.
///
/// The production implementation is [`RemoteCalendar`](crate::calendar::remote_calendar::RemoteCalendar),
/// which reaches a CalDAV server over the network; tests substitute an in-memory store.
///
/// Note that read-then-write is not atomic across this trait: two callers updating the same
/// task can race, and the later `replace` wins. No optimistic-concurrency token is used.
#[async_trait]
pub trait VtodoStore {
    /// Fetch every task object in the calendar.
    /// This can be a long process (one network round-trip for the whole collection)
    async fn list_all(&self, include_completed: bool) -> Result<Vec<CalendarObject>, Box<dyn Error>>;

    /// Store a brand new object. `uid` becomes part of its address
    async fn save_new(&self, uid: &str, ical_text: &str) -> Result<(), Box<dyn Error>>;

    /// Replace an existing object in place
    async fn replace(&self, object: &CalendarObject, ical_text: &str) -> Result<(), Box<dyn Error>>;

    /// Remove an object for good
    async fn delete(&self, object: &CalendarObject) -> Result<(), Box<dyn Error>>;
}
