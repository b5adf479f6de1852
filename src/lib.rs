//! This crate is the CalDAV core of a personal task manager.
//!
//! It maps the `VTODO` objects of a remote calendar to [`Task`] values and back. The mapping
//! is deliberately conservative: updates are written by patching the existing calendar
//! object field by field (see the [`ical`] module), so properties this crate does not model
//! survive a round-trip through it.
//!
//! The [`client`] module discovers the calendars of a CalDAV server; the resulting
//! [`RemoteCalendar`](calendar::remote_calendar::RemoteCalendar) is the store the
//! [`TaskProvider`] workflows (create, partial update, toggle-complete with recurrence
//! advancement, delete...) operate on. A web front-end is expected to sit on top of these
//! workflows; nothing in here depends on one.

pub mod calendar;
pub mod client;
pub mod config;
pub use config::Config;
pub mod filter;
pub mod ical;
mod item;
pub use item::{CalendarObject, ItemId};
pub mod provider;
pub use provider::TaskProvider;
pub mod recur;
mod task;
pub use task::{priority_from_label, priority_label, Proximity, Task, TaskLocation, TaskStatus, FAV_TAG};
pub mod traits;
mod update;
pub use update::{ProvidedFields, TaskCreate, TaskUpdate};

pub mod utils;

/// Part of the ProdID string that describes the organization (example of a ProdID string: `-//ABC Corporation//My Product//EN`)
pub const ORG_NAME: &str = "TaskWeb";
/// Part of the ProdID string that describes the product name
pub const PRODUCT_NAME: &str = "TaskDav";
