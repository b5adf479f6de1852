//! Addressable calendar objects (raw `VTODO` documents and their URLs)

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::calendar::CalendarId;
use crate::task::Task;

/// The URL of a calendar object on the server
#[derive(Clone, Debug, PartialEq, Hash)]
pub struct ItemId {
    content: Url,
}
impl ItemId {
    /// Generate the ItemId of a new object, from the uid it will carry
    pub fn for_uid(parent_calendar: &CalendarId, uid: &str) -> Self {
        let u = parent_calendar.join(&format!("{}.ics", uid)).unwrap(/* this cannot panic since a uid is a valid URL path segment */);
        Self { content: u }
    }

    pub fn as_url(&self) -> &Url {
        &self.content
    }
}
impl From<Url> for ItemId {
    fn from(url: Url) -> Self {
        Self { content: url }
    }
}
impl FromStr for ItemId {
    type Err = url::ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let u: Url = s.parse()?;
        Ok(Self::from(u))
    }
}

impl Eq for ItemId {}
impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}

/// Used to support serde
impl Serialize for ItemId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.content.as_str())
    }
}
/// Used to support serde
impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> Result<ItemId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let u = Url::deserialize(deserializer)?;
        Ok(ItemId { content: u })
    }
}

/// A raw calendar object, as stored on the server.
///
/// The raw text is kept around (rather than only its decoded [`Task`]) because updates are
/// written by patching this exact document in place. Decoding it is cheap and done on demand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalendarObject {
    id: ItemId,
    data: String,
}

impl CalendarObject {
    pub fn new(id: ItemId, data: String) -> Self {
        Self { id, data }
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Decode this object into a [`Task`], or `None` if it is not a usable task
    pub fn decode(&self) -> Option<Task> {
        crate::ical::parse(&self.data)
    }
}
