//! The remote store of task objects, reached over CalDAV

use std::error::Error;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Method;

use crate::calendar::{CalendarId, Resource, SupportedComponents};
use crate::item::{CalendarObject, ItemId};
use crate::traits::VtodoStore;
use crate::utils::{find_elem, find_elems};

static TASKS_BODY_ALL: &str = r#"
    <C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
        <D:prop>
            <D:getetag/>
            <C:calendar-data/>
        </D:prop>
        <C:filter>
            <C:comp-filter name="VCALENDAR">
                <C:comp-filter name="VTODO" />
            </C:comp-filter>
        </C:filter>
    </C:calendar-query>
"#;

static TASKS_BODY_PENDING: &str = r#"
    <C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
        <D:prop>
            <D:getetag/>
            <C:calendar-data/>
        </D:prop>
        <C:filter>
            <C:comp-filter name="VCALENDAR">
                <C:comp-filter name="VTODO">
                    <C:prop-filter name="COMPLETED">
                        <C:is-not-defined/>
                    </C:prop-filter>
                    <C:prop-filter name="STATUS">
                        <C:text-match negate-condition="yes">CANCELLED</C:text-match>
                    </C:prop-filter>
                </C:comp-filter>
            </C:comp-filter>
        </C:filter>
    </C:calendar-query>
"#;

/// A CalDAV calendar holding task objects, created by a [`Client`](crate::client::Client).
///
/// Looking an object up by uid is not part of this store: there is no server-side index, so
/// the caller iterates [`list_all`](VtodoStore::list_all) instead (a linear cost proportional
/// to the remote task count).
#[derive(Clone)]
pub struct RemoteCalendar {
    name: String,
    resource: Resource,
    supported_components: SupportedComponents,
}

impl RemoteCalendar {
    pub fn new(name: String, resource: Resource, supported_components: SupportedComponents) -> Self {
        Self {
            name,
            resource,
            supported_components,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn id(&self) -> &CalendarId {
        self.resource.url()
    }
    pub fn supported_components(&self) -> SupportedComponents {
        self.supported_components
    }

    async fn put(&self, url: &url::Url, ical_text: &str, headers: &[(&str, &str)]) -> Result<(), Box<dyn Error>> {
        let mut request = reqwest::Client::new()
            .put(url.clone())
            .header(CONTENT_TYPE, "text/calendar")
            .header(CONTENT_LENGTH, ical_text.len())
            .basic_auth(self.resource.username(), Some(self.resource.password()))
            .body(ical_text.to_string());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        if response.status().is_success() == false {
            return Err(format!("Unexpected HTTP status code {:?}", response.status()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl VtodoStore for RemoteCalendar {
    async fn list_all(&self, include_completed: bool) -> Result<Vec<CalendarObject>, Box<dyn Error>> {
        let body = if include_completed {
            TASKS_BODY_ALL
        } else {
            TASKS_BODY_PENDING
        };

        let method = Method::from_bytes(b"REPORT").expect("cannot create REPORT method.");
        let response = reqwest::Client::new()
            .request(method, self.resource.url().clone())
            .header("Depth", 1)
            .header(CONTENT_TYPE, "application/xml")
            .basic_auth(self.resource.username(), Some(self.resource.password()))
            .body(body)
            .send()
            .await?;

        if response.status().is_success() == false {
            return Err(format!("Unexpected HTTP status code {:?}", response.status()).into());
        }

        let text = response.text().await?;
        let root: minidom::Element = text.parse()?;

        let mut objects = Vec::new();
        for response in find_elems(&root, "response") {
            let item_id = match find_elem(response, "href") {
                None => {
                    log::warn!("Unable to extract HREF from a response, ignoring it");
                    continue;
                }
                Some(href) => ItemId::from(self.resource.combine(&href.text()).url().clone()),
            };

            let data = match find_elem(response, "calendar-data") {
                None => {
                    log::warn!("No calendar data for item {}, ignoring it", item_id);
                    continue;
                }
                Some(data) => data.text(),
            };

            objects.push(CalendarObject::new(item_id, data));
        }

        Ok(objects)
    }

    async fn save_new(&self, uid: &str, ical_text: &str) -> Result<(), Box<dyn Error>> {
        let id = ItemId::for_uid(self.id(), uid);
        self.put(id.as_url(), ical_text, &[("If-None-Match", "*")])
            .await
    }

    async fn replace(&self, object: &CalendarObject, ical_text: &str) -> Result<(), Box<dyn Error>> {
        // Deliberately no If-Match: the last write wins, concurrent updates to the same
        // task are accepted as a race
        self.put(object.id().as_url(), ical_text, &[]).await
    }

    async fn delete(&self, object: &CalendarObject) -> Result<(), Box<dyn Error>> {
        let response = reqwest::Client::new()
            .delete(object.id().as_url().clone())
            .basic_auth(self.resource.username(), Some(self.resource.password()))
            .send()
            .await?;

        if response.status().is_success() == false {
            return Err(format!("Unexpected HTTP status code {:?}", response.status()).into());
        }

        Ok(())
    }
}
