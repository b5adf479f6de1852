//! This module provides a client to connect to a CalDAV server

use std::convert::TryFrom;
use std::error::Error;

use minidom::Element;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use url::Url;

use crate::calendar::remote_calendar::RemoteCalendar;
use crate::calendar::{Resource, SupportedComponents};
use crate::config::Config;
use crate::utils::{find_elem, find_elems};

static DAVCLIENT_BODY: &str = r#"
    <d:propfind xmlns:d="DAV:">
       <d:prop>
           <d:current-user-principal />
       </d:prop>
    </d:propfind>
"#;

static HOMESET_BODY: &str = r#"
    <d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav" >
      <d:self/>
      <d:prop>
        <c:calendar-home-set />
      </d:prop>
    </d:propfind>
"#;

static CAL_BODY: &str = r#"
    <d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav" >
       <d:prop>
         <d:displayname />
         <d:resourcetype />
         <c:supported-calendar-component-set />
       </d:prop>
    </d:propfind>
"#;

/// Discovers the calendars of a CalDAV server.
///
/// The configuration is an explicit value handed to the constructor; this crate keeps no
/// process-wide server settings.
pub struct Client {
    resource: Resource,
    calendar_name: String,

    principal: Option<Url>,
    calendar_home_set: Option<Url>,
    calendars: Option<Vec<RemoteCalendar>>,
}

impl Client {
    /// Create a client. This does not start a connection
    pub fn new(config: &Config) -> Result<Self, Box<dyn Error>> {
        let url = Url::parse(&config.server_url)?;

        Ok(Self {
            resource: Resource::new(url, config.username.clone(), config.password.clone()),
            calendar_name: config.calendar_name.clone(),
            principal: None,
            calendar_home_set: None,
            calendars: None,
        })
    }

    async fn sub_request(&self, url: &Url, body: String, depth: u32) -> Result<String, Box<dyn Error>> {
        let method = Method::from_bytes(b"PROPFIND").expect("cannot create PROPFIND method.");

        let res = reqwest::Client::new()
            .request(method, url.as_str())
            .header("Depth", depth)
            .header(CONTENT_TYPE, "application/xml")
            .basic_auth(self.resource.username(), Some(self.resource.password()))
            .body(body)
            .send()
            .await?;
        let text = res.text().await?;
        Ok(text)
    }

    async fn sub_request_and_process(&self, url: &Url, body: String, items: &[&str]) -> Result<String, Box<dyn Error>> {
        let text = self.sub_request(url, body, 0).await?;

        let mut current_element: &Element = &text.parse()?;
        for item in items {
            current_element = match find_elem(current_element, *item) {
                Some(elem) => elem,
                None => return Err(format!("No <{}> in the reply of {}", item, url).into()),
            };
        }

        Ok(current_element.text())
    }

    /// Return the Principal URL, or fetch it from server if not known yet
    async fn get_principal(&mut self) -> Result<Url, Box<dyn Error>> {
        if let Some(p) = &self.principal {
            return Ok(p.clone());
        }

        let root_url = self.resource.url().clone();
        let href = self
            .sub_request_and_process(&root_url, DAVCLIENT_BODY.into(), &["current-user-principal", "href"])
            .await?;
        let mut principal_url = self.resource.url().clone();
        principal_url.set_path(&href);
        self.principal = Some(principal_url.clone());
        log::debug!("Principal URL is {}", href);

        Ok(principal_url)
    }

    /// Return the Homeset URL, or fetch it from server if not known yet
    async fn get_cal_home_set(&mut self) -> Result<Url, Box<dyn Error>> {
        if let Some(h) = &self.calendar_home_set {
            return Ok(h.clone());
        }
        let principal_url = self.get_principal().await?;

        let href = self
            .sub_request_and_process(
                &principal_url,
                HOMESET_BODY.into(),
                &["calendar-home-set", "href"],
            )
            .await?;
        let mut chs_url = self.resource.url().clone();
        chs_url.set_path(&href);
        self.calendar_home_set = Some(chs_url.clone());
        log::debug!("Calendar home set URL is {:?}", chs_url.path());

        Ok(chs_url)
    }

    /// Return the list of calendars, or fetch from server if not known yet
    pub async fn get_calendars(&mut self) -> Result<Vec<RemoteCalendar>, Box<dyn Error>> {
        if let Some(c) = &self.calendars {
            return Ok(c.clone());
        }
        let cal_home_set = self.get_cal_home_set().await?;

        let text = self.sub_request(&cal_home_set, CAL_BODY.into(), 1).await?;

        let root: Element = text.parse()?;
        let reps = find_elems(&root, "response");
        let mut calendars = Vec::new();
        for rep in reps {
            let display_name = find_elem(rep, "displayname")
                .map(|e| e.text())
                .unwrap_or("<no name>".to_string());
            log::debug!("Considering calendar {}", display_name);

            // We filter out non-calendar items
            let resource_types = match find_elem(rep, "resourcetype") {
                None => continue,
                Some(rt) => rt,
            };
            let mut found_calendar_type = false;
            for resource_type in resource_types.children() {
                if resource_type.name() == "calendar" {
                    found_calendar_type = true;
                    break;
                }
            }
            if found_calendar_type == false {
                continue;
            }

            // We filter out the root calendar collection, that has an empty supported-calendar-component-set
            let el_supported_comps = match find_elem(rep, "supported-calendar-component-set") {
                None => continue,
                Some(comps) => comps,
            };
            if el_supported_comps.children().count() == 0 {
                continue;
            }

            let calendar_href = match find_elem(rep, "href") {
                None => {
                    log::warn!("Calendar {} has no URL! Ignoring it.", display_name);
                    continue;
                }
                Some(h) => h.text(),
            };

            let supported_components = match SupportedComponents::try_from(el_supported_comps.clone()) {
                Err(err) => {
                    log::warn!(
                        "Calendar {} has invalid supported components ({})! Ignoring it.",
                        display_name,
                        err
                    );
                    continue;
                }
                Ok(sc) => sc,
            };

            let this_calendar = RemoteCalendar::new(
                display_name,
                self.resource.combine(&calendar_href),
                supported_components,
            );
            log::info!("Found calendar {}", this_calendar.name());
            calendars.push(this_calendar);
        }

        self.calendars = Some(calendars.clone());
        Ok(calendars)
    }

    /// Return the calendar holding the tasks: the one whose display name is configured,
    /// falling back to the first calendar that supports to-dos
    pub async fn task_calendar(&mut self) -> Result<RemoteCalendar, Box<dyn Error>> {
        let calendars = self.get_calendars().await?;

        if let Some(cal) = calendars.iter().find(|cal| cal.name() == self.calendar_name) {
            return Ok(cal.clone());
        }

        log::warn!(
            "No calendar named {:?}, falling back to the first one that supports to-dos",
            self.calendar_name
        );
        calendars
            .into_iter()
            .find(|cal| cal.supported_components().contains(SupportedComponents::TODO))
            .ok_or_else(|| "This server has no calendar that supports to-dos".into())
    }
}
