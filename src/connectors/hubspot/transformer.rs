use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use super::api::{ContactProperties, HubSpotContact};
use crate::error::ConnectorError;
use crate::item::IntegrationItem;

/// HubSpot timestamp format, e.g. `2024-01-01T12:00:00.000Z`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%3fZ";

/// Transform a HubSpot contact into an integration item.
///
/// Requires `email` and `firstname`; empty strings count as missing.
pub fn contact_to_item(contact: &HubSpotContact) -> Result<IntegrationItem, ConnectorError> {
    let id = contact_id(contact)?;
    let empty = ContactProperties::default();
    let properties = contact.properties.as_ref().unwrap_or(&empty);

    let email = required(&properties.email).ok_or_else(|| ConnectorError::IncompleteRecord {
        id: id.clone(),
        field: "email",
    })?;
    let firstname =
        required(&properties.firstname).ok_or_else(|| ConnectorError::IncompleteRecord {
            id: id.clone(),
            field: "firstname",
        })?;
    let lastname = properties.lastname.as_deref().unwrap_or("");

    let mut item = IntegrationItem::new(id, "contact");
    item.name = Some(format!("{} {}", firstname, lastname).trim().to_string());
    item.url = Some(format!("mailto:{}", email));
    item.creation_time = Some(parse_timestamp("createdate", &properties.createdate)?);
    item.last_modified_time = Some(parse_timestamp(
        "lastmodifieddate",
        &properties.lastmodifieddate,
    )?);
    item.visibility = true;

    Ok(item)
}

/// Transform a page of contacts; the first bad record fails the whole page.
pub fn contacts_to_items(
    contacts: &[HubSpotContact],
) -> Result<Vec<IntegrationItem>, ConnectorError> {
    contacts.iter().map(contact_to_item).collect()
}

fn contact_id(contact: &HubSpotContact) -> Result<String, ConnectorError> {
    match &contact.id {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(ConnectorError::IncompleteRecord {
            id: "<unknown>".to_string(),
            field: "id",
        }),
    }
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn parse_timestamp(
    field: &'static str,
    value: &Option<String>,
) -> Result<DateTime<Utc>, ConnectorError> {
    let raw = value.as_deref().unwrap_or("");
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ConnectorError::MalformedTimestamp {
            field,
            value: raw.to_string(),
        })
}
