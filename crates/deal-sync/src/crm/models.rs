//! Zoho CRM deal records.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Stage a deal must be in to get a project board.
pub const KICKOFF_STAGE: &str = "Project Kickoff";

/// Deal type that gets a project board.
pub const IMPLEMENTATION_TYPE: &str = "New Implementation Project";

/// Custom field holding the linked board id.
pub const BOARD_ID_FIELD: &str = "Project_Board_ID__c";

/// Response envelope of `GET /crm/v2/Deals`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DealsResponse {
    /// Deal records. Zoho omits the key entirely when there are no records.
    #[serde(default)]
    pub data: Vec<Deal>,
}

/// A CRM deal.
///
/// Only the fields this service reads are typed; everything else is kept in
/// [`Deal::extra`] so the record survives a round trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Deal {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(
        rename = "Deal_Name",
        default,
        deserialize_with = "lenient_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,

    #[serde(
        rename = "Stage",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub stage: Option<String>,

    #[serde(
        rename = "Type",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub deal_type: Option<String>,

    #[serde(rename = "Project_Board_ID__c", default, deserialize_with = "lenient_text")]
    pub project_board_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Deal {
    /// Whether the deal has no linked board yet.
    ///
    /// Absent, JSON `null`, empty and the literal text `"null"` all count as unset.
    #[must_use]
    pub fn board_unset(&self) -> bool {
        match self.project_board_id.as_deref() {
            None => true,
            Some(id) => id.is_empty() || id == "null",
        }
    }

    /// Whether this deal should get a project board.
    #[must_use]
    pub fn qualifies(&self) -> bool {
        self.stage.as_deref() == Some(KICKOFF_STAGE)
            && self.deal_type.as_deref() == Some(IMPLEMENTATION_TYPE)
            && self.board_unset()
    }

    /// Display name, empty when the CRM did not send one.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Name of the board provisioned for this deal.
    #[must_use]
    pub fn board_name(&self) -> String {
        format!("{} Board", self.display_name())
    }
}

/// Text form of a JSON value. Numbers and booleans keep their JSON spelling;
/// objects and arrays have no text form and read as empty.
fn text_of(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => Some(String::new()),
    }
}

/// Read any JSON value as text; `null` is unset.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(text_of)
}

/// Like [`lenient_text`], but an explicit `null` name reads as the text `"null"`.
fn lenient_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Some("null".to_string())),
        other => Ok(text_of(other)),
    }
}
