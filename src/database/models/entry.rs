use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{check_text, ValidationError};
use crate::types::Patch;

/// Columns the server owns; clients may never write them
const RESERVED_FIELDS: [&str; 3] = ["id", "user_id", "created_at"];

/// The three kinds of user content, one table each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryCategory {
    #[serde(rename = "journal_entries")]
    Journal,
    #[serde(rename = "moon_entries")]
    Moon,
    #[serde(rename = "relationship_check")]
    RelationshipCheck,
}

impl EntryCategory {
    pub const ALL: [EntryCategory; 3] = [
        EntryCategory::Journal,
        EntryCategory::Moon,
        EntryCategory::RelationshipCheck,
    ];

    pub fn table(self) -> &'static str {
        match self {
            EntryCategory::Journal => "journal_entries",
            EntryCategory::Moon => "moon_entries",
            EntryCategory::RelationshipCheck => "relationship_check",
        }
    }

    pub fn from_table(table: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|c| c.table() == table)
            .ok_or_else(|| ValidationError::UnknownCategory(table.to_string()))
    }

    /// `selected_index` as sent by the app's tab bar
    pub fn from_index(index: i64) -> Result<Self, ValidationError> {
        match index {
            0 => Ok(EntryCategory::Journal),
            1 => Ok(EntryCategory::Moon),
            2 => Ok(EntryCategory::RelationshipCheck),
            other => Err(ValidationError::UnknownIndex(other)),
        }
    }

    /// Body columns, in select order
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            EntryCategory::Journal => &["content", "content_grateful", "content_proud", "emotion_color"],
            EntryCategory::Moon => &["let_go", "want", "moon_sign"],
            EntryCategory::RelationshipCheck => &["question", "answer"],
        }
    }
}

impl fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for EntryCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_table(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JournalFields {
    pub content: String,
    #[serde(default)]
    pub content_grateful: Option<String>,
    #[serde(default)]
    pub content_proud: Option<String>,
    #[serde(default)]
    pub emotion_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoonFields {
    /// Cleared by the sweeper once the entry expires
    #[serde(default)]
    pub let_go: Option<Value>,
    #[serde(default)]
    pub want: Option<Value>,
    pub moon_sign: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationshipCheckFields {
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
}

/// Category-specific part of an entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntryBody {
    Journal(JournalFields),
    Moon(MoonFields),
    RelationshipCheck(RelationshipCheckFields),
}

/// A value bound to one column in an insert or update
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(Option<String>),
    Json(Option<Value>),
}

impl EntryBody {
    pub fn category(&self) -> EntryCategory {
        match self {
            EntryBody::Journal(_) => EntryCategory::Journal,
            EntryBody::Moon(_) => EntryCategory::Moon,
            EntryBody::RelationshipCheck(_) => EntryCategory::RelationshipCheck,
        }
    }

    /// Decode stored columns without validation
    pub fn decode(category: EntryCategory, fields: Map<String, Value>) -> serde_json::Result<Self> {
        let value = Value::Object(fields);
        Ok(match category {
            EntryCategory::Journal => EntryBody::Journal(serde_json::from_value(value)?),
            EntryCategory::Moon => EntryBody::Moon(serde_json::from_value(value)?),
            EntryCategory::RelationshipCheck => EntryBody::RelationshipCheck(serde_json::from_value(value)?),
        })
    }

    /// Decode client input and apply the category's rules
    pub fn from_fields(category: EntryCategory, fields: Map<String, Value>) -> Result<Self, ValidationError> {
        let body = Self::decode(category, fields).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        body.validate()?;
        Ok(body)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            EntryBody::Journal(j) => {
                check_text("content", &j.content)?;
                check_optional_text("content_grateful", &j.content_grateful)?;
                check_optional_text("content_proud", &j.content_proud)?;
                check_optional_text("emotion_color", &j.emotion_color)?;
            }
            EntryBody::Moon(m) => {
                check_text("moon_sign", &m.moon_sign)?;
            }
            EntryBody::RelationshipCheck(r) => {
                check_text("question", &r.question)?;
                check_optional_text("answer", &r.answer)?;
            }
        }
        Ok(())
    }

    /// Column/value pairs for an insert, in `EntryCategory::columns` order
    pub fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        match self.clone() {
            EntryBody::Journal(j) => vec![
                ("content", ColumnValue::Text(Some(j.content))),
                ("content_grateful", ColumnValue::Text(j.content_grateful)),
                ("content_proud", ColumnValue::Text(j.content_proud)),
                ("emotion_color", ColumnValue::Text(j.emotion_color)),
            ],
            EntryBody::Moon(m) => vec![
                ("let_go", ColumnValue::Json(m.let_go)),
                ("want", ColumnValue::Json(m.want)),
                ("moon_sign", ColumnValue::Text(Some(m.moon_sign))),
            ],
            EntryBody::RelationshipCheck(r) => vec![
                ("question", ColumnValue::Text(Some(r.question))),
                ("answer", ColumnValue::Text(r.answer)),
            ],
        }
    }
}

fn check_optional_text(field: &str, value: &Option<String>) -> Result<(), ValidationError> {
    match value {
        Some(v) => check_text(field, v),
        None => Ok(()),
    }
}

/// A stored entry as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: i64,
    pub table: EntryCategory,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: EntryBody,
}

#[derive(Debug, Deserialize)]
struct EntryRow {
    id: i64,
    user_id: String,
    created_at: DateTime<Utc>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Entry {
    /// Build from a `row_to_json` row of the category's table
    pub fn from_row(category: EntryCategory, row: Value) -> serde_json::Result<Self> {
        let row: EntryRow = serde_json::from_value(row)?;
        Ok(Self {
            id: row.id,
            table: category,
            user_id: row.user_id,
            created_at: row.created_at,
            body: EntryBody::decode(category, row.fields)?,
        })
    }

    /// Ordering for listings: newest first, ties broken by id
    pub fn newest_first(a: &Entry, b: &Entry) -> Ordering {
        b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JournalPatch {
    #[serde(default)]
    pub content: Patch<String>,
    #[serde(default)]
    pub content_grateful: Patch<String>,
    #[serde(default)]
    pub content_proud: Patch<String>,
    #[serde(default)]
    pub emotion_color: Patch<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoonPatch {
    #[serde(default)]
    pub let_go: Patch<Value>,
    #[serde(default)]
    pub want: Patch<Value>,
    #[serde(default)]
    pub moon_sign: Patch<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationshipCheckPatch {
    #[serde(default)]
    pub question: Patch<String>,
    #[serde(default)]
    pub answer: Patch<String>,
}

/// Partial update: untouched fields keep their stored value
#[derive(Debug, Clone, PartialEq)]
pub enum EntryPatch {
    Journal(JournalPatch),
    Moon(MoonPatch),
    RelationshipCheck(RelationshipCheckPatch),
}

impl EntryPatch {
    pub fn category(&self) -> EntryCategory {
        match self {
            EntryPatch::Journal(_) => EntryCategory::Journal,
            EntryPatch::Moon(_) => EntryCategory::Moon,
            EntryPatch::RelationshipCheck(_) => EntryCategory::RelationshipCheck,
        }
    }

    pub fn from_fields(category: EntryCategory, fields: Map<String, Value>) -> Result<Self, ValidationError> {
        let value = Value::Object(fields);
        let patch = match category {
            EntryCategory::Journal => EntryPatch::Journal(parse(value)?),
            EntryCategory::Moon => EntryPatch::Moon(parse(value)?),
            EntryCategory::RelationshipCheck => EntryPatch::RelationshipCheck(parse(value)?),
        };
        patch.validate()?;
        Ok(patch)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        match self {
            EntryPatch::Journal(p) => {
                required("content", &p.content)?;
                check_patch_text("content", &p.content)?;
                check_patch_text("content_grateful", &p.content_grateful)?;
                check_patch_text("content_proud", &p.content_proud)?;
                check_patch_text("emotion_color", &p.emotion_color)?;
            }
            EntryPatch::Moon(p) => {
                required("moon_sign", &p.moon_sign)?;
                check_patch_text("moon_sign", &p.moon_sign)?;
            }
            EntryPatch::RelationshipCheck(p) => {
                required("question", &p.question)?;
                check_patch_text("question", &p.question)?;
                check_patch_text("answer", &p.answer)?;
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    /// Column/value pairs that change; `Keep` fields are left out
    pub fn assignments(&self) -> Vec<(&'static str, ColumnValue)> {
        let mut out = Vec::new();
        match self.clone() {
            EntryPatch::Journal(p) => {
                push_text(&mut out, "content", p.content);
                push_text(&mut out, "content_grateful", p.content_grateful);
                push_text(&mut out, "content_proud", p.content_proud);
                push_text(&mut out, "emotion_color", p.emotion_color);
            }
            EntryPatch::Moon(p) => {
                push_json(&mut out, "let_go", p.let_go);
                push_json(&mut out, "want", p.want);
                push_text(&mut out, "moon_sign", p.moon_sign);
            }
            EntryPatch::RelationshipCheck(p) => {
                push_text(&mut out, "question", p.question);
                push_text(&mut out, "answer", p.answer);
            }
        }
        out
    }

    /// Merge into a stored body. Returns false when the categories differ.
    pub fn apply(self, body: &mut EntryBody) -> bool {
        match (self, body) {
            (EntryPatch::Journal(p), EntryBody::Journal(j)) => {
                set_required(p.content, &mut j.content);
                p.content_grateful.apply_to(&mut j.content_grateful);
                p.content_proud.apply_to(&mut j.content_proud);
                p.emotion_color.apply_to(&mut j.emotion_color);
                true
            }
            (EntryPatch::Moon(p), EntryBody::Moon(m)) => {
                p.let_go.apply_to(&mut m.let_go);
                p.want.apply_to(&mut m.want);
                set_required(p.moon_sign, &mut m.moon_sign);
                true
            }
            (EntryPatch::RelationshipCheck(p), EntryBody::RelationshipCheck(r)) => {
                set_required(p.question, &mut r.question);
                p.answer.apply_to(&mut r.answer);
                true
            }
            _ => false,
        }
    }
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T, ValidationError> {
    serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))
}

fn required<T>(field: &str, patch: &Patch<T>) -> Result<(), ValidationError> {
    match patch {
        Patch::Clear => Err(ValidationError::invalid(field, "cannot be null")),
        _ => Ok(()),
    }
}

fn check_patch_text(field: &str, patch: &Patch<String>) -> Result<(), ValidationError> {
    match patch {
        Patch::Set(v) => check_text(field, v),
        _ => Ok(()),
    }
}

fn set_required<T>(patch: Patch<T>, slot: &mut T) {
    if let Patch::Set(v) = patch {
        *slot = v;
    }
}

fn push_text(out: &mut Vec<(&'static str, ColumnValue)>, column: &'static str, patch: Patch<String>) {
    if let Some(v) = patch.into_column() {
        out.push((column, ColumnValue::Text(v)));
    }
}

fn push_json(out: &mut Vec<(&'static str, ColumnValue)>, column: &'static str, patch: Patch<Value>) {
    if let Some(v) = patch.into_column() {
        out.push((column, ColumnValue::Json(v)));
    }
}

/// Pull `table` out of a request body and resolve it
fn split_envelope(value: Value) -> Result<(EntryCategory, Map<String, Value>), ValidationError> {
    let Value::Object(mut fields) = value else {
        return Err(ValidationError::Malformed("expected a JSON object".to_string()));
    };
    let table = match fields.remove("table") {
        Some(Value::String(t)) => t,
        Some(_) => return Err(ValidationError::invalid("table", "must be a string")),
        None => return Err(ValidationError::MissingField("table".to_string())),
    };
    let category = EntryCategory::from_table(&table)?;
    Ok((category, fields))
}

fn reject_reserved(fields: &Map<String, Value>, reserved: &[&str]) -> Result<(), ValidationError> {
    match reserved.iter().find(|r| fields.contains_key(**r)) {
        Some(field) => Err(ValidationError::ReservedField(field.to_string())),
        None => Ok(()),
    }
}

/// `POST /entries` body: `{table, ...fields}`
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry(pub EntryBody);

impl NewEntry {
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        let (category, fields) = split_envelope(value)?;
        reject_reserved(&fields, &RESERVED_FIELDS)?;
        Ok(NewEntry(EntryBody::from_fields(category, fields)?))
    }
}

/// `PUT /entries` body: `{table, id, ...fields}`
#[derive(Debug, Clone, PartialEq)]
pub struct EntryUpdate {
    pub id: i64,
    pub patch: EntryPatch,
}

impl EntryUpdate {
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        let (category, mut fields) = split_envelope(value)?;
        let id = match fields.remove("id") {
            Some(v) => v
                .as_i64()
                .ok_or_else(|| ValidationError::invalid("id", "must be an integer"))?,
            None => return Err(ValidationError::MissingField("id".to_string())),
        };
        reject_reserved(&fields, &RESERVED_FIELDS)?;
        Ok(Self {
            id,
            patch: EntryPatch::from_fields(category, fields)?,
        })
    }

    pub fn category(&self) -> EntryCategory {
        self.patch.category()
    }
}

/// `DELETE /delete` body: `{table, id}`
#[derive(Debug, Clone, Deserialize)]
pub struct EntryRef {
    pub table: String,
    pub id: i64,
}

impl EntryRef {
    pub fn category(&self) -> Result<EntryCategory, ValidationError> {
        EntryCategory::from_table(&self.table)
    }
}
