use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

pub const MISSING_FIELDS: &str =
    "Missing required fields: type, quantity, unit, location, clientId, clientName";
pub const NON_POSITIVE_QUANTITY: &str = "Quantity must be greater than 0";

/// Staff roles. Tagged onto users and tokens; never checked by handlers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub email: String,
}

/// User as returned by login, without the password hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            email: user.email.clone(),
        }
    }
}

/// JWT payload: identity plus issued-at/expiry in unix seconds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Collected,
    Processing,
    Completed,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 4] = [
        ItemStatus::Pending,
        ItemStatus::Collected,
        ItemStatus::Processing,
        ItemStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Collected => "collected",
            ItemStatus::Processing => "processing",
            ItemStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(ValidationError::InvalidStatus)
    }
}

/// A waste-collection record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WasteItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub quantity: i64,
    pub unit: String,
    pub location: String,
    pub client_id: String,
    pub client_name: String,
    pub status: ItemStatus,
    pub collection_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WasteItem {
    /// Builds a fresh `pending` record from validated fields.
    pub fn new(id: String, fields: NewItem) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind: fields.kind,
            quantity: fields.quantity,
            unit: fields.unit,
            location: fields.location,
            client_id: fields.client_id,
            client_name: fields.client_name,
            status: ItemStatus::Pending,
            collection_date: fields.collection_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites only the fields the patch carries, then refreshes `updated_at`.
    pub fn apply(&mut self, patch: ItemPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(client_id) = patch.client_id {
            self.client_id = client_id;
        }
        if let Some(client_name) = patch.client_name {
            self.client_name = client_name;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(collection_date) = patch.collection_date {
            self.collection_date = collection_date;
        }
        self.touch();
    }

    // updated_at must strictly increase even when the clock has not ticked
    fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{}", MISSING_FIELDS)]
    MissingFields,
    #[error("{}", NON_POSITIVE_QUANTITY)]
    NonPositiveQuantity,
    #[error("Invalid status. Must be one of: pending, collected, processing, completed")]
    InvalidStatus,
}

/// Validated input for a new item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub kind: String,
    pub quantity: i64,
    pub unit: String,
    pub location: String,
    pub client_id: String,
    pub client_name: String,
    pub collection_date: Option<String>,
}

/// Body of `POST /api/items`. Any `status` sent by the client is ignored.
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[schema(value_type = Option<i64>)]
    pub quantity: Option<QuantityInput>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub collection_date: Option<String>,
}

impl CreateItemRequest {
    /// Presence is checked before range. `0` and `""` count as absent, so they
    /// report missing fields rather than a range error.
    pub fn validate(self) -> Result<NewItem, ValidationError> {
        let (
            Some(kind),
            Some(quantity),
            Some(unit),
            Some(location),
            Some(client_id),
            Some(client_name),
        ) = (
            non_empty(self.kind),
            self.quantity.filter(|q| !q.is_blank()),
            non_empty(self.unit),
            non_empty(self.location),
            non_empty(self.client_id),
            non_empty(self.client_name),
        )
        else {
            return Err(ValidationError::MissingFields);
        };

        let quantity = quantity
            .positive()
            .ok_or(ValidationError::NonPositiveQuantity)?;

        Ok(NewItem {
            kind,
            quantity,
            unit,
            location,
            client_id,
            client_name,
            collection_date: non_empty(self.collection_date),
        })
    }
}

/// Body of `PUT /api/items/:id`.
///
/// `quantity` and `collectionDate` distinguish an absent key (`None`) from an
/// explicit `null` (`Some(None)`).
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub quantity: Option<Option<QuantityInput>>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub collection_date: Option<Option<String>>,
}

/// Field-by-field change set for an existing item. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub kind: Option<String>,
    pub quantity: Option<i64>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub status: Option<ItemStatus>,
    pub collection_date: Option<Option<String>>,
}

impl UpdateItemRequest {
    pub fn validate(self) -> Result<ItemPatch, ValidationError> {
        let quantity = match self.quantity {
            None => None,
            Some(q) => Some(
                q.and_then(|q| q.positive())
                    .ok_or(ValidationError::NonPositiveQuantity)?,
            ),
        };

        let status = non_empty(self.status)
            .map(|s| s.parse::<ItemStatus>())
            .transpose()?;

        Ok(ItemPatch {
            kind: non_empty(self.kind),
            quantity,
            unit: non_empty(self.unit),
            location: non_empty(self.location),
            client_id: non_empty(self.client_id),
            client_name: non_empty(self.client_name),
            status,
            collection_date: self.collection_date,
        })
    }
}

/// A quantity as clients send it: a JSON number, or a string straight from a
/// form field.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum QuantityInput {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl QuantityInput {
    /// `0` and `""` are treated like an absent value.
    pub fn is_blank(&self) -> bool {
        match self {
            QuantityInput::Integer(n) => *n == 0,
            QuantityInput::Float(n) => *n == 0.0,
            QuantityInput::Text(s) => s.is_empty(),
        }
    }

    /// Whole-number value: fractions are truncated and strings are read up to
    /// the first non-digit (`" 12.5kg"` is 12). `None` if nothing numeric.
    pub fn whole(&self) -> Option<i64> {
        match self {
            QuantityInput::Integer(n) => Some(*n),
            QuantityInput::Float(n) if n.is_finite() => Some(n.trunc() as i64),
            QuantityInput::Float(_) => None,
            QuantityInput::Text(s) => leading_integer(s),
        }
    }

    fn positive(&self) -> Option<i64> {
        self.whole().filter(|q| *q > 0)
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let value = rest[..digits].parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

// Wraps whatever the key holds (including null) in Some; absent keys fall
// back to `#[serde(default)]`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
