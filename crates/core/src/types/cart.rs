//! Server-side saved cart records.
//!
//! These are read-only imports: the client never writes carts back. Fields
//! the client does not act on are read leniently, so an odd timestamp or a
//! stale zero-quantity line never makes the whole record unreadable.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use super::id::{CartId, ProductId, UserId};
use super::quantity::Quantity;

/// One entry of a saved cart, before product resolution.
///
/// `quantity` is kept as sent; see [`SavedCartItem::quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCartItem {
    pub product_id: ProductId,
    #[serde(rename = "quantity")]
    pub raw_quantity: i64,
}

impl SavedCartItem {
    /// The line's quantity, or `None` if the server stored zero or less.
    #[must_use]
    pub fn quantity(&self) -> Option<Quantity> {
        Quantity::try_from(self.raw_quantity).ok()
    }
}

/// A cart previously saved for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCart {
    pub id: CartId,
    pub user_id: UserId,
    /// When the cart was saved, if the server sent a timestamp we can read.
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<DateTime<Utc>>,
    /// Entries in the order the server stored them.
    #[serde(alias = "products", default)]
    pub items: Vec<SavedCartItem>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDate {
    Text(String),
    Other(IgnoredAny),
}

/// Accepts RFC 3339, zone-less date-times (read as UTC) and bare dates.
/// Anything else becomes `None`.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawDate>::deserialize(deserializer)? {
        Some(RawDate::Text(text)) => parse_date(&text),
        Some(RawDate::Other(_)) | None => None,
    })
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|date| date.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}
