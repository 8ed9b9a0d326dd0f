use crate::api::ChatMessage;
use crate::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One entry of a widget conversation, in the shape kept in local storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "message")]
    Text {
        text: String,
        #[serde(rename = "isUser")]
        is_user: bool,
        #[serde(default = "Utc::now", deserialize_with = "lenient_time")]
        time: DateTime<Utc>,
    },
    #[serde(rename = "result")]
    Results {
        #[serde(deserialize_with = "one_or_many")]
        data: Vec<ResultItem>,
        #[serde(default = "Utc::now", deserialize_with = "lenient_time")]
        time: DateTime<Utc>,
    },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::Text {
            text: text.into(),
            is_user: true,
            time: Utc::now(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Message::Text {
            text: text.into(),
            is_user: false,
            time: Utc::now(),
        }
    }

    pub fn results(data: Vec<ResultItem>) -> Self {
        Message::Results {
            data,
            time: Utc::now(),
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        match self {
            Message::Text { time, .. } | Message::Results { time, .. } => *time,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Message::Text { is_user: true, .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Message::Text { text, .. } => Some(text),
            Message::Results { .. } => None,
        }
    }

    /// The turn this entry contributes to the history sent upstream.
    /// Result lists become an assistant turn naming the offered titles.
    pub fn to_turn(&self) -> Option<ChatMessage> {
        match self {
            Message::Text { text, is_user, .. } => Some(ChatMessage {
                role: if *is_user { "user" } else { "assistant" }.to_string(),
                content: text.clone(),
            }),
            Message::Results { data, .. } => {
                let titles: Vec<&str> = data.iter().filter_map(ResultItem::title).collect();
                if titles.is_empty() {
                    return None;
                }
                Some(ChatMessage {
                    role: "assistant".to_string(),
                    content: titles.join("; "),
                })
            }
        }
    }
}

fn lenient_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now))
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<ResultItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(ResultItem::from_value).collect(),
        Value::Null => Vec::new(),
        single => vec![ResultItem::from_value(single)],
    })
}

// ── Result items ──

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Photo {
    Url(String),
    Sizes {
        #[serde(skip_serializing_if = "Option::is_none")]
        sm: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        md: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        lg: Option<String>,
    },
}

impl Photo {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(url) if !url.trim().is_empty() => Some(Photo::Url(url.clone())),
            Value::Object(sizes) => {
                let photo = Photo::Sizes {
                    sm: lenient::text(sizes.get("sm")),
                    md: lenient::text(sizes.get("md")),
                    lg: lenient::text(sizes.get("lg")),
                };
                photo.url().is_some().then_some(photo)
            }
            _ => None,
        }
    }

    /// Smallest available rendition.
    pub fn url(&self) -> Option<&str> {
        match self {
            Photo::Url(url) => Some(url),
            Photo::Sizes { sm, md, lg } => sm.as_deref().or(md.as_deref()).or(lg.as_deref()),
        }
    }
}

/// A business item returned by the backend (typically a bookable listing).
///
/// Every field is optional. Decoding never fails: a mistyped field is
/// treated as absent and unknown fields are carried in `extra` so they
/// survive a save/load cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guests: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<Photo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "bookingUrl", skip_serializing_if = "Option::is_none")]
    pub booking_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const KNOWN_FIELDS: &[&str] = &[
    "id",
    "title",
    "name",
    "price",
    "price_total",
    "full_address",
    "address",
    "location",
    "guests",
    "bedrooms",
    "beds",
    "rating",
    "photos",
    "images",
    "image",
    "bookingUrl",
    "message",
];

impl ResultItem {
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut obj) = value else {
            return Self::default();
        };

        let photos = match obj.get("photos") {
            Some(Value::Array(items)) => items.iter().filter_map(Photo::from_value).collect(),
            _ => Vec::new(),
        };
        let images = match obj.get("images") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| lenient::text(Some(v)))
                .collect(),
            _ => Vec::new(),
        };

        let item = Self {
            id: lenient::text(obj.get("id")),
            title: lenient::text(obj.get("title")),
            name: lenient::text(obj.get("name")),
            price: lenient::amount(obj.get("price")),
            price_total: lenient::amount(obj.get("price_total")),
            full_address: lenient::text(obj.get("full_address")),
            address: lenient::text(obj.get("address")),
            location: lenient::text(obj.get("location")),
            guests: lenient::positive(obj.get("guests")),
            bedrooms: lenient::positive(obj.get("bedrooms")),
            beds: lenient::positive(obj.get("beds")),
            rating: lenient::decimal(obj.get("rating")).filter(|r| *r > 0.0),
            photos,
            images,
            image: lenient::text(obj.get("image")),
            booking_url: lenient::text(obj.get("bookingUrl")),
            message: lenient::text(obj.get("message")),
            extra: Map::new(),
        };

        for key in KNOWN_FIELDS {
            obj.remove(*key);
        }
        Self { extra: obj, ..item }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().or(self.name.as_deref())
    }

    pub fn address(&self) -> Option<&str> {
        self.full_address
            .as_deref()
            .or(self.address.as_deref())
            .or(self.location.as_deref())
    }

    /// Total for the stay wins over the nightly price.
    pub fn price(&self) -> Option<&str> {
        self.price_total.as_deref().or(self.price.as_deref())
    }

    pub fn photo_urls(&self) -> Vec<String> {
        let urls: Vec<String> = self
            .photos
            .iter()
            .filter_map(Photo::url)
            .map(str::to_string)
            .collect();
        if !urls.is_empty() {
            return urls;
        }
        if !self.images.is_empty() {
            return self.images.clone();
        }
        self.image.iter().cloned().collect()
    }

    /// Explicit booking link, else one derived from the item id.
    pub fn booking_link(&self, base_url: &str) -> Option<String> {
        if let Some(url) = &self.booking_url {
            return Some(url.clone());
        }
        let id = self.id.as_deref()?;
        let base = base_url.trim_end_matches('/');
        if id.contains("hotels") {
            Some(format!("{base}/hotels/{id}"))
        } else {
            Some(format!("{base}/rooms/{id}"))
        }
    }
}

impl<'de> Deserialize<'de> for ResultItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(ResultItem::from_value(Value::deserialize(deserializer)?))
    }
}
