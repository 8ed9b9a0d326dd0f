//! View model for the widget transcript.
//!
//! Stored messages and live replies go through the same [`render_message`]
//! so a reloaded conversation looks exactly like the session that wrote it.

use crate::config::WidgetConfig;
use crate::db::models::{Message, ResultItem};
use chrono::{DateTime, Local, Utc};

pub const USER_CLASS: &str = "user";
pub const BOT_CLASS: &str = "bot";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    fn class(self) -> &'static str {
        match self {
            Sender::User => USER_CLASS,
            Sender::Bot => BOT_CLASS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Avatar {
    Image(String),
    /// "AI" badge painted in the primary color.
    Badge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub text: String,
    pub sender: Sender,
    pub avatar: Option<Avatar>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub url: String,
    pub alt: String,
    pub failed: bool,
}

/// Click-to-advance photo strip of a result card.
#[derive(Debug, Clone, PartialEq)]
pub struct Carousel {
    slides: Vec<Slide>,
    current: usize,
}

impl Carousel {
    pub fn new(urls: Vec<String>) -> Option<Self> {
        if urls.is_empty() {
            return None;
        }
        let slides = urls
            .into_iter()
            .enumerate()
            .map(|(idx, url)| Slide {
                url,
                alt: format!("Фото {}", idx + 1),
                failed: false,
            })
            .collect();
        Some(Self { slides, current: 0 })
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Wraps around after the last photo.
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.slides.len();
    }

    pub fn counter(&self) -> String {
        format!("{} / {}", self.current + 1, self.slides.len())
    }

    pub fn offset_percent(&self) -> usize {
        self.current * 100
    }

    pub fn mark_failed(&mut self, idx: usize) {
        if let Some(slide) = self.slides.get_mut(idx) {
            slide.failed = true;
        }
    }

    /// Clears the failure and hands back the URL to load again.
    pub fn retry(&mut self, idx: usize) -> Option<&str> {
        let slide = self.slides.get_mut(idx)?;
        slide.failed = false;
        Some(&slide.url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardMedia {
    Placeholder,
    Carousel(Carousel),
}

/// One rendered result item. Each line is present iff its data is.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultCard {
    pub media: CardMedia,
    pub title: Option<String>,
    pub rating: Option<String>,
    pub address: Option<String>,
    pub info: Option<String>,
    pub price: Option<String>,
    pub booking_url: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardGroup {
    pub cards: Vec<ResultCard>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewItem {
    Bubble(Bubble),
    Cards(CardGroup),
    Typing,
}

impl ViewItem {
    pub fn as_bubble(&self) -> Option<&Bubble> {
        match self {
            ViewItem::Bubble(bubble) => Some(bubble),
            _ => None,
        }
    }

    pub fn as_cards(&self) -> Option<&CardGroup> {
        match self {
            ViewItem::Cards(group) => Some(group),
            _ => None,
        }
    }
}

pub const INFO_SEPARATOR: &str = " • ";
pub const BOOKING_LABEL: &str = "Забронировать";
pub const RETRY_LABEL: &str = "Повторить";

/// Join whichever parts are present; `None` when none are.
pub fn present_only<I>(parts: I, separator: &str) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    let present: Vec<String> = parts.into_iter().flatten().collect();
    (!present.is_empty()).then(|| present.join(separator))
}

pub fn format_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%H:%M").to_string()
}

pub fn render_message(message: &Message, cfg: &WidgetConfig, booking_base: &str) -> ViewItem {
    let timestamp = cfg.show_timestamp.then(|| format_time(message.time()));
    match message {
        Message::Text { text, is_user, .. } => {
            let sender = if *is_user { Sender::User } else { Sender::Bot };
            ViewItem::Bubble(Bubble {
                text: text.clone(),
                sender,
                avatar: avatar_for(sender, cfg),
                timestamp,
            })
        }
        Message::Results { data, .. } => ViewItem::Cards(CardGroup {
            cards: data.iter().map(|item| render_card(item, booking_base)).collect(),
            timestamp,
        }),
    }
}

/// A view-only bot bubble (the welcome greeting), never persisted.
pub fn greeting(text: &str, cfg: &WidgetConfig) -> ViewItem {
    ViewItem::Bubble(Bubble {
        text: text.to_string(),
        sender: Sender::Bot,
        avatar: avatar_for(Sender::Bot, cfg),
        timestamp: None,
    })
}

fn avatar_for(sender: Sender, cfg: &WidgetConfig) -> Option<Avatar> {
    if sender == Sender::User || !cfg.show_avatar {
        return None;
    }
    Some(match &cfg.avatar_url {
        Some(url) => Avatar::Image(url.clone()),
        None => Avatar::Badge,
    })
}

pub fn render_card(item: &ResultItem, booking_base: &str) -> ResultCard {
    let media = match Carousel::new(item.photo_urls()) {
        Some(carousel) => CardMedia::Carousel(carousel),
        None => CardMedia::Placeholder,
    };
    let info = present_only(
        [
            item.guests.map(|n| format!("👥 {n} гостей")),
            item.bedrooms.map(|n| format!("🛏️ {n} спальни")),
            item.beds.map(|n| format!("🛌 {n} кровати")),
        ],
        INFO_SEPARATOR,
    );

    ResultCard {
        media,
        title: item.title().map(str::to_string),
        rating: item.rating.map(|r| format!("{r:.1}")),
        address: item.address().map(str::to_string),
        info,
        price: item.price().map(|p| format!("{p} ₽ за весь период")),
        booking_url: item.booking_link(booking_base),
        note: item.message.clone(),
    }
}

// ── HTML ──

pub(crate) fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(ch),
        }
    }
    output
}

impl ViewItem {
    pub fn to_html(&self, cfg: &WidgetConfig) -> String {
        match self {
            ViewItem::Bubble(bubble) => bubble_html(bubble, cfg),
            // Each card carries its own time line.
            ViewItem::Cards(group) => group
                .cards
                .iter()
                .map(|c| card_html(c, cfg) + &time_html(group.timestamp.as_deref()))
                .collect(),
            ViewItem::Typing => {
                r#"<div class="gpt-typing" id="gpt-typing"><span></span><span></span><span></span></div>"#
                    .to_string()
            }
        }
    }
}

fn time_html(timestamp: Option<&str>) -> String {
    timestamp
        .map(|t| format!(r#"<div class="gpt-time">{}</div>"#, escape_html(t)))
        .unwrap_or_default()
}

fn bubble_html(bubble: &Bubble, cfg: &WidgetConfig) -> String {
    let avatar = match &bubble.avatar {
        Some(Avatar::Image(url)) => format!(
            r#"<img class="gpt-avatar" src="{}" alt="Avatar"/>"#,
            escape_html(url)
        ),
        Some(Avatar::Badge) => format!(
            r#"<div class="gpt-avatar" style="background:{};color:#fff">AI</div>"#,
            escape_html(&cfg.primary_color)
        ),
        None => String::new(),
    };
    format!(
        r#"{avatar}<div class="gpt-msg {}">{}</div>{}"#,
        bubble.sender.class(),
        escape_html(&bubble.text),
        time_html(bubble.timestamp.as_deref())
    )
}

fn card_html(card: &ResultCard, cfg: &WidgetConfig) -> String {
    let color = escape_html(&cfg.primary_color);
    let mut html = String::from(r#"<div class="gpt-msg bot" style="max-width:90%;padding:12px">"#);

    match &card.media {
        CardMedia::Carousel(carousel) => {
            html.push_str(r#"<div class="gpt-slider">"#);
            html.push_str(&format!(
                r#"<div class="gpt-slider-track" style="transform:translateX(-{}%)">"#,
                carousel.offset_percent()
            ));
            for (idx, slide) in carousel.slides().iter().enumerate() {
                if slide.failed {
                    html.push_str(&format!(
                        r#"<div class="gpt-slider-slide">🏠<button class="gpt-retry" data-slide="{idx}">{RETRY_LABEL}</button></div>"#
                    ));
                } else {
                    html.push_str(&format!(
                        r#"<div class="gpt-slider-slide"><img src="{}" alt="{}"/></div>"#,
                        escape_html(&slide.url),
                        escape_html(&slide.alt)
                    ));
                }
            }
            html.push_str(&format!(
                r#"</div><div class="gpt-slider-counter">{}</div></div>"#,
                carousel.counter()
            ));
        }
        CardMedia::Placeholder => {
            html.push_str(r#"<div class="gpt-slider gpt-placeholder"><div class="gpt-slider-slide">🏠</div></div>"#);
        }
    }

    html.push_str(r#"<div style="margin-top:8px">"#);
    if let Some(title) = &card.title {
        html.push_str(&format!(
            r#"<div style="font-weight:600;font-size:14px;margin-bottom:4px">{}</div>"#,
            escape_html(title)
        ));
    }
    if let Some(rating) = &card.rating {
        html.push_str(&format!(
            r#"<div class="gpt-rating" style="font-size:12px;margin-bottom:4px">⭐ {}</div>"#,
            escape_html(rating)
        ));
    }
    if let Some(address) = &card.address {
        html.push_str(&format!(
            r#"<div style="font-size:12px;color:#666;margin-bottom:8px">{}</div>"#,
            escape_html(address)
        ));
    }
    if let Some(info) = &card.info {
        html.push_str(&format!(
            r#"<div style="font-size:12px;margin-bottom:8px">{}</div>"#,
            escape_html(info)
        ));
    }
    if let Some(price) = &card.price {
        html.push_str(&format!(
            r#"<div style="font-size:16px;font-weight:700;color:{color};margin-bottom:8px">{}</div>"#,
            escape_html(price)
        ));
    }
    if let Some(url) = &card.booking_url {
        html.push_str(&format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer" style="display:inline-block;padding:8px 16px;background-color:{color};color:#fff;border-radius:6px;text-decoration:none;font-size:13px;font-weight:600">{BOOKING_LABEL}</a>"#,
            escape_html(url)
        ));
    }
    if let Some(note) = &card.note {
        html.push_str(&format!(
            r#"<div style="margin-top:8px;font-size:13px">{}</div>"#,
            escape_html(note)
        ));
    }
    html.push_str("</div></div>");
    html
}
