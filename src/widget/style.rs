use super::render::escape_html;
use crate::config::{Theme, WidgetConfig};

/// Colors that differ between the light and dark themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    pub message_bg: &'static str,
    pub border: &'static str,
    pub time: &'static str,
    pub typing_dot: &'static str,
}

pub const LIGHT: Palette = Palette {
    background: "#ffffff",
    text: "#000000",
    message_bg: "#f0f0f0",
    border: "#e0e0e0",
    time: "#666",
    typing_dot: "#999",
};

pub const DARK: Palette = Palette {
    background: "#1a1a1a",
    text: "#ffffff",
    message_bg: "#2a2a2a",
    border: "#333333",
    time: "#888",
    typing_dot: "#666",
};

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => DARK,
            Theme::Light | Theme::Auto => LIGHT,
        }
    }
}

/// Scoped stylesheet for one widget instance.
pub fn stylesheet(cfg: &WidgetConfig) -> String {
    let palette = Palette::for_theme(cfg.theme);
    let mut css = base_rules(cfg, &palette);
    if cfg.theme == Theme::Auto {
        css.push_str("@media (prefers-color-scheme: dark){");
        css.push_str(&palette_rules(cfg, &DARK));
        css.push('}');
    }
    css
}

fn base_rules(cfg: &WidgetConfig, p: &Palette) -> String {
    let color = &cfg.primary_color;
    let radius = cfg.border_radius;
    let mut css = String::new();

    css.push_str(&format!(
        ".gpt-widget{{position:fixed;{}z-index:999999!important;font-family:-apple-system,BlinkMacSystemFont,\"Segoe UI\",Roboto,sans-serif}}",
        cfg.position.offsets()
    ));
    css.push_str(&format!(
        ".gpt-btn{{cursor:pointer;padding:14px 24px;border-radius:{radius}px;background:{color};color:#fff;border:none;font-size:15px;font-weight:600;box-shadow:0 4px 16px rgba(0,0,0,0.15);display:flex;align-items:center;gap:8px;transition:all 0.2s}}"
    ));
    css.push_str(".gpt-btn:hover{transform:translateY(-2px);box-shadow:0 6px 20px rgba(0,0,0,0.2)}");
    css.push_str(".gpt-overlay{display:none;position:fixed;top:0;left:0;right:0;bottom:0;background:rgba(0,0,0,0);z-index:999998!important;backdrop-filter:blur(0px);transition:background 0.3s ease,backdrop-filter 0.3s ease}");
    css.push_str(".gpt-overlay.open{display:block;background:rgba(0,0,0,0.5);backdrop-filter:blur(2px)}");
    css.push_str(&format!(
        ".gpt-window{{display:none;width:{}px;height:{}px;border-radius:{radius}px;box-shadow:0 8px 32px rgba(0,0,0,0.2);flex-direction:column;overflow:hidden;opacity:0;transform:scale(0.95);transition:opacity 0.3s ease,transform 0.3s ease}}",
        cfg.width, cfg.height
    ));
    css.push_str(".gpt-window.modal{position:fixed;top:50%;left:50%;transform:translate(-50%,-50%) scale(0.95);z-index:999999!important}");
    css.push_str(".gpt-window.modal.open{transform:translate(-50%,-50%) scale(1);opacity:1}");
    css.push_str(".gpt-window.open{display:flex;opacity:1;transform:scale(1)}");
    css.push_str(&format!(
        ".gpt-header{{padding:16px 20px;background:{color};color:#fff;font-weight:600;display:flex;justify-content:space-between;align-items:center;font-size:16px}}"
    ));
    css.push_str(".gpt-close{cursor:pointer;background:rgba(255,255,255,0.2);border:none;color:#fff;font-size:24px;width:32px;height:32px;border-radius:50%;display:flex;align-items:center;justify-content:center;transition:background 0.2s}");
    css.push_str(".gpt-close:hover{background:rgba(255,255,255,0.3)}");
    css.push_str(".gpt-messages{flex:1;overflow-y:auto;padding:16px;display:flex;flex-direction:column;gap:12px}");
    css.push_str(".gpt-messages::-webkit-scrollbar{width:6px}");
    css.push_str(&format!(
        ".gpt-send{{padding:12px 20px;background:{color};color:#fff;border:none;border-radius:12px;cursor:pointer;font-weight:600;transition:opacity 0.2s}}"
    ));
    css.push_str(".gpt-send:hover{opacity:0.9}");
    css.push_str(".gpt-send:disabled{opacity:0.5;cursor:not-allowed}");
    css.push_str(".gpt-msg{max-width:75%;padding:10px 16px;border-radius:16px;font-size:14px;line-height:1.5;word-wrap:break-word}");
    css.push_str(&format!(
        ".gpt-msg.user{{background:{color};color:#fff;align-self:flex-end;border-bottom-right-radius:4px}}"
    ));
    css.push_str(".gpt-avatar{width:24px;height:24px;border-radius:50%;display:flex;align-items:center;justify-content:center;font-size:11px;align-self:flex-start}");
    css.push_str(".gpt-typing span{width:8px;height:8px;border-radius:50%;animation:typing 1.4s infinite}");
    css.push_str(".gpt-typing span:nth-child(2){animation-delay:0.2s}");
    css.push_str(".gpt-typing span:nth-child(3){animation-delay:0.4s}");
    css.push_str("@keyframes typing{0%,60%,100%{opacity:0.3}30%{opacity:1}}");
    css.push_str(".gpt-slider{position:relative;width:100%;height:150px;border-radius:8px;margin-bottom:8px;overflow:hidden;cursor:pointer}");
    css.push_str(".gpt-slider-track{display:flex;height:100%;transition:transform 0.3s ease}");
    css.push_str(&format!(
        ".gpt-slider-slide{{min-width:100%;height:100%;flex-shrink:0;background:linear-gradient(135deg,{color}10,{color}20);display:flex;align-items:center;justify-content:center;font-size:32px;flex-direction:column;gap:8px}}"
    ));
    css.push_str(".gpt-slider-slide img{width:100%;height:100%;object-fit:cover;background:transparent}");
    css.push_str(".gpt-slider-counter{position:absolute;bottom:8px;right:8px;background:rgba(0,0,0,0.6);color:#fff;padding:4px 10px;border-radius:12px;font-size:12px;font-weight:600;z-index:1}");
    css.push_str(&format!(
        ".gpt-retry{{font-size:12px;padding:4px 10px;border:none;border-radius:6px;background:{color};color:#fff;cursor:pointer}}"
    ));
    css.push_str(&palette_rules(cfg, p));
    css
}

/// Rules that only vary with the palette, so the auto theme can re-emit
/// them inside a media query.
fn palette_rules(cfg: &WidgetConfig, p: &Palette) -> String {
    format!(
        ".gpt-window{{background:{bg}}}\
         .gpt-messages::-webkit-scrollbar-thumb{{background:{border};border-radius:3px}}\
         .gpt-input-area{{padding:16px;border-top:1px solid {border};display:flex;gap:8px}}\
         .gpt-input{{flex:1;padding:12px 16px;border:1px solid {border};border-radius:12px;font-size:14px;background:{msg};color:{text};outline:none}}\
         .gpt-msg.bot{{background:{msg};color:{text};align-self:flex-start;border-bottom-left-radius:4px}}\
         .gpt-time{{font-size:11px;color:{time};margin-top:4px;padding:0 4px}}\
         .gpt-typing{{display:flex;gap:4px;padding:10px 16px;background:{msg};border-radius:16px;width:fit-content}}\
         .gpt-typing span{{background:{dot}}}\
         .gpt-input:focus{{border-color:{color}}}",
        bg = p.background,
        border = p.border,
        msg = p.message_bg,
        text = p.text,
        time = p.time,
        dot = p.typing_dot,
        color = cfg.primary_color,
    )
}

/// Static markup of the widget: panel, launcher button and, for the
/// centered modal, the dimming overlay.
pub fn shell_html(cfg: &WidgetConfig, open: bool) -> String {
    let caption = escape_html(&cfg.caption());
    let mut window_class = String::from("gpt-window");
    if cfg.is_modal() {
        window_class.push_str(" modal");
    }
    if open {
        window_class.push_str(" open");
    }

    let overlay = if cfg.is_modal() {
        format!(
            r#"<div class="gpt-overlay{}" id="gpt-overlay"></div>"#,
            if open { " open" } else { "" }
        )
    } else {
        String::new()
    };

    format!(
        r#"{overlay}<div class="gpt-widget"><div class="{window_class}" id="gpt-win"><div class="gpt-header"><span id="gpt-header-text">{caption}</span><button class="gpt-close" id="gpt-close-btn">×</button></div><div class="gpt-messages" id="gpt-msgs"></div><div class="gpt-input-area"><input type="text" class="gpt-input" id="gpt-input" placeholder="{}"/><button class="gpt-send" id="gpt-send-btn">Отправить</button></div></div><button class="gpt-btn" id="gpt-open-btn"><span id="gpt-btn-text">{caption}</span></button></div>"#,
        escape_html(&cfg.placeholder)
    )
}
