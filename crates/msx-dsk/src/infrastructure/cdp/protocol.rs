//! DevTools protocol messages and the pure helpers built on them.
//!
//! # The DevTools protocol (for beginners)
//!
//! Chrome started with `--remote-debugging-port` accepts a WebSocket on which
//! every message is a JSON object.  The client sends *commands*:
//!
//! ```json
//! {"id": 7, "method": "Input.dispatchKeyEvent", "params": {...}, "sessionId": "..."}
//! ```
//!
//! and the browser answers with a *response* carrying the same `id` (either
//! `result` or `error`).  Unprompted *events* have a `method` and no `id`:
//!
//! ```json
//! {"method": "Page.fileChooserOpened", "params": {...}, "sessionId": "..."}
//! ```
//!
//! `sessionId` routes a message to one attached page; browser-level commands
//! (`Target.*`, `Browser.*`) omit it.

use msx_core::keymap::windows_vk::key_to_vk;
use msx_core::KeyCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::application::driver::{Control, PointerButton};

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProtocolError {
    pub code: i64,
    pub message: String,
}

/// Any message received from the browser.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incoming {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<ProtocolError>,
    pub method: Option<String>,
    pub params: Option<Value>,
    pub session_id: Option<String>,
}

/// An event broadcast to every waiting subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

// ── Input helpers ─────────────────────────────────────────────────────────────

/// `Input.dispatchKeyEvent` modifier bits.
pub const MODIFIER_ALT: u32 = 1;
pub const MODIFIER_CTRL: u32 = 2;
pub const MODIFIER_SHIFT: u32 = 8;

/// The modifier bit a host key contributes while held, if any.
pub fn modifier_bit(key: KeyCode) -> u32 {
    match key {
        KeyCode::AltLeft | KeyCode::AltRight => MODIFIER_ALT,
        KeyCode::ControlLeft => MODIFIER_CTRL,
        KeyCode::ShiftLeft => MODIFIER_SHIFT,
        _ => 0,
    }
}

/// Parameters for one `Input.dispatchKeyEvent` call.
///
/// Printable keys get a `text` on key-down so that focused inputs (the code
/// editor, for instance) receive the character; with Ctrl or Alt held the
/// key is a shortcut and carries no text.
pub fn key_event_params(key: KeyCode, down: bool, modifiers: u32) -> Value {
    let vk = key_to_vk(key);
    let mut params = json!({
        "type": if down { "rawKeyDown" } else { "keyUp" },
        "modifiers": modifiers,
        "code": key.dom_code(),
        "key": key.dom_key(),
        "windowsVirtualKeyCode": vk,
        "nativeVirtualKeyCode": vk,
    });
    let shortcut = modifiers & (MODIFIER_ALT | MODIFIER_CTRL) != 0;
    if down && !shortcut {
        let text = match key {
            KeyCode::Enter => Some("\r".to_string()),
            other => other.base_char().map(String::from),
        };
        if let Some(text) = text {
            params["type"] = json!("keyDown");
            params["text"] = json!(text);
            params["unmodifiedText"] = json!(text);
        }
    }
    params
}

pub fn mouse_button_name(button: PointerButton) -> &'static str {
    match button {
        PointerButton::Left => "left",
        PointerButton::Right => "right",
    }
}

// ── Page helpers ──────────────────────────────────────────────────────────────

/// CSS selector locating a control on the MSXPen page.
pub fn selector(control: Control) -> &'static str {
    match control {
        Control::SettingsButton => "#wmsx-bar-settings",
        Control::DiskAButton => "#wmsx-bar-diska",
        Control::InputsMenu => "#wmsx-menu-inputs",
        Control::BackButton => "#wmsx-back",
        Control::KeyboardYen => ".wmsx-keyboard-backslash",
        Control::KeyboardBracketRight => ".wmsx-keyboard-backquote",
        Control::KeyboardBackslash => ".wmsx-keyboard-dead",
        Control::KeyboardCaps => ".wmsx-keyboard-capslock",
        Control::Screen => "#wmsx-screen",
        Control::CodeEditor => ".CodeMirror",
        Control::RunButton => ".btn-full",
    }
}

/// Wraps `body` in a function that finds the control as `e` and returns
/// `null` when it is absent.
fn element_script(control: Control, body: &str) -> String {
    // serde_json gives a correctly escaped JS string literal.
    let sel = Value::from(selector(control)).to_string();
    format!(
        "(() => {{ const e = document.querySelector({sel}); if (!e) return null; {body} }})()"
    )
}

/// A script returning the element's page-space box, for `Page.captureScreenshot`
/// clips.
pub fn page_box_script(control: Control) -> String {
    element_script(
        control,
        "const r = e.getBoundingClientRect(); \
         return { x: r.left + window.scrollX, y: r.top + window.scrollY, \
         width: r.width, height: r.height };",
    )
}

/// A script scrolling the element into view and returning its viewport box,
/// for `Input.dispatchMouseEvent` coordinates.
pub fn click_box_script(control: Control) -> String {
    element_script(
        control,
        "e.scrollIntoView({ block: \"center\", inline: \"center\" }); \
         const r = e.getBoundingClientRect(); \
         return { x: r.left, y: r.top, width: r.width, height: r.height };",
    )
}

/// A script writing `text` to the clipboard.
pub fn clipboard_write_script(text: &str) -> String {
    format!("navigator.clipboard.writeText({})", Value::from(text))
}

/// A rectangle returned by [`page_box_script`] or [`click_box_script`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Extracts the `ws://` URL Chrome prints on stderr once it is listening.
pub fn parse_devtools_url(line: &str) -> Option<&str> {
    const MARKER: &str = "DevTools listening on ";
    let start = line.find(MARKER)? + MARKER.len();
    let url = line[start..].trim();
    url.starts_with("ws://").then_some(url)
}
