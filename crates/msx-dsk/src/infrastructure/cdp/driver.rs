//! [`EmulatorDriver`] over the Chrome DevTools Protocol.
//!
//! # Session setup
//!
//! 1. Launch the browser (see [`super::launcher`]) and connect to its
//!    browser-level WebSocket.
//! 2. `Target.createTarget` opens a page; `Target.attachToTarget` with
//!    `flatten: true` returns a `sessionId` that routes page commands over the
//!    same socket.
//! 3. Enable page events, intercept file choosers, grant clipboard access and
//!    send downloads to a private directory under their GUID.
//!
//! # Downloads and uploads
//!
//! Both are triggered by a key stroke inside the emulator.  The driver
//! subscribes to events first, presses the keys, then waits:
//!
//! - download: `Browser.downloadWillBegin` gives the GUID,
//!   `Browser.downloadProgress` with `state: "completed"` means the file
//!   `<download_dir>/<guid>` is complete and is moved to the requested path.
//! - upload: `Page.fileChooserOpened` gives the input's `backendNodeId`,
//!   answered with `DOM.setFileInputFiles`.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use msx_core::{KeyCode, Screenshot};
use serde_json::{json, Value};
use tokio::process::Child;
use tracing::{debug, info, warn};

use super::connection::{wait_for_event, CdpConnection};
use super::image::decode_screenshot;
use super::launcher::{launch, LaunchOptions};
use super::protocol::{
    click_box_script, clipboard_write_script, key_event_params, modifier_bit,
    mouse_button_name, page_box_script, BoundingBox,
};
use crate::application::driver::{Control, DriverError, EmulatorDriver, KeyStroke, PointerButton};
use crate::application::pacing::pause;

/// How long a download may take from trigger to completion.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
/// How long a page load may take.
const LOAD_TIMEOUT: Duration = Duration::from_secs(60);
/// Settle time between focusing the editor and pasting.
const PASTE_FOCUS_DELAY: Duration = Duration::from_millis(50);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ChromeDriver {
    conn: CdpConnection,
    session_id: String,
    /// `Input.dispatchKeyEvent` modifier bits for the keys currently held.
    modifiers: Mutex<u32>,
    download_dir: PathBuf,
    user_data_dir: PathBuf,
    child: tokio::sync::Mutex<Option<Child>>,
}

impl ChromeDriver {
    /// Launches a browser and prepares one page for automation.
    ///
    /// # Errors
    ///
    /// Any [`DriverError`] from launching, connecting or the setup commands.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, DriverError> {
        let browser = launch(options).await?;
        let conn = CdpConnection::connect(&browser.ws_url).await?;

        let target = conn
            .send("Target.createTarget", json!({ "url": "about:blank" }), None)
            .await?;
        let target_id = str_field(&target, "targetId")?;
        let attached = conn
            .send(
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
                None,
            )
            .await?;
        let session_id = str_field(&attached, "sessionId")?.to_string();

        let download_dir = browser.user_data_dir.join("downloads");
        std::fs::create_dir_all(&download_dir)?;

        let driver = Self {
            conn,
            session_id,
            modifiers: Mutex::new(0),
            download_dir,
            user_data_dir: browser.user_data_dir,
            child: tokio::sync::Mutex::new(Some(browser.child)),
        };
        driver.prepare_page().await?;
        Ok(driver)
    }

    async fn prepare_page(&self) -> Result<(), DriverError> {
        self.page("Page.enable", json!({})).await?;
        self.page("Page.setInterceptFileChooserDialog", json!({ "enabled": true }))
            .await?;
        self.browser(
            "Browser.setDownloadBehavior",
            json!({
                "behavior": "allowAndName",
                "downloadPath": self.download_dir.to_string_lossy(),
                "eventsEnabled": true,
            }),
        )
        .await?;
        self.browser(
            "Browser.grantPermissions",
            json!({ "permissions": ["clipboardReadWrite", "clipboardSanitizedWrite"] }),
        )
        .await?;
        Ok(())
    }

    async fn page(&self, method: &str, params: Value) -> Result<Value, DriverError> {
        self.conn.send(method, params, Some(&self.session_id)).await
    }

    async fn browser(&self, method: &str, params: Value) -> Result<Value, DriverError> {
        self.conn.send(method, params, None).await
    }

    /// Evaluates `expression` in the page and returns its JSON value.
    async fn evaluate(&self, expression: &str, await_promise: bool) -> Result<Value, DriverError> {
        let reply = self
            .page(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": await_promise,
                    "userGesture": true,
                }),
            )
            .await?;
        if let Some(details) = reply.get("exceptionDetails") {
            return Err(DriverError::Protocol(format!("script failed: {details}")));
        }
        Ok(reply["result"].get("value").cloned().unwrap_or(Value::Null))
    }

    async fn element_box(
        &self,
        control: Control,
        script: String,
    ) -> Result<BoundingBox, DriverError> {
        let value = self.evaluate(&script, false).await?;
        if value.is_null() {
            return Err(DriverError::ControlNotFound(control));
        }
        serde_json::from_value(value).map_err(|e| DriverError::Protocol(e.to_string()))
    }

    async fn dispatch_key(&self, key: KeyCode, down: bool) -> Result<(), DriverError> {
        let bit = modifier_bit(key);
        // A modifier's own key-down already reports itself as held.
        let modifiers = {
            let mut held = lock(&self.modifiers);
            if down {
                *held |= bit;
            }
            let current = *held;
            if !down {
                *held &= !bit;
            }
            current
        };
        self.page("Input.dispatchKeyEvent", key_event_params(key, down, modifiers))
            .await?;
        Ok(())
    }

    async fn press_stroke(&self, stroke: &KeyStroke) -> Result<(), DriverError> {
        for &m in &stroke.modifiers {
            self.dispatch_key(m, true).await?;
        }
        self.dispatch_key(stroke.key, true).await?;
        self.dispatch_key(stroke.key, false).await?;
        for &m in stroke.modifiers.iter().rev() {
            self.dispatch_key(m, false).await?;
        }
        Ok(())
    }

    async fn wait_for_load<F, Fut>(&self, start: F) -> Result<(), DriverError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Value, DriverError>>,
    {
        let mut events = self.conn.subscribe();
        start().await?;
        let session = self.session_id.clone();
        wait_for_event(&mut events, "Page.loadEventFired", LOAD_TIMEOUT, "page load", |e| {
            e.session_id.as_deref() == Some(session.as_str())
        })
        .await?;
        Ok(())
    }
}

fn str_field<'a>(value: &'a Value, field: &str) -> Result<&'a str, DriverError> {
    value[field]
        .as_str()
        .ok_or_else(|| DriverError::Protocol(format!("reply has no `{field}`: {value}")))
}

/// Moves a finished download, copying when the target is on another device.
async fn move_file(from: &Path, to: &Path) -> Result<(), DriverError> {
    if tokio::fs::rename(from, to).await.is_err() {
        tokio::fs::copy(from, to).await?;
        tokio::fs::remove_file(from).await?;
    }
    Ok(())
}

#[async_trait]
impl EmulatorDriver for ChromeDriver {
    async fn press_key(&self, key: KeyCode, hold: Duration) -> Result<(), DriverError> {
        self.dispatch_key(key, true).await?;
        pause(hold).await;
        self.dispatch_key(key, false).await
    }

    async fn key_down(&self, key: KeyCode) -> Result<(), DriverError> {
        self.dispatch_key(key, true).await
    }

    async fn key_up(&self, key: KeyCode) -> Result<(), DriverError> {
        self.dispatch_key(key, false).await
    }

    async fn click(&self, control: Control, button: PointerButton) -> Result<(), DriverError> {
        let target = self.element_box(control, click_box_script(control)).await?;
        let (x, y) = target.center();
        let button = mouse_button_name(button);
        self.page("Input.dispatchMouseEvent", json!({ "type": "mouseMoved", "x": x, "y": y }))
            .await?;
        for kind in ["mousePressed", "mouseReleased"] {
            self.page(
                "Input.dispatchMouseEvent",
                json!({ "type": kind, "x": x, "y": y, "button": button, "clickCount": 1 }),
            )
            .await?;
        }
        debug!("clicked {control} ({button})");
        Ok(())
    }

    async fn paste_text(&self, control: Control, text: &str) -> Result<(), DriverError> {
        self.evaluate(&clipboard_write_script(text), true).await?;
        self.click(control, PointerButton::Left).await?;
        pause(PASTE_FOCUS_DELAY).await;
        self.press_stroke(&KeyStroke::key(KeyCode::KeyV).with_modifier(KeyCode::ControlLeft))
            .await
    }

    async fn screenshot(&self, control: Control) -> Result<Screenshot, DriverError> {
        let b = self.element_box(control, page_box_script(control)).await?;
        let reply = self
            .page(
                "Page.captureScreenshot",
                json!({
                    "format": "png",
                    "clip": { "x": b.x, "y": b.y, "width": b.width, "height": b.height, "scale": 1 },
                }),
            )
            .await?;
        decode_screenshot(str_field(&reply, "data")?)
    }

    async fn download(&self, trigger: KeyStroke, path: &Path) -> Result<(), DriverError> {
        let mut events = self.conn.subscribe();
        self.press_stroke(&trigger).await?;

        let begin = wait_for_event(
            &mut events,
            "Browser.downloadWillBegin",
            DOWNLOAD_TIMEOUT,
            &format!("download started by {trigger}"),
            |_| true,
        )
        .await?;
        let guid = str_field(&begin.params, "guid")?.to_string();

        let done = wait_for_event(
            &mut events,
            "Browser.downloadProgress",
            DOWNLOAD_TIMEOUT,
            &format!("download {guid} to finish"),
            |e| {
                e.params["guid"] == guid.as_str()
                    && matches!(e.params["state"].as_str(), Some("completed" | "canceled"))
            },
        )
        .await?;
        if done.params["state"] == "canceled" {
            return Err(DriverError::Browser(format!("download {guid} was canceled")));
        }

        move_file(&self.download_dir.join(&guid), path).await?;
        debug!("downloaded {}", path.display());
        Ok(())
    }

    async fn upload(
        &self,
        trigger: KeyStroke,
        path: &Path,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let file = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let mut events = self.conn.subscribe();
        self.press_stroke(&trigger).await?;

        let session = self.session_id.clone();
        let opened = wait_for_event(
            &mut events,
            "Page.fileChooserOpened",
            timeout,
            "file chooser",
            |e| e.session_id.as_deref() == Some(session.as_str()),
        )
        .await?;
        let node = opened.params["backendNodeId"].clone();
        if node.is_null() {
            return Err(DriverError::Protocol("file chooser without backendNodeId".into()));
        }

        self.page(
            "DOM.setFileInputFiles",
            json!({ "files": [file.to_string_lossy()], "backendNodeId": node }),
        )
        .await?;
        debug!("uploaded {}", file.display());
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.wait_for_load(|| self.page("Page.navigate", json!({ "url": url })))
            .await
    }

    async fn reload(&self) -> Result<(), DriverError> {
        self.wait_for_load(|| self.page("Page.reload", json!({}))).await
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        if let Err(e) = self.browser("Browser.close", json!({})).await {
            debug!("Browser.close failed: {e}");
        }
        self.conn.close().await;

        if let Some(mut child) = self.child.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
                Ok(_) => {}
                Err(_) => {
                    warn!("browser did not exit, killing it");
                    child.kill().await?;
                }
            }
        }
        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            debug!("could not remove {}: {e}", self.user_data_dir.display());
        }
        info!("browser closed");
        Ok(())
    }
}
