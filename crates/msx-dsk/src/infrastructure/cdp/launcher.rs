//! Starting Chrome / Chromium with remote debugging enabled.
//!
//! The browser is launched with `--remote-debugging-port=0` so it picks a
//! free port, then prints `DevTools listening on ws://...` to stderr.  The
//! launcher reads stderr until that line appears.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::time::timeout;
use tracing::{debug, info, trace};

use super::protocol::parse_devtools_url;
use crate::application::driver::DriverError;

/// How long Chrome may take to print its DevTools URL.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Executable names tried on `PATH` when no path is configured.
const CANDIDATE_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "chrome.exe",
    "msedge",
];

/// Well-known install locations outside `PATH`.
const CANDIDATE_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Browser executable; searched for when `None`.
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub window_size: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            window_size: (1280, 960),
        }
    }
}

/// A running browser process and the DevTools URL it announced.
pub struct LaunchedBrowser {
    pub child: Child,
    pub ws_url: String,
    /// Throwaway profile directory; removed on shutdown.
    pub user_data_dir: PathBuf,
}

/// Finds a browser executable.
///
/// A configured path wins; otherwise `PATH` is searched, then the usual
/// install locations.
///
/// # Errors
///
/// [`DriverError::Browser`] if nothing is found.
pub fn find_chrome(configured: Option<&Path>) -> Result<PathBuf, DriverError> {
    if let Some(path) = configured {
        return match path.components().count() {
            1 => search_path(path.as_os_str()).ok_or_else(|| not_found(path)),
            _ if path.is_file() => Ok(path.to_path_buf()),
            _ => Err(not_found(path)),
        };
    }

    CANDIDATE_NAMES
        .iter()
        .find_map(|name| search_path(OsStr::new(name)))
        .or_else(|| CANDIDATE_PATHS.iter().map(PathBuf::from).find(|p| p.is_file()))
        .ok_or_else(|| {
            DriverError::Browser(
                "no Chrome or Chromium found; set `chrome_path` in the config".into(),
            )
        })
}

fn not_found(path: &Path) -> DriverError {
    DriverError::Browser(format!("browser executable not found: {}", path.display()))
}

fn search_path(name: &OsStr) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Command-line flags for an automation session.
pub fn chrome_args(options: &LaunchOptions, user_data_dir: &Path) -> Vec<String> {
    let (w, h) = options.window_size;
    let mut args = vec![
        "--remote-debugging-port=0".to_string(),
        format!("--user-data-dir={}", user_data_dir.display()),
        format!("--window-size={w},{h}"),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-background-timer-throttling".to_string(),
        "--disable-backgrounding-occluded-windows".to_string(),
        "--disable-renderer-backgrounding".to_string(),
        "--autoplay-policy=no-user-gesture-required".to_string(),
        "about:blank".to_string(),
    ];
    if options.headless {
        args.insert(0, "--headless=new".to_string());
    }
    args
}

/// Launches the browser and waits for its DevTools URL.
///
/// # Errors
///
/// [`DriverError::Browser`] if the process cannot start or exits early,
/// [`DriverError::Timeout`] if no DevTools URL appears in time.
pub async fn launch(options: &LaunchOptions) -> Result<LaunchedBrowser, DriverError> {
    let exe = find_chrome(options.chrome_path.as_deref())?;
    let user_data_dir = std::env::temp_dir().join(format!(
        "msx-dsk-profile-{}-{}",
        std::process::id(),
        chrono::Local::now().format("%Y%m%d%H%M%S%3f")
    ));
    std::fs::create_dir_all(&user_data_dir)?;

    info!("launching {} (headless: {})", exe.display(), options.headless);
    let mut child = Command::new(&exe)
        .args(chrome_args(options, &user_data_dir))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DriverError::Browser(format!("failed to start {}: {e}", exe.display())))?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| DriverError::Browser("browser stderr not captured".into()))?;

    let ws_url = match timeout(STARTUP_TIMEOUT, read_devtools_url(stderr)).await {
        Ok(Ok(url)) => url,
        Ok(Err(e)) => {
            let _ = std::fs::remove_dir_all(&user_data_dir);
            return Err(e);
        }
        Err(_) => {
            let _ = std::fs::remove_dir_all(&user_data_dir);
            return Err(DriverError::Timeout {
                what: "DevTools URL on browser stderr".into(),
                after: STARTUP_TIMEOUT,
            });
        }
    };
    debug!("DevTools at {ws_url}");

    Ok(LaunchedBrowser { child, ws_url, user_data_dir })
}

/// Reads stderr until the DevTools line, then keeps draining it in the
/// background so the browser never blocks on a full pipe.
async fn read_devtools_url(stderr: ChildStderr) -> Result<String, DriverError> {
    let mut lines = BufReader::new(stderr).lines();
    while let Some(line) = lines.next_line().await? {
        trace!("chrome: {line}");
        if let Some(url) = parse_devtools_url(&line) {
            let url = url.to_string();
            tokio::spawn(async move {
                while let Ok(Some(line)) = lines.next_line().await {
                    trace!("chrome: {line}");
                }
            });
            return Ok(url);
        }
    }
    Err(DriverError::Browser("browser exited before announcing DevTools".into()))
}
