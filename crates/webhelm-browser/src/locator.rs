//! Port and browser executable discovery.

use std::ffi::OsString;
use std::net::TcpListener;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::BrowserError;

const PATH_NAMES: &[&str] = &[
    "google-chrome",
    "chromium",
    "chromium-browser",
    "msedge",
    "chrome",
];

/// Find the first port in `preferred..preferred + range` that binds on every
/// host in `hosts`.
pub fn find_available_port(preferred: u16, hosts: &[String], range: u16) -> Result<u16, BrowserError> {
    let end = preferred.saturating_add(range.max(1) - 1);

    for port in preferred..=end {
        if hosts.iter().all(|host| is_port_free(host, port)) {
            debug!("Port {} is available", port);
            return Ok(port);
        }
        debug!("Port {} is in use", port);
    }

    Err(BrowserError::NoPortAvailable {
        start: preferred,
        end,
    })
}

fn is_port_free(host: &str, port: u16) -> bool {
    TcpListener::bind((host, port)).is_ok()
}

/// Locate a browser executable.
///
/// Tried in order: the path in environment variable `env_var`, the
/// configured `explicit` path, well-known install locations for this
/// platform, then `PATH`.
pub fn resolve_browser_executable(env_var: &str, explicit: Option<&str>) -> Result<PathBuf, BrowserError> {
    let env_value = if env_var.is_empty() {
        None
    } else {
        std::env::var_os(env_var)
    };
    resolve_from(
        env_var,
        env_value,
        explicit,
        &known_locations(),
        std::env::var_os("PATH"),
    )
}

fn resolve_from(
    env_var: &str,
    env_value: Option<OsString>,
    explicit: Option<&str>,
    known: &[PathBuf],
    path_var: Option<OsString>,
) -> Result<PathBuf, BrowserError> {
    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        let path = PathBuf::from(value);
        if path.is_file() {
            debug!("Using browser from {}: {}", env_var, path.display());
            return Ok(path);
        }
        warn!(
            "{} points at {}, which does not exist; ignoring",
            env_var,
            path.display()
        );
    }

    if let Some(explicit) = explicit.filter(|p| !p.is_empty()) {
        let path = PathBuf::from(explicit);
        if path.is_file() {
            return Ok(path);
        }
        warn!("Configured browser {} does not exist; ignoring", path.display());
    }

    if let Some(path) = known.iter().find(|p| p.is_file()) {
        return Ok(path.clone());
    }

    if let Some(path) = path_var.and_then(|paths| search_path(&paths)) {
        return Ok(path);
    }

    Err(BrowserError::BrowserNotFound(format!(
        "set {} or browser.executable_path, or install Chrome, Chromium or Edge",
        env_var
    )))
}

fn search_path(paths: &OsString) -> Option<PathBuf> {
    for dir in std::env::split_paths(paths) {
        for name in PATH_NAMES {
            let candidate = executable_in(&dir, name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn executable_in(dir: &Path, name: &str) -> PathBuf {
    if cfg!(windows) {
        dir.join(format!("{}.exe", name))
    } else {
        dir.join(name)
    }
}

/// Well-known install locations for the current platform.
pub fn known_locations() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    let paths: &[&str] = &[
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    ];

    #[cfg(target_os = "linux")]
    let paths: &[&str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/usr/bin/microsoft-edge",
    ];

    #[cfg(target_os = "windows")]
    let paths: &[&str] = &[
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    ];

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    let paths: &[&str] = &[];

    let mut locations: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
    locations.extend(per_user_locations());
    locations
}

/// Per-user installs, checked after the system-wide ones.
fn per_user_locations() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .map(|home| {
                vec![
                    home.join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
                    home.join("Applications/Chromium.app/Contents/MacOS/Chromium"),
                ]
            })
            .unwrap_or_default()
    }

    #[cfg(target_os = "windows")]
    {
        dirs::data_local_dir()
            .map(|local| {
                vec![
                    local.join(r"Google\Chrome\Application\chrome.exe"),
                    local.join(r"Chromium\Application\chrome.exe"),
                ]
            })
            .unwrap_or_default()
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Vec::new()
    }
}
