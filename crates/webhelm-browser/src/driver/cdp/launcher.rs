//! Chrome process launcher for the CDP driver.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::client::CdpClient;
use super::error::CdpError;
use crate::driver::{BrowserHandle, BrowserLauncher, DriverError, LaunchSpec, PageHandle};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Launches Chrome, Chromium or Edge with remote debugging enabled.
pub struct CdpLauncher {
    call_timeout: Duration,
}

impl CdpLauncher {
    pub fn new(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }

    fn command(spec: &LaunchSpec, executable: &Path, profile_dir: &Path) -> Command {
        let mut cmd = Command::new(executable);
        cmd.arg(format!("--remote-debugging-port={}", spec.port))
            .arg(format!("--user-data-dir={}", profile_dir.display()))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--metrics-recording-only")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        if spec.headless {
            cmd.arg("--headless=new");
        }
        cmd.args(&spec.extra_args);
        cmd.arg("about:blank");
        cmd
    }

    /// Poll `/json/version` until the browser answers or the deadline passes.
    async fn wait_for_endpoint(
        endpoint: &str,
        child: &mut Child,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let start = Instant::now();
        loop {
            if CdpClient::version(endpoint).await.is_ok() {
                return Ok(());
            }
            if let Ok(Some(status)) = child.try_wait() {
                return Err(DriverError::Launch(format!(
                    "browser exited during startup ({})",
                    status
                )));
            }
            if start.elapsed() >= timeout {
                return Err(DriverError::Launch(format!(
                    "browser did not open {} within {} ms",
                    endpoint,
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

impl Default for CdpLauncher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl BrowserLauncher for CdpLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Arc<dyn BrowserHandle>, DriverError> {
        let executable = spec
            .executable
            .as_ref()
            .ok_or_else(|| DriverError::Launch("no browser executable resolved".to_string()))?;

        let (profile_dir, temp_profile) = match &spec.profile_dir {
            Some(dir) => (dir.clone(), None),
            None => {
                let dir = std::env::temp_dir().join(format!("webhelm-profile-{}", spec.port));
                (dir.clone(), Some(dir))
            }
        };
        if let Err(e) = std::fs::create_dir_all(&profile_dir) {
            warn!("Failed to create profile directory: {}", e);
        }

        info!(
            "Launching {} on port {} with profile at {}",
            executable.display(),
            spec.port,
            profile_dir.display()
        );

        let mut child = Self::command(spec, executable, &profile_dir)
            .spawn()
            .map_err(|e| DriverError::Launch(format!("{}: {}", executable.display(), e)))?;
        debug!("Browser launched with PID: {:?}", child.id());

        let endpoint = format!("http://127.0.0.1:{}", spec.port);
        if let Err(e) = Self::wait_for_endpoint(&endpoint, &mut child, spec.launch_timeout).await {
            let _ = child.kill().await;
            return Err(e);
        }

        let attach = async {
            let client = Arc::new(CdpClient::connect(&endpoint, self.call_timeout).await?);
            let page = client.attach_page().await?;
            Ok::<_, CdpError>((client, page))
        };
        let (client, page) = match attach.await {
            Ok(pair) => pair,
            Err(e) => {
                let _ = child.kill().await;
                return Err(e.into());
            }
        };

        info!("Connected to browser at {}", endpoint);
        Ok(Arc::new(CdpBrowser {
            client,
            page: Arc::new(page),
            child: Mutex::new(Some(child)),
            temp_profile,
        }))
    }
}

/// A browser process launched by [`CdpLauncher`].
struct CdpBrowser {
    client: Arc<CdpClient>,
    page: Arc<dyn PageHandle>,
    child: Mutex<Option<Child>>,
    temp_profile: Option<PathBuf>,
}

#[async_trait]
impl BrowserHandle for CdpBrowser {
    fn page(&self) -> Arc<dyn PageHandle> {
        self.page.clone()
    }

    async fn is_alive(&self) -> bool {
        {
            let mut child = self.child.lock().await;
            match child.as_mut().map(|c| c.try_wait()) {
                Some(Ok(None)) => {}
                _ => return false,
            }
        }
        if self.client.is_closed() {
            return false;
        }
        self.client.call("Browser.getVersion", None, None).await.is_ok()
    }

    async fn close(&self) -> Result<(), DriverError> {
        if !self.client.is_closed() {
            if let Err(e) = self.client.call("Browser.close", None, None).await {
                debug!("Browser.close failed: {}", e);
            }
        }

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                debug!("Failed to kill browser process: {}", e);
            }
            info!("Browser process stopped");
        }

        if let Some(dir) = &self.temp_profile {
            if let Err(e) = std::fs::remove_dir_all(dir) {
                debug!("Failed to remove temporary profile {}: {}", dir.display(), e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> LaunchSpec {
        LaunchSpec {
            executable: Some(PathBuf::from("/usr/bin/chromium")),
            port: 9333,
            headless: true,
            profile_dir: None,
            extra_args: vec!["--lang=en-US".to_string()],
            launch_timeout: Duration::from_secs(1),
        }
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_command_args() {
        let spec = spec();
        let exe = spec.executable.clone().unwrap();
        let cmd = CdpLauncher::command(&spec, &exe, &PathBuf::from("/tmp/profile"));
        let args = args(&cmd);

        assert!(args.contains(&"--remote-debugging-port=9333".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--lang=en-US".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
    }

    #[test]
    fn test_command_headed() {
        let mut spec = spec();
        spec.headless = false;
        let exe = spec.executable.clone().unwrap();
        let cmd = CdpLauncher::command(&spec, &exe, &PathBuf::from("/tmp/profile"));
        assert!(!args(&cmd).iter().any(|a| a.starts_with("--headless")));
    }

    #[tokio::test]
    async fn test_launch_without_executable() {
        let mut spec = spec();
        spec.executable = None;
        let err = CdpLauncher::default().launch(&spec).await.err().unwrap();
        assert!(matches!(err, DriverError::Launch(_)));
    }

    #[tokio::test]
    async fn test_launch_missing_binary() {
        let mut spec = spec();
        spec.executable = Some(PathBuf::from("/nonexistent/webhelm-test-browser"));
        let err = CdpLauncher::default().launch(&spec).await.err().unwrap();
        assert!(matches!(err, DriverError::Launch(_)));
    }
}
