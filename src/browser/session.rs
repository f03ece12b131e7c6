use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::browser::locator::{ElementFacts, Locator, PageAction};
use crate::browser::page::LivePage;
use crate::enrich::dom_candidate::DomCandidate;
use crate::error::SessionError;

pub const DEFAULT_SERVER_SCRIPT: &str = "node/browser_server.js";

/// Request sent to browser_server.js over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BrowserRequest<'a> {
    Navigate {
        cmd: &'static str,
        url: &'a str,
    },
    Candidates {
        cmd: &'static str,
    },
    Locate {
        cmd: &'static str,
        locator: &'a Locator,
        timeout_ms: u64,
    },
    Act {
        cmd: &'static str,
        locator: &'a Locator,
        #[serde(flatten)]
        action: &'a PageAction,
        timeout_ms: u64,
    },
    Wait {
        cmd: &'static str,
        duration_ms: u64,
    },
    CurrentUrl {
        cmd: &'static str,
    },
    Quit {
        cmd: &'static str,
    },
}

impl<'a> BrowserRequest<'a> {
    /// Load `url` in the session page.
    pub fn navigate(url: &'a str) -> Self {
        BrowserRequest::Navigate { cmd: "navigate", url }
    }

    /// Collect visible interactive elements as `DomCandidate`s.
    pub fn candidates() -> Self {
        BrowserRequest::Candidates { cmd: "candidates" }
    }

    /// Count matches for `locator` and report the first one's state.
    pub fn locate(locator: &'a Locator, timeout: Duration) -> Self {
        BrowserRequest::Locate {
            cmd: "locate",
            locator,
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Perform `action` on the first match of `locator`.
    pub fn act(locator: &'a Locator, action: &'a PageAction, timeout: Duration) -> Self {
        BrowserRequest::Act {
            cmd: "act",
            locator,
            action,
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Sleep inside the page for `duration_ms`.
    pub fn wait(duration_ms: u64) -> Self {
        BrowserRequest::Wait { cmd: "wait", duration_ms }
    }

    /// Ask for the page URL after redirects.
    pub fn current_url() -> Self {
        BrowserRequest::CurrentUrl { cmd: "current_url" }
    }

    /// Close the browser and end the server process.
    pub fn quit() -> Self {
        BrowserRequest::Quit { cmd: "quit" }
    }
}

/// Response received from browser_server.js over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    /// Whether the command succeeded
    pub ok: bool,

    /// Driver error text when `ok` is false
    #[serde(default)]
    pub error: Option<String>,

    /// Command payload (candidate list for `candidates`)
    #[serde(default)]
    pub data: Option<Value>,

    /// Page URL after `navigate` or `current_url`
    #[serde(default)]
    pub url: Option<String>,

    /// Set on the first line once the browser is up
    #[serde(default)]
    pub ready: Option<bool>,

    /// Number of elements a `locate` matched
    #[serde(default)]
    pub count: Option<u32>,

    /// Visibility of the first match
    #[serde(default)]
    pub visible: Option<bool>,

    /// Whether the first match accepts input
    #[serde(default)]
    pub editable: Option<bool>,
}

/// A persistent browser session backed by browser_server.js.
///
/// Launches a long-lived Node.js process that keeps a Chromium page open.
/// Commands are sent as NDJSON over stdin, responses read from stdout.
pub struct BrowserSession {
    child: Child,
    /// Requests go here, one JSON line each
    stdin: std::process::ChildStdin,
    /// Responses come back here, one JSON line each
    reader: BufReader<std::process::ChildStdout>,
    /// Last URL the server reported
    current_url: Option<String>,
    /// Set once `quit` ran, so drop does not send it twice
    closed: bool,
}

impl BrowserSession {
    /// Spawn `node <script>` and wait for its ready line.
    pub fn launch(script: &str, headless: bool) -> Result<Self, SessionError> {
        let mut child = Command::new("node")
            .arg(script)
            .env("HEADLESS", if headless { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| SessionError::Spawn {
                script: script.to_string(),
                source: e,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::Io(format!("failed to capture stdin of {}", script)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::Io(format!("failed to capture stdout of {}", script)))?;

        let mut reader = BufReader::new(stdout);

        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| SessionError::Io(format!("failed to read ready signal: {}", e)))?;

        let response: BrowserResponse = serde_json::from_str(line.trim()).map_err(|e| SessionError::Json {
            context: "browser server ready signal".into(),
            source: e,
        })?;

        if !response.ok || response.ready != Some(true) {
            return Err(SessionError::Protocol {
                command: "launch".into(),
                error: response.error.unwrap_or_else(|| "no ready signal from browser server".into()),
            });
        }

        debug!(script, headless, "browser session ready");
        Ok(BrowserSession {
            child,
            stdin,
            reader,
            current_url: None,
            closed: false,
        })
    }

    /// Send a request and read the response.
    fn send(&mut self, request: &BrowserRequest<'_>) -> Result<BrowserResponse, SessionError> {
        let json = serde_json::to_string(request).map_err(|e| SessionError::Json {
            context: "browser request".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json)
            .map_err(|e| SessionError::Io(format!("failed to write to browser server: {}", e)))?;
        self.stdin
            .flush()
            .map_err(|e| SessionError::Io(format!("failed to flush browser server stdin: {}", e)))?;

        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| SessionError::Io(format!("failed to read from browser server: {}", e)))?;

        if line.trim().is_empty() {
            return Err(SessionError::Io(
                "empty response from browser server (process may have died)".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| SessionError::Json {
            context: "browser server response".into(),
            source: e,
        })
    }

    /// Send a request and verify it succeeded.
    fn send_ok(&mut self, request: &BrowserRequest<'_>, command: &str) -> Result<BrowserResponse, SessionError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(SessionError::Protocol {
                command: command.into(),
                error: response.error.unwrap_or_else(|| "unknown error".into()),
            });
        }
        Ok(response)
    }

    /// Last URL seen by this session, without a round trip.
    pub fn last_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Quit the browser session. Best effort.
    pub fn quit(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(e) = self.send(&BrowserRequest::quit()) {
            debug!(error = %e, "quit command not acknowledged");
        }
        if let Err(e) = self.child.wait() {
            warn!(error = %e, "browser server did not exit cleanly");
        }
        Ok(())
    }
}

impl LivePage for BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.send_ok(&BrowserRequest::navigate(url), "navigate")?;
        self.current_url = Some(url.to_string());
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, SessionError> {
        let response = self.send_ok(&BrowserRequest::current_url(), "current_url")?;
        let url = response.url.ok_or_else(|| SessionError::Protocol {
            command: "current_url".into(),
            error: "no url in response".into(),
        })?;
        self.current_url = Some(url.clone());
        Ok(url)
    }

    fn extract_candidates(&mut self) -> Result<Vec<DomCandidate>, SessionError> {
        let response = self.send_ok(&BrowserRequest::candidates(), "candidates")?;
        let data = response.data.ok_or_else(|| SessionError::Protocol {
            command: "candidates".into(),
            error: "no data in response".into(),
        })?;
        serde_json::from_value(data).map_err(|e| SessionError::Json {
            context: "dom candidates".into(),
            source: e,
        })
    }

    fn locate(&mut self, locator: &Locator, timeout: Duration) -> Result<ElementFacts, SessionError> {
        let response = self.send_ok(&BrowserRequest::locate(locator, timeout), "locate")?;
        Ok(ElementFacts {
            count: response.count.unwrap_or(0),
            visible: response.visible.unwrap_or(false),
            editable: response.editable.unwrap_or(false),
        })
    }

    fn perform(&mut self, locator: &Locator, action: &PageAction, timeout: Duration) -> Result<(), SessionError> {
        self.send_ok(&BrowserRequest::act(locator, action, timeout), "act")?;
        Ok(())
    }

    fn wait(&mut self, duration_ms: u64) -> Result<(), SessionError> {
        self.send_ok(&BrowserRequest::wait(duration_ms), "wait")?;
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}
