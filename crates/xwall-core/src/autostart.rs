//! Launch-at-login through a per-user launch agent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};
use xwall_platform::SystemShell;

pub const LAUNCHCTL: &str = "/bin/launchctl";
pub const SANDBOX_ENV: &str = "APP_SANDBOX_CONTAINER_ID";
pub const LOGIN_ITEMS_URL: &str =
    "x-apple.systempreferences:com.apple.LoginItems-Settings.extension";

#[derive(Debug, Error)]
pub enum AutostartError {
    #[error("no home directory for the launch agent")]
    NoHomeDir,
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutostartOutcome {
    Registered,
    Unregistered,
    /// Sandboxed builds cannot touch launchd; the user was sent to the
    /// login items pane instead.
    SandboxRedirect,
}

/// Launch agent descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchAgent {
    pub label: String,
    pub program: PathBuf,
    pub run_at_load: bool,
    pub keep_alive: bool,
}

impl LaunchAgent {
    pub fn new(label: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            run_at_load: true,
            keep_alive: false,
        }
    }

    pub fn plist_path(&self, agents_dir: &Path) -> PathBuf {
        agents_dir.join(format!("{}.plist", self.label))
    }

    pub fn to_plist(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{program}</string>
    </array>
    <key>RunAtLoad</key>
    <{run_at_load}/>
    <key>KeepAlive</key>
    <{keep_alive}/>
    <key>ProcessType</key>
    <string>Interactive</string>
</dict>
</plist>
"#,
            label = xml_escape(&self.label),
            program = xml_escape(&self.program.to_string_lossy()),
            run_at_load = self.run_at_load,
            keep_alive = self.keep_alive,
        )
    }
}

fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// `~/Library/LaunchAgents`
pub fn default_agents_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("Library").join("LaunchAgents"))
}

pub fn is_sandboxed() -> bool {
    std::env::var_os(SANDBOX_ENV).is_some()
}

/// Registers or removes the agent with launchd.
pub struct Autostart<'a> {
    pub agent: &'a LaunchAgent,
    pub agents_dir: Option<&'a Path>,
    pub uid: u32,
    pub sandboxed: bool,
    pub shell: &'a dyn SystemShell,
}

impl Autostart<'_> {
    pub fn apply(&self, enabled: bool) -> Result<AutostartOutcome, AutostartError> {
        if self.sandboxed {
            info!("sandboxed build; opening login items instead of registering an agent");
            if let Err(err) = self.shell.open(LOGIN_ITEMS_URL) {
                warn!("cannot open login items settings: {err}");
            }
            return Ok(AutostartOutcome::SandboxRedirect);
        }

        let agents_dir = self.agents_dir.ok_or(AutostartError::NoHomeDir)?;
        let plist = self.agent.plist_path(agents_dir);
        let domain = format!("gui/{}", self.uid);
        let plist_arg = plist.to_string_lossy().into_owned();

        if enabled {
            fs::create_dir_all(agents_dir).map_err(|source| AutostartError::Write {
                path: agents_dir.to_path_buf(),
                source,
            })?;
            fs::write(&plist, self.agent.to_plist()).map_err(|source| AutostartError::Write {
                path: plist.clone(),
                source,
            })?;
            self.launchctl(&["bootout", &domain, &plist_arg]);
            self.launchctl(&["bootstrap", &domain, &plist_arg]);
            self.launchctl(&["enable", &format!("{domain}/{}", self.agent.label)]);
            info!("launch agent registered at {}", plist.display());
            Ok(AutostartOutcome::Registered)
        } else {
            self.launchctl(&["bootout", &domain, &plist_arg]);
            if let Err(err) = fs::remove_file(&plist) {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!("cannot remove {}: {err}", plist.display());
                }
            }
            info!("launch agent removed");
            Ok(AutostartOutcome::Unregistered)
        }
    }

    /// Exit codes are informational: bootout fails when nothing is loaded.
    fn launchctl(&self, args: &[&str]) {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        match self.shell.run(LAUNCHCTL, &args) {
            Ok(0) => {}
            Ok(code) => info!("launchctl {} exited with {code}", args.join(" ")),
            Err(err) => warn!("launchctl {} failed: {err}", args.join(" ")),
        }
    }
}
