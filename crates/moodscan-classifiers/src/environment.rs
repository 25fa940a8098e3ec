//! Deployment environment detection
//!
//! Decides whether the host is constrained enough that the rule-based path
//! should be the default. The decision is made once per detector and cached.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable that overrides detection (`1`/`true` or `0`/`false`)
pub const OVERRIDE_VAR: &str = "MOODSCAN_CONSTRAINED";

/// Hosts with less memory than this are treated as constrained
pub const LOW_MEMORY_BYTES: u64 = 2 * 1024 * 1024 * 1024;

const PLATFORM_VARS: [&str; 5] = [
    "STREAMLIT_SHARING_MODE",
    "STREAMLIT_CLOUD",
    "DYNO",
    "RAILWAY_ENVIRONMENT",
    "RENDER",
];

const HOSTED_DOMAINS: [&str; 4] = ["streamlit.app", "streamlit.io", "streamlit-cloud", "render.com"];

const HOSTED_WORKDIRS: [&str; 3] = ["/app", "/mount/src", "/workspace"];

/// A signal that marks the host as constrained, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSignal {
    /// Set through [`OVERRIDE_VAR`]
    ExplicitOverride,
    /// A hosting platform's marker variable is set
    PlatformVariable,
    /// Home directory belongs to a hosted app runner
    HostedHome,
    /// Hostname under a known hosting domain
    HostedHostname,
    /// Running inside a container
    Container,
    /// Less than [`LOW_MEMORY_BYTES`] of memory
    LowMemory,
    /// Working directory is a typical hosted app mount
    HostedWorkdir,
    /// Home directory is not writable
    ReadOnlyHome,
}

/// Result of environment detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentProfile {
    pub is_constrained: bool,

    /// Every signal that fired, in evaluation order
    pub reasons: Vec<DetectionSignal>,
}

impl EnvironmentProfile {
    pub fn unconstrained() -> Self {
        Self {
            is_constrained: false,
            reasons: Vec::new(),
        }
    }

    pub fn constrained(reasons: Vec<DetectionSignal>) -> Self {
        Self {
            is_constrained: true,
            reasons,
        }
    }

    /// Evaluate every signal against a probe
    pub fn evaluate(probe: &dyn HostProbe) -> Self {
        if let Some(value) = probe.env_var(OVERRIDE_VAR) {
            match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => {
                    return Self::constrained(vec![DetectionSignal::ExplicitOverride])
                }
                "0" | "false" | "no" => return Self::unconstrained(),
                other => tracing::warn!("Ignoring {}={:?}", OVERRIDE_VAR, other),
            }
        }

        let mut reasons = Vec::new();

        let platform = PLATFORM_VARS.iter().any(|var| match probe.env_var(var) {
            Some(value) if *var == "STREAMLIT_SHARING_MODE" => value == "1",
            Some(value) => !value.is_empty(),
            None => false,
        });
        if platform {
            reasons.push(DetectionSignal::PlatformVariable);
        }

        if probe
            .env_var("HOME")
            .is_some_and(|home| home.to_lowercase().contains("streamlit"))
        {
            reasons.push(DetectionSignal::HostedHome);
        }

        if probe.hostname().is_some_and(|host| {
            let host = host.to_lowercase();
            HOSTED_DOMAINS.iter().any(|domain| host.contains(domain))
        }) {
            reasons.push(DetectionSignal::HostedHostname);
        }

        if probe.path_exists(Path::new("/.dockerenv")) {
            reasons.push(DetectionSignal::Container);
        }

        if probe
            .total_memory_bytes()
            .is_some_and(|bytes| bytes < LOW_MEMORY_BYTES)
        {
            reasons.push(DetectionSignal::LowMemory);
        }

        if probe.current_dir().is_some_and(|dir| {
            HOSTED_WORKDIRS
                .iter()
                .any(|prefix| dir.starts_with(prefix))
        }) {
            reasons.push(DetectionSignal::HostedWorkdir);
        }

        if probe.home_writable() == Some(false) {
            reasons.push(DetectionSignal::ReadOnlyHome);
        }

        if reasons.is_empty() {
            Self::unconstrained()
        } else {
            Self::constrained(reasons)
        }
    }
}

/// Source of host facts
pub trait HostProbe: Send + Sync {
    fn env_var(&self, key: &str) -> Option<String>;

    fn hostname(&self) -> Option<String>;

    fn path_exists(&self, path: &Path) -> bool;

    fn total_memory_bytes(&self) -> Option<u64>;

    fn current_dir(&self) -> Option<PathBuf>;

    /// `None` when it cannot be determined
    fn home_writable(&self) -> Option<bool>;
}

/// Reads the real process environment and host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn env_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn hostname(&self) -> Option<String> {
        std::fs::read_to_string("/proc/sys/kernel/hostname")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var("HOSTNAME").ok())
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn total_memory_bytes(&self) -> Option<u64> {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        parse_mem_total(&meminfo)
    }

    fn current_dir(&self) -> Option<PathBuf> {
        std::env::current_dir().ok()
    }

    fn home_writable(&self) -> Option<bool> {
        let home = dirs::home_dir()?;
        Some(dir_writable(&home))
    }
}

/// Whether a file can actually be created in `dir`
fn dir_writable(dir: &Path) -> bool {
    tempfile::tempfile_in(dir).is_ok()
}

/// `MemTotal` from `/proc/meminfo`, in bytes
fn parse_mem_total(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
}

/// Memoizing detector. The first call to [`detect`](Self::detect) evaluates
/// the probe; later calls return the same profile.
pub struct EnvironmentDetector {
    probe: Box<dyn HostProbe>,
    profile: OnceLock<EnvironmentProfile>,
}

impl EnvironmentDetector {
    pub fn new(probe: Box<dyn HostProbe>) -> Self {
        Self {
            probe,
            profile: OnceLock::new(),
        }
    }

    /// Detector over the real host
    pub fn system() -> Self {
        Self::new(Box::new(SystemProbe))
    }

    /// Detector that always reports the given profile
    pub fn fixed(profile: EnvironmentProfile) -> Self {
        Self {
            probe: Box::new(SystemProbe),
            profile: OnceLock::from(profile),
        }
    }

    pub fn detect(&self) -> &EnvironmentProfile {
        self.profile.get_or_init(|| {
            let profile = EnvironmentProfile::evaluate(self.probe.as_ref());
            tracing::info!(
                constrained = profile.is_constrained,
                reasons = ?profile.reasons,
                "Detected deployment environment"
            );
            profile
        })
    }
}

impl std::fmt::Debug for EnvironmentDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentDetector")
            .field("profile", &self.profile.get())
            .finish()
    }
}
