//! Capability detection for device signals.
//!
//! Every signal is read through [`SignalSource`] and comes back as a
//! [`Capability`]: either the value, a note that the facility does not exist on
//! this host, or the error it raised. The collector resolves each one to its
//! documented fallback independently, so one broken probe never hides the rest.

use chrono::Local;
use std::{env, fmt::Display, thread};
use tracing::debug;

/// Outcome of probing a single signal.
#[derive(Clone, Debug, PartialEq)]
pub enum Capability<T> {
    Available(T),
    /// The facility does not exist here (no display, no audio stack).
    Missing,
    /// The facility exists but the probe failed or was blocked.
    Failed(String),
}

impl<T> Capability<T> {
    /// Wraps a fallible probe result.
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Capability::Available(value),
            Err(err) => Capability::Failed(err.to_string()),
        }
    }

    /// Wraps an optional probe result; `None` means the facility is missing.
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Capability::Missing, Capability::Available)
    }

    /// Treats an available value rejected by `accept` as missing.
    #[must_use]
    pub fn filter(self, accept: impl FnOnce(&T) -> bool) -> Self {
        match self {
            Capability::Available(value) if !accept(&value) => Capability::Missing,
            other => other,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }

    /// Returns the probed value or `fallback`, logging why the fallback was used.
    pub fn resolve(self, signal: &'static str, fallback: T) -> T {
        match self {
            Capability::Available(value) => value,
            Capability::Missing => {
                debug!(signal, "signal unavailable, using fallback");
                fallback
            }
            Capability::Failed(reason) => {
                debug!(signal, reason = %reason, "signal probe failed, using fallback");
                fallback
            }
        }
    }
}

/// Screen geometry as reported by the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
}

/// Source of raw device/browser signals.
///
/// Implementations must not panic; report problems through [`Capability`].
pub trait SignalSource: Send + Sync {
    fn screen(&self) -> Capability<ScreenInfo>;
    fn device_pixel_ratio(&self) -> Capability<f64>;
    fn color_depth(&self) -> Capability<u32>;
    /// Minutes to add to local time to reach UTC (positive west of Greenwich).
    fn timezone_offset(&self) -> Capability<i32>;
    fn locale(&self) -> Capability<String>;
    fn platform(&self) -> Capability<String>;
    fn user_agent(&self) -> Capability<String>;
    fn hardware_concurrency(&self) -> Capability<u32>;
    fn touch_support(&self) -> Capability<bool>;
    /// Full serialization of a fixed rendered scene.
    fn canvas_signature(&self) -> Capability<String>;
    /// Signal derived from the audio processing graph.
    fn audio_signature(&self) -> Capability<String>;
}

/// Signals of the process the client runs in.
///
/// A native process has no canvas or audio graph, and no reliable way to ask
/// for the screen geometry, so those come from explicit overrides (CLI flags, an
/// embedding host) or are reported missing.
#[derive(Clone, Debug, Default)]
pub struct HostSignals {
    user_agent: Option<String>,
    screen: Option<ScreenInfo>,
    device_pixel_ratio: Option<f64>,
    color_depth: Option<u32>,
    touch: Option<bool>,
}

impl HostSignals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen = Some(ScreenInfo { width, height });
        self
    }

    #[must_use]
    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = Some(ratio);
        self
    }

    #[must_use]
    pub fn with_color_depth(mut self, depth: u32) -> Self {
        self.color_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn with_touch_support(mut self, touch: bool) -> Self {
        self.touch = Some(touch);
        self
    }
}

impl SignalSource for HostSignals {
    fn screen(&self) -> Capability<ScreenInfo> {
        Capability::from_option(self.screen)
    }

    fn device_pixel_ratio(&self) -> Capability<f64> {
        match self.device_pixel_ratio {
            Some(ratio) if ratio.is_finite() && ratio > 0.0 => Capability::Available(ratio),
            Some(ratio) => Capability::Failed(format!("invalid pixel ratio {ratio}")),
            None => Capability::Missing,
        }
    }

    fn color_depth(&self) -> Capability<u32> {
        Capability::from_option(self.color_depth)
    }

    fn timezone_offset(&self) -> Capability<i32> {
        let local_minus_utc = Local::now().offset().local_minus_utc();
        Capability::Available(-local_minus_utc / 60)
    }

    fn locale(&self) -> Capability<String> {
        let raw = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|key| env::var(key).ok())
            .find(|value| !value.trim().is_empty());

        Capability::from_option(raw.as_deref().and_then(posix_to_bcp47))
    }

    fn platform(&self) -> Capability<String> {
        Capability::from_option(platform_name(env::consts::OS, env::consts::ARCH))
    }

    fn user_agent(&self) -> Capability<String> {
        Capability::Available(
            self.user_agent
                .clone()
                .unwrap_or_else(|| crate::APP_USER_AGENT.to_string()),
        )
    }

    fn hardware_concurrency(&self) -> Capability<u32> {
        Capability::from_result(
            thread::available_parallelism()
                .map(|n| u32::try_from(n.get()).unwrap_or(u32::MAX)),
        )
    }

    fn touch_support(&self) -> Capability<bool> {
        Capability::from_option(self.touch)
    }

    fn canvas_signature(&self) -> Capability<String> {
        Capability::Missing
    }

    fn audio_signature(&self) -> Capability<String> {
        Capability::Missing
    }
}

/// Converts a POSIX locale (`en_US.UTF-8`) to a BCP 47 tag (`en-US`).
fn posix_to_bcp47(value: &str) -> Option<String> {
    let tag = value
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .trim()
        .replace('_', "-");

    if tag.is_empty() || tag == "C" || tag == "POSIX" {
        None
    } else {
        Some(tag)
    }
}

/// Platform strings in the shape browsers report them.
fn platform_name(os: &str, arch: &str) -> Option<String> {
    match os {
        "linux" => Some(format!("Linux {arch}")),
        "macos" => Some("MacIntel".to_string()),
        "windows" => Some("Win32".to_string()),
        "android" => Some(format!("Linux {arch}")),
        "ios" => Some("iPhone".to_string()),
        "freebsd" => Some(format!("FreeBSD {arch}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posix_locale_is_converted() {
        assert_eq!(posix_to_bcp47("en_US.UTF-8"), Some("en-US".to_string()));
        assert_eq!(posix_to_bcp47("zh_CN"), Some("zh-CN".to_string()));
        assert_eq!(posix_to_bcp47("de_DE@euro"), Some("de-DE".to_string()));
        assert_eq!(posix_to_bcp47("C"), None);
        assert_eq!(posix_to_bcp47("POSIX"), None);
        assert_eq!(posix_to_bcp47(""), None);
    }

    #[test]
    fn platform_names_follow_browser_conventions() {
        assert_eq!(
            platform_name("linux", "x86_64"),
            Some("Linux x86_64".to_string())
        );
        assert_eq!(platform_name("macos", "aarch64"), Some("MacIntel".to_string()));
        assert_eq!(platform_name("windows", "x86_64"), Some("Win32".to_string()));
        assert_eq!(platform_name("plan9", "x86"), None);
    }

    #[test]
    fn host_reports_missing_graphics_and_audio() {
        let host = HostSignals::new();
        assert_eq!(host.canvas_signature(), Capability::Missing);
        assert_eq!(host.audio_signature(), Capability::Missing);
        assert_eq!(host.screen(), Capability::Missing);
    }

    #[test]
    fn host_overrides_are_reported() {
        let host = HostSignals::new()
            .with_screen(1920, 1080)
            .with_device_pixel_ratio(2.0)
            .with_touch_support(true);

        assert_eq!(
            host.screen(),
            Capability::Available(ScreenInfo {
                width: 1920,
                height: 1080
            })
        );
        assert_eq!(host.device_pixel_ratio(), Capability::Available(2.0));
        assert_eq!(host.touch_support(), Capability::Available(true));
    }

    #[test]
    fn invalid_pixel_ratio_is_a_failed_probe() {
        let host = HostSignals::new().with_device_pixel_ratio(0.0);
        assert!(matches!(host.device_pixel_ratio(), Capability::Failed(_)));
    }

    #[test]
    fn locale_reads_environment() {
        temp_env::with_vars(
            [
                ("LC_ALL", None::<&str>),
                ("LC_MESSAGES", None),
                ("LANG", Some("fr_FR.UTF-8")),
            ],
            || {
                assert_eq!(
                    HostSignals::new().locale(),
                    Capability::Available("fr-FR".to_string())
                );
            },
        );
    }

    #[test]
    fn resolve_uses_fallback_for_failures() {
        let failed: Capability<u32> = Capability::Failed("blocked".to_string());
        assert_eq!(failed.resolve("color_depth", 24), 24);
        assert_eq!(Capability::Available(30).resolve("color_depth", 24), 30);
    }
}
