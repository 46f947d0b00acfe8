//! Device fingerprinting for account-sharing detection.
//!
//! [`collect`] gathers signals into a [`FingerprintRecord`] and never fails:
//! each signal is probed on its own and falls back to a documented default (or
//! the `"unsupported"` sentinel for graphics/audio) when the probe is missing or
//! fails. [`hash`] turns the record into an opaque [`FingerprintHash`].
//!
//! Both forms go to the login endpoint; the raw record is never logged.

pub mod browser;
mod hash;
pub mod probe;

pub use self::browser::{BrowserFamily, BrowserInfo};
pub use self::hash::{digest, hash, FingerprintHash, HASH_HEX_LEN};
pub use self::probe::{Capability, HostSignals, ScreenInfo, SignalSource};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};

/// Sentinel for graphics/audio probes that are unavailable or blocked.
pub const UNSUPPORTED: &str = "unsupported";
/// Number of trailing characters kept from the canvas serialization.
pub const CANVAS_SUFFIX_LEN: usize = 50;

const DEFAULT_COLOR_DEPTH: u32 = 24;
const DEFAULT_LOCALE: &str = "en-US";
const DEFAULT_PLATFORM: &str = "Unknown";

/// Structured device/browser signals. Field order is the canonical hash order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub screen_width: u32,
    pub screen_height: u32,
    #[serde(serialize_with = "serialize_js_number")]
    pub device_pixel_ratio: f64,
    pub color_depth: u32,
    pub timezone_offset: i32,
    pub locale: String,
    pub platform: String,
    pub browser_family: BrowserFamily,
    pub browser_major: String,
    pub hardware_concurrency: u32,
    pub touch_support: bool,
    pub canvas_hash: String,
    pub audio_hash: String,
}

impl FingerprintRecord {
    /// Compact JSON of every field in declaration order, numbers written the way
    /// a JavaScript engine writes them (`1` rather than `1.0`).
    #[must_use]
    pub fn canonical_form(&self) -> String {
        json!({
            "screen_width": self.screen_width,
            "screen_height": self.screen_height,
            "device_pixel_ratio": js_number(self.device_pixel_ratio),
            "color_depth": self.color_depth,
            "timezone_offset": self.timezone_offset,
            "locale": self.locale,
            "platform": self.platform,
            "browser_family": self.browser_family.as_str(),
            "browser_major": self.browser_major,
            "hardware_concurrency": self.hardware_concurrency,
            "touch_support": self.touch_support,
            "canvas_hash": self.canvas_hash,
            "audio_hash": self.audio_hash,
        })
        .to_string()
    }
}

/// Collects a fresh record from `source`. Total: every field is always filled.
///
/// A zero colour depth or a non-positive pixel ratio counts as unavailable.
pub fn collect(source: &dyn SignalSource) -> FingerprintRecord {
    let screen = source
        .screen()
        .resolve("screen", ScreenInfo { width: 0, height: 0 });
    let user_agent = source.user_agent().resolve("user_agent", String::new());
    let browser = browser::detect(&user_agent);

    FingerprintRecord {
        screen_width: screen.width,
        screen_height: screen.height,
        device_pixel_ratio: source
            .device_pixel_ratio()
            .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
            .resolve("device_pixel_ratio", 1.0),
        color_depth: source
            .color_depth()
            .filter(|depth| *depth > 0)
            .resolve("color_depth", DEFAULT_COLOR_DEPTH),
        timezone_offset: source.timezone_offset().resolve("timezone_offset", 0),
        locale: source.locale().resolve("locale", DEFAULT_LOCALE.to_string()),
        platform: source
            .platform()
            .resolve("platform", DEFAULT_PLATFORM.to_string()),
        browser_family: browser.family,
        browser_major: browser.major,
        hardware_concurrency: source
            .hardware_concurrency()
            .resolve("hardware_concurrency", 0),
        touch_support: source.touch_support().resolve("touch_support", false),
        canvas_hash: canvas_suffix(
            &source
                .canvas_signature()
                .resolve("canvas", UNSUPPORTED.to_string()),
        ),
        audio_hash: source
            .audio_signature()
            .resolve("audio", UNSUPPORTED.to_string()),
    }
}

/// Collects from the current process.
#[must_use]
pub fn collect_host() -> FingerprintRecord {
    collect(&HostSignals::new())
}

fn canvas_suffix(serialized: &str) -> String {
    let len = serialized.chars().count();
    serialized
        .chars()
        .skip(len.saturating_sub(CANVAS_SUFFIX_LEN))
        .collect()
}

// Largest integer an f64 represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

#[allow(clippy::cast_possible_truncation)]
fn js_integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_SAFE_INTEGER {
        Some(value as i64)
    } else {
        None
    }
}

fn js_number(value: f64) -> Value {
    js_integral(value).map_or_else(|| Value::from(value), Value::from)
}

fn serialize_js_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    match js_integral(*value) {
        Some(integral) => serializer.serialize_i64(integral),
        None => serializer.serialize_f64(*value),
    }
}
