//! Banner placement rules and persisted preferences.
//!
//! Offsets and widths are CSS pixels. The overlay reports its viewport size
//! with each command; everything here is a pure function of those numbers,
//! except `PreferenceStore`, which reads and writes the JSON file.

use crate::models::{FilterSelection, ViewMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Size limits for the banner. Defaults match the browser overlay.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct BannerGeometry {
    pub default_width: f64,
    pub min_width: f64,
    pub max_width: f64,
    pub edge_gap: f64,
    pub banner_height: f64,
}

impl Default for BannerGeometry {
    fn default() -> Self {
        Self {
            default_width: 450.0,
            min_width: 250.0,
            max_width: 2000.0,
            edge_gap: 20.0,
            banner_height: 26.0,
        }
    }
}

/// Widths within this many pixels of the maximum count as "full width".
const MAX_WIDTH_TOLERANCE: f64 = 10.0;

/// Vertical anchor: the banner sticks to either the top or bottom edge.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Top(f64),
    Bottom(f64),
}

impl Default for Anchor {
    fn default() -> Self {
        Anchor::Top(10.0)
    }
}

impl Anchor {
    fn offset(self) -> f64 {
        match self {
            Anchor::Top(v) | Anchor::Bottom(v) => v,
        }
    }

    fn with_offset(self, offset: f64) -> Self {
        match self {
            Anchor::Top(_) => Anchor::Top(offset),
            Anchor::Bottom(_) => Anchor::Bottom(offset),
        }
    }
}

impl BannerGeometry {
    /// Keeps a position being saved on screen: at most 10px above the far
    /// edge, never negative.
    pub fn clamp_position_for_save(&self, anchor: Anchor, viewport_height: f64) -> Anchor {
        let offset = anchor.offset();
        let limit = viewport_height - self.banner_height;
        let clamped = if offset > limit {
            (limit - 10.0).max(0.0)
        } else if offset < 0.0 {
            0.0
        } else {
            offset
        };
        anchor.with_offset(clamped)
    }

    /// Brings a saved position back on screen after the viewport shrank,
    /// leaving a 50px margin.
    pub fn restore_position(&self, saved: Option<Anchor>, viewport_height: f64) -> Anchor {
        let Some(anchor) = saved else {
            return Anchor::default();
        };
        let limit = viewport_height - self.banner_height;
        if anchor.offset() > limit {
            anchor.with_offset((limit - 50.0).max(0.0))
        } else {
            anchor
        }
    }

    pub fn max_banner_width(&self, viewport_width: f64) -> f64 {
        self.min_width.max(viewport_width - 2.0 * self.edge_gap)
    }

    pub fn is_width_at_max(&self, width: f64, viewport_width: f64) -> bool {
        (width - self.max_banner_width(viewport_width)).abs() <= MAX_WIDTH_TOLERANCE
    }

    /// Width as a share of the viewport, in `[1, 100]`.
    pub fn width_percentage(&self, width: f64, viewport_width: f64) -> f64 {
        if viewport_width <= 0.0 {
            return 50.0;
        }
        (width / viewport_width * 100.0).clamp(1.0, 100.0)
    }

    /// Width to show for saved preferences: full width if it was maximized,
    /// else the saved percentage of the current viewport, else the saved
    /// pixel width, else the default.
    pub fn restore_width(&self, prefs: &BannerPreferences, viewport_width: f64) -> f64 {
        let max = self.max_banner_width(viewport_width);
        if prefs.is_max_width {
            return max;
        }
        if let Some(percent) = prefs.width_percent.filter(|p| *p > 0.0 && *p <= 100.0) {
            let px = (percent / 100.0 * viewport_width).round();
            return px.max(self.min_width).min(max);
        }
        if let Some(width) = prefs
            .width
            .filter(|w| *w >= self.min_width && *w <= self.max_width)
        {
            return width;
        }
        self.default_width
    }
}

/// Everything the overlay remembers between page loads.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct BannerPreferences {
    pub position: Option<Anchor>,
    pub width: Option<f64>,
    pub width_percent: Option<f64>,
    pub is_max_width: bool,
    pub minimized: bool,
    pub view_mode: ViewMode,
    pub filters: Option<FilterSelection>,
}

impl BannerPreferences {
    /// Records a user resize. Widths below the minimum are ignored.
    pub fn record_width(&mut self, geometry: &BannerGeometry, width: f64, viewport_width: f64) -> bool {
        if width < geometry.min_width {
            return false;
        }
        let width = width.min(geometry.max_banner_width(viewport_width));
        self.width = Some(width);
        self.width_percent = Some(geometry.width_percentage(width, viewport_width));
        self.is_max_width = geometry.is_width_at_max(width, viewport_width);
        true
    }

    pub fn move_to(&mut self, geometry: &BannerGeometry, anchor: Anchor, viewport_height: f64) {
        self.position = Some(geometry.clamp_position_for_save(anchor, viewport_height));
    }

    pub fn toggle_minimized(&mut self) -> bool {
        self.minimized = !self.minimized;
        self.minimized
    }

    /// Copy with position and width resolved for the given viewport.
    pub fn restored(&self, geometry: &BannerGeometry, viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            position: Some(geometry.restore_position(self.position, viewport_height)),
            width: Some(geometry.restore_width(self, viewport_width)),
            ..self.clone()
        }
    }
}

/// JSON file holding `BannerPreferences`.
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads saved preferences. A missing or corrupt file yields defaults.
    pub fn load(&self) -> BannerPreferences {
        match fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("Ignoring unreadable preferences in {}: {}", self.path.display(), e);
                BannerPreferences::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BannerPreferences::default(),
            Err(e) => {
                warn!("Error reading {}: {}", self.path.display(), e);
                BannerPreferences::default()
            }
        }
    }

    pub fn save(&self, prefs: &BannerPreferences) -> io::Result<()> {
        let text = serde_json::to_string_pretty(prefs)?;
        fs::write(&self.path, text)
    }
}

// --- where the banner may appear ---

/// Trimmed, lowercased denylist entries. Entries may themselves hold
/// several newline-separated domains.
pub fn normalize_domains<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .flat_map(|entry| {
            entry
                .as_ref()
                .lines()
                .map(|line| line.trim().to_lowercase())
                .collect::<Vec<_>>()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// True when `hostname` is a listed domain or one of its subdomains.
pub fn is_domain_excluded(hostname: &str, excluded: &[String]) -> bool {
    let host = hostname.trim().to_lowercase();
    excluded.iter().any(|domain| {
        let domain = domain.trim().to_lowercase();
        !domain.is_empty() && (host == domain || host.ends_with(&format!(".{}", domain)))
    })
}

const ASSET_EXTENSIONS: [&str; 11] = [
    "ico", "png", "jpg", "jpeg", "gif", "css", "js", "json", "svg", "xml", "pdf",
];

/// True for paths that serve a static asset rather than a page.
pub fn is_unsuitable_path(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| ASSET_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
