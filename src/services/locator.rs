//! Locator: picks the best candidate window for a caller filter.
//!
//! Among the windows the filter accepts, the one with the largest
//! bounding-box area wins; equal areas resolve to the first enumerated.

use crate::error::{EmbedError, Result};
use crate::events::WindowInfo;
use crate::services::window_system::WindowDirectory;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Caller-supplied predicate deciding which windows are eligible
pub type WindowFilter = Arc<dyn Fn(&WindowInfo) -> bool + Send + Sync>;

/// Data form of a filter, for requests that cannot carry a closure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    #[serde(alias = "titlePatterns")]
    pub title_patterns: Vec<String>,
    pub path: Option<PathBuf>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.title_patterns.is_empty() && self.path.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return EmbedError::bad_request("фильтр должен содержать title_patterns или path");
        }
        if self.title_patterns.iter().any(|p| p.trim().is_empty()) {
            return EmbedError::bad_request("пустой паттерн заголовка в фильтре");
        }
        Ok(())
    }

    pub fn matches(&self, window: &WindowInfo) -> bool {
        let path_ok = self.path.as_ref().map_or(true, |path| window.path == *path);
        path_ok && window.matches_any_pattern(&self.title_patterns)
    }

    pub fn into_filter(self) -> WindowFilter {
        Arc::new(move |window: &WindowInfo| self.matches(window))
    }
}

/// Select the best match from an already enumerated snapshot
pub fn best_match<'a>(
    windows: &'a [WindowInfo],
    filter: &dyn Fn(&WindowInfo) -> bool,
) -> Option<&'a WindowInfo> {
    let mut best: Option<&WindowInfo> = None;

    for window in windows.iter().filter(|w| filter(*w)) {
        match best {
            // Строго больше: при равной площади остаётся первое найденное
            Some(current) if window.area() <= current.area() => {}
            _ => best = Some(window),
        }
    }

    best
}

/// Query the directory once and select the best match
pub fn locate<D>(directory: &D, filter: &dyn Fn(&WindowInfo) -> bool) -> Result<Option<WindowInfo>>
where
    D: WindowDirectory + ?Sized,
{
    let windows = directory.list_windows()?;
    Ok(best_match(&windows, filter).cloned())
}
