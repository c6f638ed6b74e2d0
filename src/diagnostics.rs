//! Window listing for troubleshooting filters: which executables own
//! top-level windows right now, and what those windows look like.

use crate::events::WindowInfo;
use std::fmt::Write;

/// Windows sharing one executable path
#[derive(Debug, Clone, PartialEq)]
pub struct PathGroup {
    pub path: String,
    pub windows: Vec<WindowInfo>,
}

/// Group windows by executable path, keeping first-seen order of paths.
pub fn group_by_path(windows: Vec<WindowInfo>) -> Vec<PathGroup> {
    let mut groups: Vec<PathGroup> = Vec::new();

    for window in windows {
        let path = window.path.to_string_lossy().replace('\\', "/");
        match groups.iter_mut().find(|g| g.path == path) {
            Some(group) => group.windows.push(window),
            None => groups.push(PathGroup {
                path,
                windows: vec![window],
            }),
        }
    }

    groups
}

pub fn format_summary(groups: &[PathGroup]) -> String {
    let mut out = String::new();
    for (index, group) in groups.iter().enumerate() {
        let _ = write!(out, "\n\t{}: {} ({})", index, group.path, group.windows.len());
    }
    out
}

/// Details of every window under the path at `index`
pub fn format_details(groups: &[PathGroup], index: usize) -> Result<String, String> {
    let group = groups.get(index).ok_or_else(|| {
        format!(
            "Индекс {} вне диапазона: найдено путей {}",
            index,
            groups.len()
        )
    })?;

    let mut out = format!("\n{}", group.path);
    for window in &group.windows {
        let title = if window.title.is_empty() {
            "<No title>"
        } else {
            window.title.as_str()
        };
        let _ = write!(out, "\n\t{}", title);
        let _ = write!(out, "\n\t\tBounds: {}", window.geometry);
        match window.pid {
            Some(pid) => {
                let _ = write!(out, "\n\t\tPID: {}", pid);
            }
            None => out.push_str("\n\t\tPID: ?"),
        }
    }
    out.push('\n');
    Ok(out)
}
