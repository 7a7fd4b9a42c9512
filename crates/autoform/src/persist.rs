//! Saving and restoring container state.
//!
//! State is a flat JSON object mapping child names to values, written under
//! the per-user cache directory. Loading is forgiving: unknown names are
//! skipped and widgets that reject a stored value keep their current one,
//! so stale files never break gui construction.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use autoform_core::logging::targets;
use directories::ProjectDirs;

use crate::error::{Error, Result};
use crate::types::Value;
use crate::widget::Container;

/// The cache file used to persist state under `name`.
pub fn state_path(name: &str) -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "autoform").ok_or(Error::NoCacheDir)?;
    let safe: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    Ok(dirs.cache_dir().join(safe).with_extension("json"))
}

/// Write the container's named, non-gui-only values to `path` as JSON.
pub fn dump_state(container: &Container, path: &Path) -> Result<()> {
    let mut state = BTreeMap::new();
    for child in container.children() {
        let name = child.name();
        if name.is_empty() || child.gui_only() {
            continue;
        }
        if let Ok(value) = child.value() {
            state.insert(name, value);
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&state)?)?;
    tracing::debug!(
        target: targets::PERSIST,
        path = %path.display(),
        fields = state.len(),
        "dumped container state"
    );
    Ok(())
}

/// Restore values from `path` into matching children.
pub fn load_state(container: &Container, path: &Path) -> Result<()> {
    let text = fs::read_to_string(path)?;
    let state: BTreeMap<String, Value> = serde_json::from_str(&text)?;
    for (name, value) in state {
        let Some(widget) = container.widget(&name) else {
            continue;
        };
        if let Err(error) = widget.set_value(value) {
            tracing::warn!(
                target: targets::PERSIST,
                name,
                %error,
                "skipping persisted value the widget rejected"
            );
        }
    }
    Ok(())
}

/// Like [`load_state`], but a missing or unreadable file is not an error.
pub fn load_state_quiet(container: &Container, path: &Path) {
    if let Err(error) = load_state(container, path) {
        tracing::debug!(
            target: targets::PERSIST,
            path = %path.display(),
            %error,
            "no persisted state restored"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{Orientation, Widget, WidgetKind};

    fn named(kind: WidgetKind, name: &str) -> Widget {
        let w = Widget::of_kind(kind).unwrap();
        w.set_name(name);
        w
    }

    #[test]
    fn round_trips_named_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let c = Container::new(Orientation::Vertical, true).unwrap();
        let count = named(WidgetKind::SpinBox, "count");
        count.set_value(Value::Int(9)).unwrap();
        let message = named(WidgetKind::LineEdit, "message");
        message.set_value(Value::from("saved")).unwrap();
        c.push(&count).unwrap();
        c.push(&message).unwrap();

        dump_state(&c, &path).unwrap();

        let restored = Container::new(Orientation::Vertical, true).unwrap();
        restored.push(&named(WidgetKind::SpinBox, "count")).unwrap();
        restored
            .push(&named(WidgetKind::LineEdit, "message"))
            .unwrap();
        load_state(&restored, &path).unwrap();

        assert_eq!(
            restored.widget("count").unwrap().value().unwrap(),
            Value::Int(9)
        );
        assert_eq!(
            restored.widget("message").unwrap().value().unwrap(),
            Value::from("saved")
        );
    }

    #[test]
    fn gui_only_widgets_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let c = Container::new(Orientation::Vertical, true).unwrap();
        let result = named(WidgetKind::LineEdit, "result");
        result.set_gui_only(true);
        c.push(&result).unwrap();
        dump_state(&c, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("result"));
    }

    #[test]
    fn unknown_and_invalid_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{"ghost": {"type": "int", "data": 1}, "count": {"type": "str", "data": "x"}}"#,
        )
        .unwrap();

        let c = Container::new(Orientation::Vertical, true).unwrap();
        c.push(&named(WidgetKind::SpinBox, "count")).unwrap();
        // Must not error: unknown name skipped, mock accepts the string.
        load_state(&c, &path).unwrap();
    }

    #[test]
    fn quiet_load_tolerates_missing_file() {
        let c = Container::new(Orientation::Vertical, true).unwrap();
        load_state_quiet(&c, Path::new("/nonexistent/autoform-state.json"));
    }

    #[test]
    fn state_path_sanitizes_names() {
        let path = state_path("pkg.module.func").unwrap();
        let file = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(file, "pkg_module_func.json");
    }
}
