use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result, env_subst::substitute_env, settings::DuplexSettings};

/// Standard settings file names, checked in order.
const SETTINGS_FILENAMES: &[&str] = &["duplex.toml", "duplex.json"];

/// Load settings from the given path (TOML or JSON).
pub fn load_settings(path: &Path) -> Result<DuplexSettings> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::settings(path, e))?;
    let raw = substitute_env(&raw);
    parse_settings(&raw, path)
}

/// Discover and load settings from standard locations.
///
/// Search order:
/// 1. `config_dir` when given (e.g. `--config-dir`)
/// 2. `./duplex.{toml,json}` (project-local)
/// 3. `~/.config/duplex/duplex.{toml,json}` (user-global)
///
/// Returns defaults if no file is found or the file cannot be parsed.
/// Environment overrides are applied last.
pub fn discover_and_load(config_dir: Option<&Path>) -> DuplexSettings {
    let settings = match find_settings_file(config_dir) {
        Some(path) => {
            debug!(path = %path.display(), "loading settings");
            load_settings(&path).unwrap_or_else(|e| {
                warn!(error = %e, "failed to load settings, using defaults");
                DuplexSettings::default()
            })
        },
        None => {
            debug!("no settings file found, using defaults");
            DuplexSettings::default()
        },
    };
    apply_env_overrides(settings).normalized()
}

/// Apply `DUPLEX_API_BASE_URL` and `DUPLEX_DATA_DIR`.
pub fn apply_env_overrides(settings: DuplexSettings) -> DuplexSettings {
    apply_env_overrides_with(settings, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut settings: DuplexSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> DuplexSettings {
    if let Some(url) = lookup("DUPLEX_API_BASE_URL").filter(|v| !v.is_empty()) {
        settings.api_base_url = url;
    }
    if let Some(dir) = lookup("DUPLEX_DATA_DIR").filter(|v| !v.is_empty()) {
        settings.data_dir = Some(PathBuf::from(dir));
    }
    settings
}

/// Returns the user-global config directory (`~/.config/duplex/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "duplex").map(|d| d.config_dir().to_path_buf())
}

/// Resolve the store directory: explicit override, then settings, then the
/// user data directory, then `./.duplex`.
pub fn data_dir(settings: &DuplexSettings, override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    if let Some(ref dir) = settings.data_dir {
        return dir.clone();
    }
    directories::ProjectDirs::from("", "", "duplex")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".duplex"))
}

fn find_settings_file(explicit_dir: Option<&Path>) -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    if let Some(dir) = explicit_dir {
        dirs.push(dir.to_path_buf());
    }
    dirs.push(PathBuf::from("."));
    dirs.extend(config_dir());

    dirs.iter()
        .flat_map(|dir| SETTINGS_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.exists())
}

fn parse_settings(raw: &str, path: &Path) -> Result<DuplexSettings> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::settings(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::settings(path, e)),
        _ => Err(Error::settings(path, format!("unsupported format: .{ext}"))),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, tempfile::TempDir};

    #[test]
    fn loads_partial_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("duplex.toml");
        std::fs::write(&path, "poll_timeout_secs = 30\nfailure_backoff_ms = 0\n").unwrap();

        let s = load_settings(&path).unwrap();
        assert_eq!(s.poll_timeout_secs, 30);
        assert_eq!(s.failure_backoff_ms, 0);
        assert_eq!(s.api_base_url, "https://api.telegram.org");
    }

    #[test]
    fn loads_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("duplex.json");
        std::fs::write(&path, r#"{"api_base_url": "http://localhost:9000"}"#).unwrap();

        let s = load_settings(&path).unwrap();
        assert_eq!(s.api_base_url, "http://localhost:9000");
    }

    #[test]
    fn bad_toml_is_a_settings_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("duplex.toml");
        std::fs::write(&path, "poll_timeout_secs = \"soon\"").unwrap();

        assert!(matches!(load_settings(&path), Err(Error::Settings { .. })));
    }

    #[test]
    fn explicit_dir_is_searched_first() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("duplex.toml"), "failure_backoff_ms = 42\n").unwrap();

        let found = find_settings_file(Some(tmp.path())).unwrap();
        assert_eq!(found, tmp.path().join("duplex.toml"));
    }

    #[test]
    fn env_overrides_apply() {
        let lookup = |name: &str| match name {
            "DUPLEX_API_BASE_URL" => Some("http://mock:1".to_string()),
            "DUPLEX_DATA_DIR" => Some("/tmp/duplex-test".to_string()),
            _ => None,
        };
        let s = apply_env_overrides_with(DuplexSettings::default(), lookup);
        assert_eq!(s.api_base_url, "http://mock:1");
        assert_eq!(s.data_dir, Some(PathBuf::from("/tmp/duplex-test")));
    }

    #[test]
    fn data_dir_precedence() {
        let settings = DuplexSettings {
            data_dir: Some(PathBuf::from("/from/settings")),
            ..Default::default()
        };
        assert_eq!(
            data_dir(&settings, Some(Path::new("/from/flag"))),
            PathBuf::from("/from/flag")
        );
        assert_eq!(data_dir(&settings, None), PathBuf::from("/from/settings"));
    }
}
