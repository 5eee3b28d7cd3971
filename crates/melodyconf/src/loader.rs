//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, MelodistConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local). Only returns files
/// that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided it replaces the local override. It is returned
/// even when missing so that loading it reports the error.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/melodist/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("melodist/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        files.push(path.to_path_buf());
        return files;
    }

    let local = PathBuf::from("melodist.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load a single TOML file on top of the compiled defaults.
pub fn load_from_file(path: &Path) -> Result<MelodistConfig, ConfigError> {
    let mut config = MelodistConfig::default();
    apply_file(&mut config, path)?;
    Ok(config)
}

/// Overlay the values present in a TOML file onto `config`.
pub fn apply_file(config: &mut MelodistConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Overlay parsed TOML onto `config`. Keys missing from the file keep their
/// current value.
pub(crate) fn apply_toml(
    config: &mut MelodistConfig,
    contents: &str,
    path: &Path,
) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(paths) = table.get("paths").and_then(|v| v.as_table()) {
        if let Some(v) = paths.get("training_dir") {
            let s = v
                .as_str()
                .ok_or_else(|| invalid("paths.training_dir", "expected a string"))?;
            config.paths.training_dir = expand_path(s);
        }
        if let Some(v) = paths.get("output_dir") {
            let s = v
                .as_str()
                .ok_or_else(|| invalid("paths.output_dir", "expected a string"))?;
            config.paths.output_dir = expand_path(s);
        }
    }

    if let Some(enhance) = table.get("enhance").and_then(|v| v.as_table()) {
        if let Some(v) = enhance.get("insert_prob") {
            config.enhance.insert_prob = v
                .as_float()
                .or_else(|| v.as_integer().map(|i| i as f64))
                .ok_or_else(|| invalid("enhance.insert_prob", "expected a number"))?;
        }
        if let Some(v) = enhance.get("seed") {
            let seed = v
                .as_integer()
                .filter(|i| *i >= 0)
                .ok_or_else(|| invalid("enhance.seed", "expected a non-negative integer"))?;
            config.enhance.seed = Some(seed as u64);
        }
        if let Some(v) = enhance.get("max_training_files") {
            let max = v
                .as_integer()
                .filter(|i| *i >= 0)
                .ok_or_else(|| {
                    invalid("enhance.max_training_files", "expected a non-negative integer")
                })?;
            config.enhance.max_training_files = Some(max as usize);
        }
    }

    if let Some(logging) = table.get("logging").and_then(|v| v.as_table()) {
        if let Some(v) = logging.get("log_level") {
            let s = v
                .as_str()
                .ok_or_else(|| invalid("logging.log_level", "expected a string"))?;
            config.logging.log_level = s.to_string();
        }
    }

    Ok(())
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(
    config: &mut MelodistConfig,
    sources: &mut ConfigSources,
) -> Result<(), ConfigError> {
    apply_overrides_from(config, sources, |name| env::var(name).ok())
}

/// Apply overrides from any variable lookup.
pub fn apply_overrides_from(
    config: &mut MelodistConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = lookup("MELODIST_TRAINING_DIR") {
        config.paths.training_dir = expand_path(&v);
        sources.env_overrides.push("MELODIST_TRAINING_DIR".to_string());
    }
    if let Some(v) = lookup("MELODIST_OUTPUT_DIR") {
        config.paths.output_dir = expand_path(&v);
        sources.env_overrides.push("MELODIST_OUTPUT_DIR".to_string());
    }

    if let Some(v) = lookup("MELODIST_INSERT_PROB") {
        config.enhance.insert_prob = v
            .trim()
            .parse()
            .map_err(|_| invalid("MELODIST_INSERT_PROB", format!("not a number: {v:?}")))?;
        sources.env_overrides.push("MELODIST_INSERT_PROB".to_string());
    }
    if let Some(v) = lookup("MELODIST_SEED") {
        let seed = v
            .trim()
            .parse()
            .map_err(|_| invalid("MELODIST_SEED", format!("not an integer: {v:?}")))?;
        config.enhance.seed = Some(seed);
        sources.env_overrides.push("MELODIST_SEED".to_string());
    }
    if let Some(v) = lookup("MELODIST_MAX_TRAINING_FILES") {
        let max = v
            .trim()
            .parse()
            .map_err(|_| invalid("MELODIST_MAX_TRAINING_FILES", format!("not an integer: {v:?}")))?;
        config.enhance.max_training_files = Some(max);
        sources.env_overrides.push("MELODIST_MAX_TRAINING_FILES".to_string());
    }

    if let Some(v) = lookup("MELODIST_LOG_LEVEL") {
        config.logging.log_level = v;
        sources.env_overrides.push("MELODIST_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.logging.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    Ok(())
}

/// Expand `~/` and a leading `$VAR` in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
        return PathBuf::from(path);
    }

    if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        let (var_name, rest) = match stripped.find('/') {
            Some(slash) => (&stripped[..slash], Some(&stripped[slash + 1..])),
            None => (stripped, None),
        };
        return match (env::var(var_name), rest) {
            (Ok(value), Some(rest)) => PathBuf::from(value).join(rest),
            (Ok(value), None) => PathBuf::from(value),
            (Err(_), _) => PathBuf::from(path),
        };
    }

    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/midi/corpus");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("midi/corpus"));
    }

    #[test]
    fn test_expand_path_absolute() {
        assert_eq!(expand_path("/srv/midi"), PathBuf::from("/srv/midi"));
    }

    #[test]
    fn test_expand_path_unknown_var_is_literal() {
        let path = "$MELODIST_SURELY_UNSET_VAR/corpus";
        assert_eq!(expand_path(path), PathBuf::from(path));
    }

    #[test]
    fn test_discover_config_files() {
        // Only checks that discovery does not panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_cli_override_replaces_local() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "").unwrap();

        let files = discover_config_files_with_override(Some(&path));
        assert_eq!(files.last(), Some(&path));
    }

    #[test]
    fn test_missing_cli_override_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typo.toml");

        let files = discover_config_files_with_override(Some(&path));
        assert_eq!(files.last(), Some(&path));

        let err = MelodistConfig::load_from(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { path: p, .. } if p == path));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let mut config = MelodistConfig::default();
        apply_toml(
            &mut config,
            "[paths]\ntraining_dir = \"/corpus\"\n",
            Path::new("test.toml"),
        )
        .unwrap();
        assert_eq!(config.paths.training_dir, PathBuf::from("/corpus"));
        assert_eq!(config.paths.output_dir, PathBuf::from("."));
        assert_eq!(config.enhance.insert_prob, 0.35);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[paths]
training_dir = "/data/midi"
output_dir = "/data/out"

[enhance]
insert_prob = 0.5
seed = 42
max_training_files = 200

[logging]
log_level = "tonality=debug"
"#;
        let mut config = MelodistConfig::default();
        apply_toml(&mut config, toml, Path::new("test.toml")).unwrap();

        assert_eq!(config.paths.training_dir, PathBuf::from("/data/midi"));
        assert_eq!(config.paths.output_dir, PathBuf::from("/data/out"));
        assert_eq!(config.enhance.insert_prob, 0.5);
        assert_eq!(config.enhance.seed, Some(42));
        assert_eq!(config.enhance.max_training_files, Some(200));
        assert_eq!(config.logging.log_level, "tonality=debug");
    }

    #[test]
    fn test_later_files_only_override_what_they_set() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.toml");
        let local = dir.path().join("local.toml");
        std::fs::write(&base, "[enhance]\ninsert_prob = 0.9\nseed = 1\n").unwrap();
        std::fs::write(&local, "[enhance]\nseed = 2\n").unwrap();

        let mut config = load_from_file(&base).unwrap();
        apply_file(&mut config, &local).unwrap();
        assert_eq!(config.enhance.insert_prob, 0.9);
        assert_eq!(config.enhance.seed, Some(2));
    }

    #[test]
    fn test_integer_probability_is_accepted() {
        let mut config = MelodistConfig::default();
        apply_toml(&mut config, "[enhance]\ninsert_prob = 1\n", Path::new("t.toml")).unwrap();
        assert_eq!(config.enhance.insert_prob, 1.0);
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        let mut config = MelodistConfig::default();
        let err = apply_toml(
            &mut config,
            "[enhance]\nseed = \"abc\"\n",
            Path::new("t.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "enhance.seed"));
    }

    #[test]
    fn test_bad_toml_is_a_parse_error() {
        let mut config = MelodistConfig::default();
        let err = apply_toml(&mut config, "[paths\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = load_from_file(Path::new("/nonexistent/melodist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = MelodistConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(
            &mut config,
            &mut sources,
            lookup(&[
                ("MELODIST_TRAINING_DIR", "/env/midi"),
                ("MELODIST_INSERT_PROB", "0.8"),
                ("MELODIST_SEED", "7"),
                ("MELODIST_MAX_TRAINING_FILES", "3"),
                ("MELODIST_LOG_LEVEL", "warn"),
                ("RUST_LOG", "debug"),
            ]),
        )
        .unwrap();

        assert_eq!(config.paths.training_dir, PathBuf::from("/env/midi"));
        assert_eq!(config.enhance.insert_prob, 0.8);
        assert_eq!(config.enhance.seed, Some(7));
        assert_eq!(config.enhance.max_training_files, Some(3));
        // RUST_LOG is applied last
        assert_eq!(config.logging.log_level, "debug");
        assert_eq!(sources.env_overrides.len(), 6);
        assert!(!sources.env_overrides.contains(&"MELODIST_OUTPUT_DIR".to_string()));
    }

    #[test]
    fn test_unparsable_env_value_is_invalid() {
        let mut config = MelodistConfig::default();
        let mut sources = ConfigSources::default();
        let err = apply_overrides_from(
            &mut config,
            &mut sources,
            lookup(&[("MELODIST_INSERT_PROB", "often")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "MELODIST_INSERT_PROB"));
    }
}
