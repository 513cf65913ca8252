use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::sync::SyncTimings;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub perf: bool,
    pub show_preamble: bool,
    pub debug_log: Option<PathBuf>,
    pub outbound_ms: Option<u64>,
    pub inbound_ms: Option<u64>,
    pub idle_ms: Option<u64>,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            perf: self.perf || other.perf,
            show_preamble: self.show_preamble || other.show_preamble,
            debug_log: other.debug_log.clone().or_else(|| self.debug_log.clone()),
            outbound_ms: other.outbound_ms.or(self.outbound_ms),
            inbound_ms: other.inbound_ms.or(self.inbound_ms),
            idle_ms: other.idle_ms.or(self.idle_ms),
        }
    }

    /// Session timings, with defaults for anything not configured.
    pub fn timings(&self) -> SyncTimings {
        let defaults = SyncTimings::default();
        SyncTimings {
            outbound_debounce: self
                .outbound_ms
                .map_or(defaults.outbound_debounce, std::time::Duration::from_millis),
            inbound_debounce: self
                .inbound_ms
                .map_or(defaults.inbound_debounce, std::time::Duration::from_millis),
            idle_threshold: self
                .idle_ms
                .map_or(defaults.idle_threshold, std::time::Duration::from_millis),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("marksync").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("marksync")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("marksync").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("marksync")
                .join("config");
        }
    }

    PathBuf::from(".marksyncrc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".marksyncrc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# marksync defaults (saved with --save)".to_string()];
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if flags.show_preamble {
        lines.push("--show-preamble".to_string());
    }
    if let Some(path) = &flags.debug_log {
        lines.push(format!("--debug-log {}", path.display()));
    }
    if let Some(ms) = flags.outbound_ms {
        lines.push(format!("--outbound-ms {ms}"));
    }
    if let Some(ms) = flags.inbound_ms {
        lines.push(format!("--inbound-ms {ms}"));
    }
    if let Some(ms) = flags.idle_ms {
        lines.push(format!("--idle-ms {ms}"));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pull the value for `name` out of `--name VALUE` or `--name=VALUE`.
///
/// Advances `i` past a separate value token.
fn flag_value<'a>(tokens: &'a [String], i: &mut usize, name: &str) -> Option<Option<&'a str>> {
    let token = tokens[*i].as_str();
    if token == name {
        let value = tokens.get(*i + 1).map(String::as_str);
        if value.is_some() {
            *i += 1;
        }
        return Some(value);
    }
    token
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('='))
        .map(Some)
}

pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].as_str() {
            "--watch" => flags.watch = true,
            "--perf" => flags.perf = true,
            "--show-preamble" => flags.show_preamble = true,
            _ => {
                if let Some(value) = flag_value(tokens, &mut i, "--debug-log") {
                    flags.debug_log = value.map(PathBuf::from);
                } else if let Some(value) = flag_value(tokens, &mut i, "--outbound-ms") {
                    flags.outbound_ms = value.and_then(|v| v.parse().ok());
                } else if let Some(value) = flag_value(tokens, &mut i, "--inbound-ms") {
                    flags.inbound_ms = value.and_then(|v| v.parse().ok());
                } else if let Some(value) = flag_value(tokens, &mut i, "--idle-ms") {
                    flags.idle_ms = value.and_then(|v| v.parse().ok());
                }
            }
        }
        i += 1;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let args = vec![
            "marksync".to_string(),
            "--watch".to_string(),
            "--show-preamble".to_string(),
            "--debug-log=sync.log".to_string(),
            "--idle-ms".to_string(),
            "400".to_string(),
            "notes.md".to_string(),
        ];
        let flags = parse_flag_tokens(&args);
        assert!(flags.watch);
        assert!(flags.show_preamble);
        assert!(!flags.perf);
        assert_eq!(flags.debug_log, Some(PathBuf::from("sync.log")));
        assert_eq!(flags.idle_ms, Some(400));
    }

    #[test]
    fn test_invalid_millis_are_ignored() {
        let args = vec!["--outbound-ms=soon".to_string()];
        assert_eq!(parse_flag_tokens(&args).outbound_ms, None);
    }

    #[test]
    fn test_timings_fill_in_defaults() {
        let flags = ConfigFlags {
            inbound_ms: Some(90),
            ..ConfigFlags::default()
        };
        let timings = flags.timings();
        assert_eq!(timings.outbound_debounce, Duration::from_millis(20));
        assert_eq!(timings.inbound_debounce, Duration::from_millis(90));
        assert_eq!(timings.idle_threshold, Duration::from_millis(150));
        assert_eq!(ConfigFlags::default().timings(), SyncTimings::default());
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            watch: true,
            idle_ms: Some(300),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            perf: true,
            idle_ms: Some(100),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.watch);
        assert!(merged.perf);
        assert_eq!(merged.idle_ms, Some(100));
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".marksyncrc");
        let flags = ConfigFlags {
            watch: true,
            perf: true,
            show_preamble: true,
            debug_log: Some(PathBuf::from("sync.log")),
            outbound_ms: Some(10),
            inbound_ms: Some(40),
            idle_ms: Some(250),
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
    }
}
