#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use bound_core::CheckConfig;
use miette::Diagnostic;
use thiserror::Error;

pub const CONFIG_FILE: &str = "bound.toml";

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(bound::config))]
pub struct ConfigError {
    pub message: String,
}

/// `bound.toml` as written on disk. Every key is optional and only
/// overrides the matching `CheckConfig` default.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    check: Option<CheckSection>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct CheckSection {
    max_reduction_steps: Option<usize>,
    max_fm_constraints: Option<usize>,
    builtin_contracts: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedConfig {
    pub config_path: Option<PathBuf>,
    pub check: CheckConfig,
}

/// Walks up from `start` looking for `bound.toml`.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = cur.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        match cur.parent() {
            Some(p) => cur = p.to_path_buf(),
            None => return None,
        }
    }
}

/// An explicit `--config` path must exist; otherwise the nearest
/// `bound.toml` above `input` is used, if any.
pub fn resolve_config(
    explicit: Option<&Path>,
    input: &Path,
) -> Result<ResolvedConfig, ConfigError> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(input),
    };
    let Some(path) = path else {
        return Ok(ResolvedConfig::default());
    };

    let raw = fs::read_to_string(&path).map_err(|e| ConfigError {
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    let check = parse_config(&raw).map_err(|e| ConfigError {
        message: format!("failed to parse {}: {}", path.display(), e.message),
    })?;
    Ok(ResolvedConfig {
        config_path: Some(path),
        check,
    })
}

pub fn parse_config(raw: &str) -> Result<CheckConfig, ConfigError> {
    let parsed: ConfigFile = toml::from_str(raw).map_err(|e| ConfigError {
        message: e.to_string(),
    })?;

    let mut out = CheckConfig::default();
    if let Some(check) = parsed.check {
        if let Some(steps) = check.max_reduction_steps {
            out.max_reduction_steps = steps;
        }
        if let Some(limit) = check.max_fm_constraints {
            out.max_fm_constraints = limit;
        }
        if let Some(builtins) = check.builtin_contracts {
            out.builtin_contracts = builtins;
        }
    }
    if out.max_fm_constraints == 0 {
        return Err(ConfigError {
            message: "`max_fm_constraints` must be at least 1".to_string(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_defaults() {
        assert_eq!(parse_config("").unwrap(), CheckConfig::default());
    }

    #[test]
    fn keys_override_defaults() {
        let cfg = parse_config(
            "[check]\nmax_reduction_steps = 50\nbuiltin_contracts = false\n",
        )
        .unwrap();
        assert_eq!(cfg.max_reduction_steps, 50);
        assert!(!cfg.builtin_contracts);
        assert_eq!(cfg.max_fm_constraints, CheckConfig::default().max_fm_constraints);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_config("[check]\nmax_steps = 3\n").unwrap_err();
        assert!(err.message.contains("max_steps"));
    }

    #[test]
    fn zero_constraint_limit_is_rejected() {
        assert!(parse_config("[check]\nmax_fm_constraints = 0\n").is_err());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let missing = Path::new("definitely/not/here/bound.toml");
        assert!(resolve_config(Some(missing), Path::new(".")).is_err());
    }
}
