//! Reads and writes `~/.armos/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use armos_types::{ArmConfig, ArmError};
use tracing::{debug, warn};

/// Return the path to `~/.armos/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".armos").join("config.toml")
}

/// Load and validate the config at `path`, falling back to defaults when the
/// file does not exist. Environment overrides are applied either way.
///
/// # Errors
///
/// Returns [`ArmError::Config`] when the file cannot be read or parsed, and
/// [`ArmError::InvalidParameter`] when the result fails validation.
pub fn load_or_default(path: &Path) -> Result<ArmConfig, ArmError> {
    let mut cfg = match load_from(path)? {
        Some(cfg) => cfg,
        None => {
            debug!(path = %path.display(), "no config file; using defaults");
            ArmConfig::default()
        }
    };
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Parse the config at `path`. Returns `None` if the file does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<ArmConfig>, ArmError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        ArmError::Config(format!("Failed to read config at {}: {}", path.display(), e))
    })?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| ArmError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(Some(cfg))
}

/// Apply `ARMOS_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ARMOS_KP` | `control.kp` |
/// | `ARMOS_KI` | `control.ki` |
/// | `ARMOS_KD` | `control.kd` |
/// | `ARMOS_ARM_EPSILON` | `mover.arm_epsilon` |
/// | `ARMOS_CONTROL_PERIOD_US` | `control.period_us` |
///
/// Unparseable values are logged and ignored.
pub fn apply_env_overrides(cfg: &mut ArmConfig) {
    override_from_env("ARMOS_KP", &mut cfg.control.kp);
    override_from_env("ARMOS_KI", &mut cfg.control.ki);
    override_from_env("ARMOS_KD", &mut cfg.control.kd);
    override_from_env("ARMOS_ARM_EPSILON", &mut cfg.mover.arm_epsilon);
    override_from_env("ARMOS_CONTROL_PERIOD_US", &mut cfg.control.period_us);
}

fn override_from_env<T: std::str::FromStr>(var: &str, field: &mut T) {
    let Ok(raw) = std::env::var(var) else {
        return;
    };
    match raw.parse() {
        Ok(value) => *field = value,
        Err(_) => warn!(var, value = %raw, "ignoring unparseable environment override"),
    }
}

/// Write `cfg` to `path`, creating the parent directory if necessary.
///
/// # Errors
///
/// Returns [`ArmError::Config`] on any I/O or serialization failure.
pub(crate) fn save_to(cfg: &ArmConfig, path: &Path) -> Result<(), ArmError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ArmError::Config(format!("Failed to create config directory: {}", e)))?;
        // Owner-only directory (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                ArmError::Config(format!("Failed to set config directory permissions: {}", e))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| ArmError::Config(format!("Failed to serialize config: {}", e)))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| {
                ArmError::Config(format!("Failed to write config at {}: {}", path.display(), e))
            })?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| {
        ArmError::Config(format!("Failed to write config at {}: {}", path.display(), e))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_points_to_armos_dir() {
        let p = config_path_for_home("/home/driver");
        assert!(p.to_string_lossy().contains(".armos"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&ArmConfig::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, ArmConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("arm.toml");
        fs::write(&path, "[control]\nkp = 0.002\n\n[mover]\narm_epsilon = 25\n").unwrap();

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.control.kp, 0.002);
        assert_eq!(loaded.control.ki, 0.001);
        assert_eq!(loaded.mover.arm_epsilon, 25);
        assert_eq!(loaded.presets.deposit_on_floor, 200.0);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("arm.toml");
        fs::write(&path, "[control\nkp = ").unwrap();
        assert!(matches!(load_from(&path), Err(ArmError::Config(_))));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("arm.toml");
        fs::write(&path, "[mover]\nwrist_epsilon = 2.0\n").unwrap();
        assert!(matches!(
            load_or_default(&path),
            Err(ArmError::InvalidParameter { ref name, .. }) if name == "mover.wrist_epsilon"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&ArmConfig::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap()).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn apply_env_overrides_changes_gain() {
        // SAFETY: no other test reads ARMOS_KD.
        unsafe { std::env::set_var("ARMOS_KD", "0.0005") };
        let mut cfg = ArmConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.control.kd, 0.0005);
        unsafe { std::env::remove_var("ARMOS_KD") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_epsilon() {
        // SAFETY: no other test reads ARMOS_ARM_EPSILON.
        unsafe { std::env::set_var("ARMOS_ARM_EPSILON", "ten") };
        let mut cfg = ArmConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.mover.arm_epsilon, 10);
        unsafe { std::env::remove_var("ARMOS_ARM_EPSILON") };
    }
}
