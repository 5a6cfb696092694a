use crate::infra::DEFAULT_API_URL;
use dirs::home_dir;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const API_URL_ENV: &str = "MINICRM_API_URL";
pub const STATE_DIR_ENV: &str = "MINICRM_STATE_DIR";
pub const SESSION_COOKIE_ENV: &str = "MINICRM_SESSION_COOKIE";

#[derive(Debug, Error)]
pub enum ResolveStateDirError {
    #[error("home directory not found")]
    HomeDirNotFound,
}

/// `--api` wins over `MINICRM_API_URL`, which wins over the hosted backend.
pub fn resolve_api_url(flag: Option<&str>) -> String {
    let env_value = std::env::var(API_URL_ENV).ok();
    pick_api_url(flag, env_value.as_deref())
}

fn pick_api_url(flag: Option<&str>, env_value: Option<&str>) -> String {
    let chosen = [flag, env_value]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(DEFAULT_API_URL);
    chosen.trim_end_matches('/').to_string()
}

pub fn resolve_state_dir() -> Result<PathBuf, ResolveStateDirError> {
    if let Some(override_dir) = std::env::var_os(STATE_DIR_ENV) {
        return Ok(PathBuf::from(override_dir));
    }

    let Some(home) = home_dir() else {
        return Err(ResolveStateDirError::HomeDirNotFound);
    };

    Ok(home.join(".minicrm"))
}

pub fn resolve_cookie_override() -> Option<String> {
    std::env::var(SESSION_COOKIE_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn log_file_path(state_dir: &Path) -> PathBuf {
    state_dir.join("minicrm.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_overrides_environment() {
        assert_eq!(
            pick_api_url(Some("http://localhost:5000/"), Some("http://env")),
            "http://localhost:5000"
        );
    }

    #[test]
    fn environment_used_when_flag_missing_or_blank() {
        assert_eq!(pick_api_url(None, Some("http://env")), "http://env");
        assert_eq!(pick_api_url(Some("  "), Some("http://env")), "http://env");
    }

    #[test]
    fn falls_back_to_hosted_backend() {
        assert_eq!(pick_api_url(None, None), DEFAULT_API_URL);
        assert_eq!(pick_api_url(None, Some("")), DEFAULT_API_URL);
    }

    #[test]
    fn log_file_lives_in_state_dir() {
        assert_eq!(
            log_file_path(Path::new("/tmp/state")),
            PathBuf::from("/tmp/state/minicrm.log")
        );
    }
}
