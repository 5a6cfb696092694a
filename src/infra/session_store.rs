use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Cookie name assumed when only the value is pasted (express-session default).
const DEFAULT_COOKIE_NAME: &str = "connect.sid";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    cookie: String,
}

fn session_file_path(state_dir: &Path) -> PathBuf {
    state_dir.join("session.json")
}

/// Turns pasted input into a `Cookie` header value. Accepts `name=value`,
/// a bare value, or a full `Cookie: ...` header line.
pub fn normalize_cookie(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("Cookie:")
        .or_else(|| trimmed.strip_prefix("cookie:"))
        .unwrap_or(trimmed)
        .trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains('=') {
        return Some(trimmed.to_string());
    }
    Some(format!("{DEFAULT_COOKIE_NAME}={trimmed}"))
}

pub fn load_session_cookie(state_dir: &Path) -> Result<Option<String>, io::Error> {
    let path = session_file_path(state_dir);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error),
    };
    let parsed: SessionFile = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(_) => return Ok(None),
    };
    Ok(normalize_cookie(&parsed.cookie))
}

pub fn save_session_cookie(state_dir: &Path, cookie: &str) -> Result<(), io::Error> {
    fs::create_dir_all(state_dir)?;
    let file = SessionFile {
        version: 1,
        cookie: cookie.to_string(),
    };

    let path = session_file_path(state_dir);
    let tmp = path.with_extension("json.tmp");
    let text = serde_json::to_string_pretty(&file).unwrap_or_else(|_| "{}".to_string());
    // A leftover temp file would keep its old permissions.
    match fs::remove_file(&tmp) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(error),
    }
    write_secret_file(&tmp, &text)?;
    fs::rename(tmp, path)?;
    Ok(())
}

#[cfg(unix)]
fn write_secret_file(path: &Path, contents: &str) -> io::Result<()> {
    use std::fs::OpenOptions;
    use std::io::Write as _;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn write_secret_file(path: &Path, contents: &str) -> io::Result<()> {
    fs::write(path, contents)
}

pub fn clear_session_cookie(state_dir: &Path) -> Result<(), io::Error> {
    match fs::remove_file(session_file_path(state_dir)) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_cookie_accepts_common_shapes() {
        assert_eq!(normalize_cookie("  "), None);
        assert_eq!(
            normalize_cookie("connect.sid=s%3Aabc"),
            Some("connect.sid=s%3Aabc".to_string())
        );
        assert_eq!(
            normalize_cookie("s%3Aabc"),
            Some("connect.sid=s%3Aabc".to_string())
        );
        assert_eq!(
            normalize_cookie("Cookie: session=1; session.sig=2"),
            Some("session=1; session.sig=2".to_string())
        );
    }

    #[test]
    fn save_load_and_clear_cookie() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state_dir = dir.path().join("state");

        assert_eq!(load_session_cookie(&state_dir).expect("load"), None);

        save_session_cookie(&state_dir, "connect.sid=abc").expect("save");
        assert_eq!(
            load_session_cookie(&state_dir).expect("load"),
            Some("connect.sid=abc".to_string())
        );

        clear_session_cookie(&state_dir).expect("clear");
        assert_eq!(load_session_cookie(&state_dir).expect("load"), None);
        clear_session_cookie(&state_dir).expect("clearing twice is fine");
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_private_to_the_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("session.json.tmp"), "stale").expect("write");
        save_session_cookie(dir.path(), "connect.sid=abc").expect("save");

        let mode = fs::metadata(dir.path().join("session.json"))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!dir.path().join("session.json.tmp").exists());
    }

    #[test]
    fn corrupt_session_file_reads_as_signed_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("session.json"), "not json").expect("write");
        assert_eq!(load_session_cookie(dir.path()).expect("load"), None);
    }
}
