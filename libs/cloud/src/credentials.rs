//! API credentials file.
//!
//! The file is INI formatted:
//!
//! ```text
//! [rackspace_cloud]
//! username = myusername
//! api_key = 01234567890abcdef
//! region = LON
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::model::Region;

/// Section holding the credentials.
const SECTION: &str = "rackspace_cloud";

/// Errors loading a credentials file.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// The file does not exist.
    #[error("credentials file '{}' not found", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be used.
    #[error("invalid credentials file '{}': {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

/// API key, redacted from debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

/// Account credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub api_key: ApiKey,

    /// Default region recorded alongside the credentials, if any.
    pub region: Option<Region>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    username: String,
    api_key: String,
    #[serde(default)]
    region: Option<String>,
}

impl Credentials {
    /// Load credentials from an INI file.
    pub fn load(path: &Path) -> Result<Self, CredentialsError> {
        if !path.is_file() {
            return Err(CredentialsError::NotFound(path.to_path_buf()));
        }

        let invalid = |message: String| CredentialsError::Invalid {
            path: path.to_path_buf(),
            message,
        };

        let settings = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()).format(config::FileFormat::Ini))
            .build()
            .map_err(|e| invalid(e.to_string()))?;

        let raw: RawSection = settings
            .get(SECTION)
            .map_err(|e| invalid(format!("section [{SECTION}]: {e}")))?;

        let username = raw.username.trim().to_string();
        let api_key = raw.api_key.trim().to_string();
        if username.is_empty() || api_key.is_empty() {
            return Err(invalid("username and api_key must be set".to_string()));
        }

        let region = match raw.region.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(r) => Some(r.parse().map_err(|e: crate::UnknownRegion| invalid(e.to_string()))?),
        };

        Ok(Self {
            username,
            api_key: ApiKey::new(api_key),
            region,
        })
    }
}

/// Expand a leading `~` to the current user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    let home = || BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());

    if raw == "~" {
        if let Some(home) = home() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = home() {
            return home.join(rest);
        }
    }

    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_credentials() {
        let file = write_file(
            "[rackspace_cloud]\nusername = myusername\napi_key = 01234567890abcdef\nregion = LON\n",
        );

        let creds = Credentials::load(file.path()).unwrap();
        assert_eq!(creds.username, "myusername");
        assert_eq!(creds.api_key.expose(), "01234567890abcdef");
        assert_eq!(creds.region, Some(Region::Lon));
        assert!(!format!("{creds:?}").contains("0123456789"));
    }

    #[test]
    fn test_region_is_optional() {
        let file = write_file("[rackspace_cloud]\nusername = me\napi_key = key\n");
        let creds = Credentials::load(file.path()).unwrap();
        assert_eq!(creds.region, None);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");
        assert!(matches!(
            Credentials::load(&path),
            Err(CredentialsError::NotFound(p)) if p == path
        ));
    }

    #[test]
    fn test_missing_section_is_invalid() {
        let file = write_file("[other]\nusername = me\napi_key = key\n");
        assert!(matches!(
            Credentials::load(file.path()),
            Err(CredentialsError::Invalid { .. })
        ));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/etc/creds"), PathBuf::from("/etc/creds"));
        if let Some(dirs) = BaseDirs::new() {
            assert_eq!(
                expand_home("~/.rackspace_cloud_credentials"),
                dirs.home_dir().join(".rackspace_cloud_credentials")
            );
        }
    }
}
