use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_URL: &str = "https://cds.climate.copernicus.eu/api/v2";

const RC_FILE: &str = ".cdsapirc";

/// CDS endpoint and API key, resolved the way the Python `cdsapi` client
/// resolves them: environment first, then `~/.cdsapirc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub url: String,
    pub key: String,
}

impl Credentials {
    /// Resolve credentials from `CDSAPI_URL`/`CDSAPI_KEY`, falling back to
    /// `~/.cdsapirc` for whichever is unset.
    pub fn resolve() -> Result<Self> {
        let env_url = env::var("CDSAPI_URL").ok().filter(|s| !s.is_empty());
        let env_key = env::var("CDSAPI_KEY").ok().filter(|s| !s.is_empty());

        if let Some(key) = &env_key {
            return Ok(Self {
                url: env_url.unwrap_or_else(|| DEFAULT_URL.to_string()),
                key: key.clone(),
            });
        }

        let rc = rc_path();
        let mut creds = Self::from_rc_file(&rc)?;
        if let Some(url) = env_url {
            creds.url = url;
        }
        Ok(creds)
    }

    /// Parse a `.cdsapirc` file: `url:` and `key:` lines, `#` comments.
    pub fn from_rc_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|_| Error::MissingCredentials(path.display().to_string()))?;
        let creds = Self::parse_rc(&text)?;
        Ok(creds)
    }

    fn parse_rc(text: &str) -> Result<Self> {
        let mut url = None;
        let mut key = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                return Err(Error::Config(format!("malformed .cdsapirc line: {line}")));
            };
            match name.trim() {
                "url" => url = Some(value.trim().to_string()),
                // The key itself may contain ':' (uid:secret form), so only
                // the first colon separates name from value.
                "key" => key = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let key = key.ok_or_else(|| Error::Config("no `key:` entry in .cdsapirc".into()))?;
        if key.is_empty() {
            return Err(Error::Config("empty `key:` entry in .cdsapirc".into()));
        }

        Ok(Self {
            url: url.unwrap_or_else(|| DEFAULT_URL.to_string()),
            key,
        })
    }
}

fn rc_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(RC_FILE)
}
