//! Loading of upstream credentials from a secrets file.
//!
//! The secrets file is TOML:
//!
//! ```toml
//! source_token = "BQDx..."
//! catalog_token = "ya29..."  # optional, for catalogs that need one
//! ```

use std::{fs, path::Path};

use serde::Deserialize;
use veil::Redact;

use crate::{
    error::{Error, Result},
    token::BearerToken,
};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SecretsFile {
    source_token: String,
    catalog_token: Option<String>,
}

/// Bearer tokens for both upstreams.
#[derive(Clone, PartialEq, Eq, Redact)]
pub struct Credentials {
    #[redact]
    pub source: BearerToken,

    #[redact]
    pub catalog: Option<BearerToken>,
}

impl Credentials {
    /// Secrets files are tiny; anything larger is not one.
    const MAX_FILE_SIZE: u64 = 4096;

    /// Reads credentials from a secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is larger than 4 KiB,
    /// is not valid TOML, or holds an invalid token.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Prevent out-of-memory condition on a wrong path.
        let file_size = fs::metadata(path)?.len();
        if file_size > Self::MAX_FILE_SIZE {
            return Err(Error::invalid_argument(format!(
                "{} is too large",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        contents.parse()
    }
}

impl std::str::FromStr for Credentials {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let secrets: SecretsFile = toml::from_str(s)?;

        Ok(Self {
            source: secrets.source_token.parse()?,
            catalog: secrets
                .catalog_token
                .as_deref()
                .map(str::parse::<BearerToken>)
                .transpose()?,
        })
    }
}
