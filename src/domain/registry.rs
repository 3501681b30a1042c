use anyhow::{Context, Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

/// Registry rule attached to every published repository: keep only the most
/// recent untagged image
pub const LIFECYCLE_POLICY: &str = r#"{
  "rules": [
    {
      "rulePriority": 1,
      "description": "Keep only one untagged image, expire all others",
      "selection": {
        "tagStatus": "untagged",
        "countType": "imageCountMoreThan",
        "countNumber": 1
      },
      "action": {
        "type": "expire"
      }
    }
  ]
}"#;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Short-lived login for one registry endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryAuth {
    pub server: String,
    pub credentials: Credentials,
}

impl RegistryAuth {
    /// Builds a login from an ECR authorization token: `base64(user:password)`
    /// issued for `proxy_endpoint` (`https://<account>.dkr.ecr...`)
    pub fn from_ecr_token(proxy_endpoint: &str, token: &str) -> Result<Self> {
        let decoded = STANDARD
            .decode(token.trim())
            .context("decoding registry authorization token")?;
        let decoded = String::from_utf8(decoded).context("authorization token is not utf-8")?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| anyhow!("authorization token is not of the form user:password"))?;

        let server = proxy_endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            server,
            credentials: Credentials {
                username: username.to_string(),
                password: password.to_string(),
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryStatus {
    Created,
    AlreadyExists,
}
