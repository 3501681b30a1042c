use crate::domain::{CommandOutput, RegistryApi, RegistryAuth, RepositoryStatus};
use crate::infra::process::{command_line, run_captured};
use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const DEFAULT_REGION: &str = "eu-west-1";
const AWS_CLI: &str = "aws";
const ALREADY_EXISTS: &str = "RepositoryAlreadyExistsException";

/// `RegistryApi` for Amazon ECR, driven through the aws CLI
#[derive(Debug, Clone)]
pub struct EcrRegistry {
    region: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationResponse {
    authorization_data: Vec<AuthorizationData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationData {
    authorization_token: String,
    proxy_endpoint: String,
}

impl EcrRegistry {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    fn ecr(&self, args: &[&str]) -> Result<CommandOutput> {
        let mut full = vec!["ecr"];
        full.extend_from_slice(args);
        full.extend(["--region", self.region.as_str(), "--output", "json"]);

        run_captured(AWS_CLI, &full)
            .with_context(|| format!("running {}", command_line(AWS_CLI, &full)))
    }
}

impl Default for EcrRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

impl RegistryApi for EcrRegistry {
    fn authorization(&self) -> Result<RegistryAuth> {
        let output = self.ecr(&["get-authorization-token"])?;
        if !output.success {
            bail!("aws ecr get-authorization-token failed: {}", output.message());
        }
        parse_authorization(&output.stdout)
    }

    fn create_repository(&self, repository: &str) -> Result<RepositoryStatus> {
        let output = self.ecr(&["create-repository", "--repository-name", repository])?;
        if output.success {
            return Ok(RepositoryStatus::Created);
        }
        if output.stderr.contains(ALREADY_EXISTS) {
            return Ok(RepositoryStatus::AlreadyExists);
        }
        bail!(
            "aws ecr create-repository {repository} failed: {}",
            output.message()
        )
    }

    fn put_lifecycle_policy(&self, repository: &str, policy: &str) -> Result<()> {
        let output = self.ecr(&[
            "put-lifecycle-policy",
            "--repository-name",
            repository,
            "--lifecycle-policy-text",
            policy,
        ])?;
        if !output.success {
            bail!(
                "aws ecr put-lifecycle-policy {repository} failed: {}",
                output.message()
            );
        }
        Ok(())
    }
}

fn parse_authorization(stdout: &str) -> Result<RegistryAuth> {
    let response: AuthorizationResponse =
        serde_json::from_str(stdout).context("parsing get-authorization-token output")?;
    let data = response
        .authorization_data
        .into_iter()
        .next()
        .context("get-authorization-token returned no authorization data")?;

    RegistryAuth::from_ecr_token(&data.proxy_endpoint, &data.authorization_token)
}
