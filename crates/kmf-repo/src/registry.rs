//! Private container registry and caller identity (AWS ECR and STS)

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::error::{RepoError, Result};

/// Repository lookup and creation in the private registry
#[async_trait]
pub trait RegistryService: Send + Sync {
    /// URI of an existing repository, `None` if it does not exist
    async fn find_repository(&self, name: &str) -> Result<Option<String>>;

    /// Create a repository, returning its URI
    async fn create_repository(&self, name: &str) -> Result<String>;
}

/// Who is calling, used to address the private registry
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn account_id(&self) -> Result<String>;
}

/// Host of an account's private registry
pub fn registry_host(account_id: &str, region: &str) -> String {
    format!("{}.dkr.ecr.{}.amazonaws.com", account_id, region)
}

/// Shared AWS configuration, loaded from the environment and profile
#[derive(Debug, Clone)]
pub struct AwsContext {
    config: SdkConfig,
}

impl AwsContext {
    /// Load credentials and region; `region` overrides the configured one
    pub async fn load(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        Self {
            config: loader.load().await,
        }
    }

    pub fn region(&self) -> Result<String> {
        self.config
            .region()
            .map(|r| r.as_ref().to_string())
            .ok_or_else(|| RepoError::Registry {
                message: "no AWS region configured (set AWS_REGION or a profile region)"
                    .to_string(),
            })
    }
}

/// Elastic Container Registry
#[derive(Debug, Clone)]
pub struct EcrRegistry {
    client: aws_sdk_ecr::Client,
}

impl EcrRegistry {
    pub fn new(context: &AwsContext) -> Self {
        Self {
            client: aws_sdk_ecr::Client::new(&context.config),
        }
    }
}

#[async_trait]
impl RegistryService for EcrRegistry {
    async fn find_repository(&self, name: &str) -> Result<Option<String>> {
        let response = self
            .client
            .describe_repositories()
            .repository_names(name)
            .send()
            .await;

        match response {
            Ok(output) => Ok(output
                .repositories()
                .iter()
                .find(|repo| repo.repository_name() == Some(name))
                .and_then(|repo| repo.repository_uri())
                .map(str::to_string)),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_repository_not_found_exception() {
                    Ok(None)
                } else {
                    Err(RepoError::Registry {
                        message: format!(
                            "describe repository {}: {}",
                            name,
                            aws_sdk_ecr::error::DisplayErrorContext(&service_error)
                        ),
                    })
                }
            }
        }
    }

    async fn create_repository(&self, name: &str) -> Result<String> {
        let output = self
            .client
            .create_repository()
            .repository_name(name)
            .send()
            .await
            .map_err(|e| RepoError::Registry {
                message: format!(
                    "create repository {}: {}",
                    name,
                    aws_sdk_ecr::error::DisplayErrorContext(&e)
                ),
            })?;

        output
            .repository()
            .and_then(|repo| repo.repository_uri())
            .map(str::to_string)
            .ok_or_else(|| RepoError::Registry {
                message: format!("created repository {} has no URI", name),
            })
    }
}

/// Security Token Service caller identity
#[derive(Debug, Clone)]
pub struct StsIdentity {
    client: aws_sdk_sts::Client,
}

impl StsIdentity {
    pub fn new(context: &AwsContext) -> Self {
        Self {
            client: aws_sdk_sts::Client::new(&context.config),
        }
    }
}

#[async_trait]
impl IdentityService for StsIdentity {
    async fn account_id(&self) -> Result<String> {
        let output = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| RepoError::Identity {
                message: aws_sdk_sts::error::DisplayErrorContext(&e).to_string(),
            })?;

        output
            .account()
            .map(str::to_string)
            .ok_or_else(|| RepoError::Identity {
                message: "caller identity has no account".to_string(),
            })
    }
}
