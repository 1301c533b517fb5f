use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use auditrep_core::PipelineError;

/// Connection settings; `None` fields defer to the default AWS provider chain.
#[derive(Clone, Debug, Default)]
pub struct AwsSettings {
    pub region: Option<String>,
    pub profile: Option<String>,
    /// Used only when the default chain yields no credentials.
    pub static_credentials: Option<StaticCredentials>,
}

#[derive(Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials").field("access_key_id", &self.access_key_id).finish_non_exhaustive()
    }
}

/// Resolved SDK configuration plus the runtime every client blocks on.
#[derive(Clone)]
pub struct AwsSession {
    pub(crate) rt: Arc<Runtime>,
    pub(crate) sdk: SdkConfig,
}

impl AwsSession {
    /// Loads configuration and checks that a region and credentials are
    /// available before any service call is made.
    pub fn connect(settings: &AwsSettings) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("build tokio runtime")?;

        let sdk = rt.block_on(Self::load(settings, None));
        let sdk = if rt.block_on(has_credentials(&sdk)) {
            sdk
        } else {
            warn!("no credentials found in the default provider chain");
            let creds = settings.static_credentials.as_ref().ok_or_else(|| {
                PipelineError::Config(
                    "no AWS credentials available; configure the environment or set [aws] access_key_id / secret_access_key"
                        .to_string(),
                )
            })?;
            info!("falling back to credentials from the config file");
            let creds = Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                "auditrep-config",
            );
            rt.block_on(Self::load(settings, Some(creds)))
        };

        if sdk.region().is_none() {
            return Err(PipelineError::Config("no AWS region configured; pass --region or set [aws] region".to_string()).into());
        }

        Ok(Self { rt: Arc::new(rt), sdk })
    }

    async fn load(settings: &AwsSettings, creds: Option<Credentials>) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(creds) = creds {
            loader = loader.credentials_provider(creds);
        }
        loader.load().await
    }

    pub fn region(&self) -> Option<&str> {
        self.sdk.region().map(|r| r.as_ref())
    }
}

async fn has_credentials(sdk: &SdkConfig) -> bool {
    match sdk.credentials_provider() {
        Some(provider) => provider.provide_credentials().await.is_ok(),
        None => false,
    }
}
