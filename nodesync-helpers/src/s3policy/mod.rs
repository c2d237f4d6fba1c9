//! S3 bucket policy helper
//!
//! Restricts anonymous reads on a bucket to the external addresses of the
//! cluster's nodes by replacing the bucket policy through `PutBucketPolicy`.
//! Works against AWS and S3-compatible services (MinIO, Ceph RGW).

pub mod policy;

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::put_bucket_policy::PutBucketPolicyError;
use url::Url;

use nodesync_core::config::S3PolicyHelperConfig;
use nodesync_core::{Error, NodeHelper, Result, Snapshot};

pub use policy::render_policy;

pub const HELPER_NAME: &str = "s3";

/// Provider name attached to credentials taken from the config file
const CONFIG_CREDENTIALS: &str = "nodesync-config";

pub struct S3PolicyHelper {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3PolicyHelper {
    /// Build the helper.
    ///
    /// Credentials and region left empty in the config come from the AWS
    /// default chain: environment, shared `~/.aws` files and profiles, web
    /// identity (IRSA), then container and instance metadata. Both are
    /// resolved here so a missing setting fails startup.
    pub async fn new(config: &S3PolicyHelperConfig) -> Result<Self> {
        let bucket = config.bucket_name.trim().to_string();
        if bucket.is_empty() {
            return Err(Error::Config("s3.bucket_name is required".to_string()));
        }

        let endpoint = non_empty(&config.endpoint)
            .map(|endpoint| parse_endpoint(&endpoint))
            .transpose()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
                .build(),
        );
        if let Some(region) = non_empty(&config.region) {
            loader = loader.region(Region::new(region));
        }
        if let Some(credentials) = static_credentials(config) {
            loader = loader.credentials_provider(credentials);
        }
        let sdk_config = loader.load().await;

        let region = sdk_config.region().cloned().ok_or_else(|| {
            Error::Config(
                "no S3 region configured: set s3.region, AWS_REGION or a profile region"
                    .to_string(),
            )
        })?;

        let provider = sdk_config
            .credentials_provider()
            .ok_or_else(|| Error::Config("no S3 credentials provider available".to_string()))?;
        provider.provide_credentials().await.map_err(|e| {
            Error::Config(format!("no usable S3 credentials: {}", DisplayErrorContext(&e)))
        })?;

        let path_style = uses_path_style(endpoint.as_ref(), config.force_path_style);
        let mut s3_config =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(path_style);
        if let Some(endpoint) = &endpoint {
            s3_config = s3_config.endpoint_url(endpoint.as_str().trim_end_matches('/'));
        }

        tracing::info!(
            bucket = %bucket,
            region = %region,
            endpoint = endpoint.as_ref().map_or("aws", Url::as_str),
            path_style,
            "S3 policy helper configured"
        );

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config.build()),
            bucket,
        })
    }

    /// Render the bucket policy for a snapshot's external addresses
    pub fn render(&self, snapshot: &Snapshot) -> Result<String> {
        render_policy(&self.bucket, &snapshot.external_ips())
    }

    async fn put_policy(&self, policy: String) -> Result<()> {
        self.client
            .put_bucket_policy()
            .bucket(&self.bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|e| remote_error(&self.bucket, &e))?;
        Ok(())
    }
}

#[async_trait]
impl NodeHelper for S3PolicyHelper {
    fn name(&self) -> &str {
        HELPER_NAME
    }

    async fn apply(&self, snapshot: &Snapshot) -> Result<()> {
        let policy = self.render(snapshot)?;
        let addresses = snapshot.external_ips().len();
        self.put_policy(policy).await?;

        tracing::info!(
            bucket = %self.bucket,
            addresses,
            "S3 bucket policy updated"
        );
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Static credentials from the config; both key fields must be set
fn static_credentials(config: &S3PolicyHelperConfig) -> Option<Credentials> {
    let access_key_id = non_empty(&config.access_key_id)?;
    let secret_access_key = non_empty(&config.secret_access_key)?;
    Some(Credentials::new(
        access_key_id,
        secret_access_key,
        non_empty(&config.session_token),
        None,
        CONFIG_CREDENTIALS,
    ))
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| Error::Config(format!("invalid S3 endpoint '{endpoint}': {e}")))?;
    if url.host_str().is_none() {
        return Err(Error::Config(format!("S3 endpoint '{endpoint}' has no host")));
    }
    Ok(url)
}

/// Path-style addressing (`<endpoint>/<bucket>`) when forced, or when the
/// endpoint host is an IP address or `localhost`, where bucket subdomains
/// cannot resolve.
fn uses_path_style(endpoint: Option<&Url>, force_path_style: bool) -> bool {
    force_path_style
        || endpoint
            .and_then(Url::host_str)
            .is_some_and(|host| {
                host == "localhost"
                    || host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>().is_ok()
            })
}

fn remote_error(bucket: &str, err: &SdkError<PutBucketPolicyError, HttpResponse>) -> Error {
    match (err.raw_response(), err.code()) {
        (Some(response), Some(code)) => Error::RemoteApi(format!(
            "S3 rejected policy for bucket '{bucket}' with {} {code}: {}",
            response.status().as_u16(),
            err.message().unwrap_or_default()
        )),
        _ => Error::RemoteApi(format!(
            "failed to put policy for bucket '{bucket}': {}",
            DisplayErrorContext(err)
        )),
    }
}
