use std::sync::Arc;

use anyhow::{anyhow, Result};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tokio::runtime::Runtime;
use tracing::debug;

use auditrep_services::ObjectStorage;

use crate::session::AwsSession;

#[derive(Clone)]
pub struct S3ObjectStorage {
    rt: Arc<Runtime>,
    client: Client,
}

impl S3ObjectStorage {
    pub fn new(session: &AwsSession) -> Self {
        Self { rt: session.rt.clone(), client: Client::new(&session.sdk) }
    }
}

impl ObjectStorage for S3ObjectStorage {
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        debug!(bucket, key, bytes = body.len(), "put object");
        self.rt
            .block_on(
                self.client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .content_type(content_type)
                    .acl(ObjectCannedAcl::BucketOwnerFullControl)
                    .body(ByteStream::from(body))
                    .send(),
            )
            .map_err(|e| anyhow!("PutObject s3://{}/{}: {}", bucket, key, DisplayErrorContext(&e)))?;
        Ok(())
    }
}
