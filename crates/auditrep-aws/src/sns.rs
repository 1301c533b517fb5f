use std::sync::Arc;

use anyhow::{anyhow, Result};
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::Client;
use tokio::runtime::Runtime;

use auditrep_services::Notifier;

use crate::session::AwsSession;

/// Publishes to a single SNS topic.
#[derive(Clone)]
pub struct SnsNotifier {
    rt: Arc<Runtime>,
    client: Client,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new(session: &AwsSession, topic_arn: impl Into<String>) -> Self {
        Self { rt: session.rt.clone(), client: Client::new(&session.sdk), topic_arn: topic_arn.into() }
    }
}

impl Notifier for SnsNotifier {
    fn publish(&self, subject: &str, message: &str) -> Result<()> {
        self.rt
            .block_on(self.client.publish().topic_arn(&self.topic_arn).subject(subject).message(message).send())
            .map_err(|e| anyhow!("Publish to {}: {}", self.topic_arn, DisplayErrorContext(&e)))?;
        Ok(())
    }
}
