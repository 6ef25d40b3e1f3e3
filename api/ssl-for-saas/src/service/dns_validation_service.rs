use crate::infra::notifier::{NotifyError, ValidationNotifier};
use crate::module::ssl_job::schema::{DomainValidationOption, ResourceRecord, ValidationMethod};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DnsValidationRecord {
    pub domain: String,
    pub record: ResourceRecord,
}

/// DNS challenges for one job, in domain-iteration order.
#[derive(Debug, Clone, Default)]
pub struct ValidationBatch {
    records: Vec<DnsValidationRecord>,
}

impl ValidationBatch {
    /// Keeps DNS-method options that carry a record; anything else is
    /// skipped. Returns how many were added.
    pub fn collect(&mut self, options: &[DomainValidationOption]) -> usize {
        let before = self.records.len();
        self.records.extend(options.iter().filter_map(|option| {
            match (&option.validation_method, &option.resource_record) {
                (ValidationMethod::Dns, Some(record)) => Some(DnsValidationRecord {
                    domain: option.domain_name.clone(),
                    record: record.clone(),
                }),
                _ => None,
            }
        }));
        self.records.len() - before
    }

    pub fn records(&self) -> &[DnsValidationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.records)
    }
}

/// Serializes the batch, publishes it, and hands back the payload so it can
/// be stored on the job.
pub async fn publish_batch(
    notifier: &dyn ValidationNotifier,
    channel: &str,
    batch: &ValidationBatch,
) -> Result<String, NotifyError> {
    let payload = batch.to_payload().map_err(|e| NotifyError::Publish {
        channel: channel.to_string(),
        message: format!("batch serialization failed: {e}"),
    })?;
    notifier.publish(&payload, channel).await?;
    Ok(payload)
}
