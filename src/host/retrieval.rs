//! Inventory retrieval pass.
//!
//! A pass clears the host's cache, queries every installed product through
//! the channel, converts the rows into [`PackageRecord`]s and publishes the
//! rebuilt list in one swap. The pass checks its cancellation token before
//! starting, after the rows arrive and before each row; a cancelled pass
//! publishes nothing and produces no report.

use super::HostState;
use crate::channel::{HostTarget, ManagementChannel, Row, Value};
use crate::error::ManagerError;
use crate::package::{normalize_identifying_code, AssignmentType, InstallState, PackageRecord};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub(crate) const PRODUCT_QUERY: &str = "Select * from Win32_Product";

/// A descriptive field that could not be read; the field was left empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFault {
    /// Identifying code of the record the field belongs to.
    pub identifying_code: String,
    /// Channel property name.
    pub property: &'static str,
    pub message: String,
}

/// A row that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    /// Raw `IdentifyingNumber` value, empty when absent.
    pub raw_code: String,
    pub reason: String,
}

/// Outcome of one completed retrieval pass.
#[derive(Debug, Clone)]
pub struct RetrievalReport {
    /// Host the pass ran against.
    pub host: String,
    /// Number of records published to the cache.
    pub packages: usize,
    pub field_faults: Vec<FieldFault>,
    pub dropped: Vec<DroppedRecord>,
    /// Channel fault that ended the pass, also stored as the host's last error.
    pub error: Option<Arc<ManagerError>>,
}

impl RetrievalReport {
    fn empty(host: &str) -> Self {
        Self {
            host: host.to_string(),
            packages: 0,
            field_faults: Vec::new(),
            dropped: Vec::new(),
            error: None,
        }
    }

    /// Whether the pass reached the host and read its inventory.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a retrieval task needs, detached from the host.
pub(crate) struct RetrievalJob {
    pub state: Arc<HostState>,
    pub channel: Arc<dyn ManagementChannel>,
    pub target: HostTarget,
    pub cancel: CancellationToken,
}

/// Run one pass. Returns `None` when the pass was cancelled.
pub(crate) async fn run(job: RetrievalJob) -> Option<RetrievalReport> {
    let RetrievalJob {
        state,
        channel,
        target,
        cancel,
    } = job;
    let host = target.name.clone();

    if cancel.is_cancelled() {
        return None;
    }
    debug!(host = %host, "retrieval started");
    state.clear_packages();
    state.set_last_error(None);

    let query_target = target.clone();
    let rows = tokio::task::spawn_blocking(move || channel.query(&query_target, PRODUCT_QUERY))
        .await
        .map_err(|e| ManagerError::Channel {
            host: host.clone(),
            message: format!("inventory query task failed: {}", e),
        })
        .and_then(|result| result.map_err(|e| ManagerError::from_channel(&host, e)));

    if cancel.is_cancelled() {
        debug!(host = %host, "retrieval cancelled after query");
        return None;
    }

    let mut report = RetrievalReport::empty(&host);
    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            warn!(host = %host, error = %e, "inventory query failed");
            let error = Arc::new(e);
            state.set_last_error(Some(error.clone()));
            report.error = Some(error);
            return Some(report);
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        if cancel.is_cancelled() {
            debug!(host = %host, "retrieval cancelled while converting rows");
            return None;
        }
        match convert_row(row, &mut report.field_faults) {
            Ok(record) => records.push(record),
            Err(dropped) => {
                debug!(host = %host, code = %dropped.raw_code, reason = %dropped.reason, "row dropped");
                report.dropped.push(dropped);
            }
        }
    }

    report.packages = records.len();
    if !state.publish(records, &cancel) {
        return None;
    }
    info!(
        host = %host,
        packages = report.packages,
        dropped = report.dropped.len(),
        field_faults = report.field_faults.len(),
        "retrieval finished"
    );
    Some(report)
}

/// Build a record from a product row.
///
/// The identifying code, name and version are required; without them the
/// row is dropped. Other properties that are absent from the row are left
/// empty and reported as field faults. Null values are simply empty.
pub(crate) fn convert_row(
    row: &Row,
    faults: &mut Vec<FieldFault>,
) -> Result<PackageRecord, DroppedRecord> {
    let raw_code = row.get("IdentifyingNumber").map(Value::to_string).unwrap_or_default();
    let identifying_code = normalize_identifying_code(&raw_code).ok_or_else(|| DroppedRecord {
        raw_code: raw_code.clone(),
        reason: "IdentifyingNumber is not a product code".to_string(),
    })?;
    let required = |property: &str| -> Result<String, DroppedRecord> {
        match row.get(property) {
            Some(value) if !value.is_null() => Ok(value.to_string()),
            _ => Err(DroppedRecord {
                raw_code: raw_code.clone(),
                reason: format!("{} is missing", property),
            }),
        }
    };
    let name = required("Name")?;
    let version = required("Version")?;

    let mut record = PackageRecord::new(identifying_code, name, version);
    let mut optional = |property: &'static str| -> String {
        match row.get(property) {
            Some(value) => value.to_string(),
            None => {
                faults.push(FieldFault {
                    identifying_code: record_code(&raw_code),
                    property,
                    message: "property not reported".to_string(),
                });
                String::new()
            }
        }
    };

    record.caption = optional("Caption");
    record.description = optional("Description");
    record.help_link = optional("HelpLink");
    record.install_location = optional("InstallLocation");
    record.install_source = optional("InstallSource");
    record.language = optional("Language");
    record.local_package = optional("LocalPackage");
    record.package_cache = optional("PackageCache");
    record.package_code = optional("PackageCode");
    record.package_name = optional("PackageName");
    record.product_id = optional("ProductID");
    record.registered_owner = optional("RegOwner");
    record.transforms = optional("Transforms");
    record.url_info_about = optional("URLInfoAbout");
    record.url_update_info = optional("URLUpdateInfo");
    record.vendor = optional("Vendor");
    record.install_date = optional("InstallDate");
    record.assignment_type = AssignmentType::from_raw(&optional("AssignmentType"));
    record.install_state = InstallState::from_raw(&optional("InstallState"));
    Ok(record)
}

fn record_code(raw: &str) -> String {
    normalize_identifying_code(raw).unwrap_or_else(|| raw.to_string())
}
