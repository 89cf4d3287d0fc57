//! Fleet session: the caller-facing surface over a set of hosts.
//!
//! A [`Fleet`] owns its hosts, the shared management channel and share
//! transport, the configuration and the current include/exclude patterns.
//! Retrieval is asynchronous; install, uninstall and credential tests are
//! blocking calls the caller runs off its interactive thread.

use crate::channel::{Credentials, ManagementChannel};
use crate::error::ManagerError;
use crate::filter::PatternSet;
use crate::host::{Host, HostSummary, RetrievalReport, RetrievalTicket};
use crate::options::ManagerOptions;
use crate::package::PackageRecord;
use crate::progress::InstallProgress;
use crate::result_code::ClassifiedResult;
use crate::share::{self, ShareTransport, StageRequest};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// How an install on one host ended.
#[derive(Debug)]
pub enum InstallOutcome {
    /// The installer ran; its result code is classified.
    Completed(ClassifiedResult),
    /// The files could not be copied to the host. Nothing was installed.
    CopyFailed(ManagerError),
    /// The files were copied but the install call itself failed.
    InstallFailed(ManagerError),
}

impl InstallOutcome {
    /// Whether the installer ran and reported success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(result) if result.is_success())
    }
}

/// State of one row of an uninstall batch.
#[derive(Debug)]
pub enum UninstallStatus {
    /// Not attempted yet.
    Pending,
    /// The uninstall ran; its result code is classified.
    Done(ClassifiedResult),
    /// The uninstall could not be performed.
    Failed(ManagerError),
}

/// One package to uninstall from one host.
#[derive(Debug)]
pub struct UninstallRow {
    pub host: String,
    pub identifying_code: String,
    pub status: UninstallStatus,
}

impl UninstallRow {
    fn succeeded(&self) -> bool {
        matches!(&self.status, UninstallStatus::Done(result) if result.is_success())
    }
}

/// A set of uninstalls and the packages already handled on each host.
///
/// A row enters the handled list the first time it is recorded with a
/// successful result, and only once, however often it is recorded again.
/// Running the batch again skips handled rows.
#[derive(Debug, Default)]
pub struct UninstallBatch {
    rows: Vec<UninstallRow>,
    handled: Vec<(String, String)>,
}

impl UninstallBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row. Duplicate host/code pairs are ignored.
    pub fn add(&mut self, host: impl Into<String>, identifying_code: impl Into<String>) {
        let host = host.into();
        let identifying_code = identifying_code.into();
        if self.position(&host, &identifying_code).is_some() {
            return;
        }
        self.rows.push(UninstallRow {
            host,
            identifying_code,
            status: UninstallStatus::Pending,
        });
    }

    pub fn rows(&self) -> &[UninstallRow] {
        &self.rows
    }

    /// `(host, identifying code)` pairs uninstalled successfully, in the
    /// order handled.
    pub fn handled(&self) -> &[(String, String)] {
        &self.handled
    }

    /// Rows not yet uninstalled successfully.
    pub fn pending(&self) -> impl Iterator<Item = &UninstallRow> {
        self.rows.iter().filter(|row| !row.succeeded())
    }

    pub fn is_complete(&self) -> bool {
        self.rows.iter().all(UninstallRow::succeeded)
    }

    /// Store the outcome of a row and update the handled list.
    pub fn record(&mut self, host: &str, identifying_code: &str, status: UninstallStatus) {
        let Some(index) = self.position(host, identifying_code) else {
            return;
        };
        let row = &mut self.rows[index];
        row.status = status;
        let already = self.handled.iter().any(|(host, code)| {
            host.eq_ignore_ascii_case(&row.host)
                && code.eq_ignore_ascii_case(&row.identifying_code)
        });
        if row.succeeded() && !already {
            self.handled.push((row.host.clone(), row.identifying_code.clone()));
        }
    }

    fn position(&self, host: &str, identifying_code: &str) -> Option<usize> {
        self.rows.iter().position(|row| {
            row.host.eq_ignore_ascii_case(host)
                && row.identifying_code.eq_ignore_ascii_case(identifying_code)
        })
    }
}

/// The set of hosts an operator works with.
pub struct Fleet {
    channel: Arc<dyn ManagementChannel>,
    transport: Arc<dyn ShareTransport>,
    options: Arc<ManagerOptions>,
    hosts: Vec<Host>,
    patterns: PatternSet,
}

impl Fleet {
    pub fn new(
        channel: Arc<dyn ManagementChannel>,
        transport: Arc<dyn ShareTransport>,
        options: ManagerOptions,
    ) -> Self {
        Self {
            channel,
            transport,
            options: Arc::new(options),
            hosts: Vec::new(),
            patterns: PatternSet::default(),
        }
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Look up a host by name, ignoring ASCII case.
    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.iter().find(|host| host.name().eq_ignore_ascii_case(name))
    }

    fn require_host(&self, name: &str) -> Result<&Host, ManagerError> {
        self.host(name).ok_or_else(|| ManagerError::InvalidRequest {
            message: format!("host {} is not part of the fleet", name),
        })
    }

    /// Add the machine this process runs on. Adding it twice is a no-op.
    pub fn add_local_host(&mut self) -> &Host {
        let index = match self.hosts.iter().position(Host::is_local) {
            Some(index) => index,
            None => {
                self.hosts
                    .push(Host::local(self.channel.clone(), self.options.clone()));
                self.hosts.len() - 1
            }
        };
        &self.hosts[index]
    }

    /// Add a remote host.
    pub fn add_host(
        &mut self,
        name: &str,
        credentials: Option<Credentials>,
    ) -> Result<&Host, ManagerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ManagerError::InvalidRequest {
                message: "host name is empty".to_string(),
            });
        }
        if self.host(name).is_some() {
            return Err(ManagerError::InvalidRequest {
                message: format!("host {} is already part of the fleet", name),
            });
        }
        info!(host = %name, "host added");
        self.hosts.push(Host::remote(
            name,
            credentials,
            self.channel.clone(),
            self.options.clone(),
        ));
        Ok(&self.hosts[self.hosts.len() - 1])
    }

    /// Remove a host, stopping any retrieval it runs.
    ///
    /// The local host cannot be removed.
    pub async fn remove_host(&mut self, name: &str) -> Result<(), ManagerError> {
        let index = self
            .hosts
            .iter()
            .position(|host| host.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ManagerError::InvalidRequest {
                message: format!("host {} is not part of the fleet", name),
            })?;
        if self.hosts[index].is_local() {
            return Err(ManagerError::InvalidRequest {
                message: "the local host cannot be removed".to_string(),
            });
        }
        let host = self.hosts.remove(index);
        info!(host = %host.name(), "host removed");
        host.shutdown().await;
        Ok(())
    }

    /// Begin a retrieval pass on one host.
    pub fn refresh(&self, name: &str) -> Result<RetrievalTicket, ManagerError> {
        Ok(self.require_host(name)?.begin_retrieval())
    }

    /// Refresh every host concurrently and wait for the passes launched.
    ///
    /// Hosts already retrieving are skipped; cancelled passes produce no
    /// report.
    pub async fn refresh_all(&self) -> Vec<RetrievalReport> {
        let pending: Vec<_> = self
            .hosts
            .iter()
            .filter_map(|host| match host.begin_retrieval() {
                RetrievalTicket::Started(rx) => Some(rx),
                RetrievalTicket::AlreadyRunning => None,
            })
            .collect();

        join_all(pending)
            .await
            .into_iter()
            .filter_map(Result::ok)
            .collect()
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    pub fn set_patterns(&mut self, include: impl Into<String>, exclude: impl Into<String>) {
        self.patterns = PatternSet::new(include, exclude);
    }

    /// Cached packages of a host passing the current patterns.
    pub fn packages(&self, name: &str) -> Result<Vec<PackageRecord>, ManagerError> {
        Ok(self.require_host(name)?.filtered_packages(&self.patterns))
    }

    pub fn summary(&self, name: &str) -> Result<HostSummary, ManagerError> {
        Ok(self.require_host(name)?.summary(&self.patterns))
    }

    /// Check the host's stored credentials against its administrative share.
    pub fn test_credentials(&self, name: &str) -> Result<bool, ManagerError> {
        let host = self.require_host(name)?;
        Ok(self.test_host_credentials(host, host.credentials()))
    }

    /// Check candidate credentials and store them when they are accepted.
    pub fn update_credentials(
        &mut self,
        name: &str,
        credentials: Credentials,
    ) -> Result<bool, ManagerError> {
        let host = self.require_host(name)?;
        if !self.test_host_credentials(host, &credentials) {
            return Ok(false);
        }
        if let Some(host) = self
            .hosts
            .iter_mut()
            .find(|host| host.name().eq_ignore_ascii_case(name))
        {
            host.set_credentials(credentials);
        }
        Ok(true)
    }

    fn test_host_credentials(&self, host: &Host, credentials: &Credentials) -> bool {
        share::test_credentials(
            self.transport.as_ref(),
            host.name(),
            credentials,
            &self.options.share,
        )
    }

    /// Copy an installer to a host, run it, and remove the copied files.
    ///
    /// `installer_options` is the property string passed to the installer.
    /// Requests that fail validation are rejected as errors before anything
    /// is copied; every later failure is reported through the outcome.
    pub fn install(
        &self,
        name: &str,
        request: &StageRequest,
        installer_options: &str,
        mut on_progress: impl FnMut(InstallProgress),
    ) -> Result<InstallOutcome, ManagerError> {
        let host = self.require_host(name)?;
        request.validate()?;
        let host_name = host.name().to_string();
        let progress = |make: fn(String) -> InstallProgress| make(host_name.clone());

        on_progress(progress(|host| InstallProgress::Copying { host }));
        if !host.is_local() && !self.test_host_credentials(host, host.credentials()) {
            warn!(host = %host_name, "share rejected the credentials");
            return Ok(InstallOutcome::CopyFailed(ManagerError::Authorization {
                host: host_name.clone(),
                message: "the administrative share rejected the credentials".to_string(),
            }));
        }
        let staged = match share::stage(
            self.transport.clone(),
            &host_name,
            host.credentials(),
            request,
            &self.options.share,
        ) {
            Ok(staged) => staged,
            Err(e) => {
                warn!(host = %host_name, error = %e, "staging failed");
                return Ok(InstallOutcome::CopyFailed(e));
            }
        };

        on_progress(progress(|host| InstallProgress::Installing { host }));
        let result = host.install(staged.target_installer_path(), installer_options);

        on_progress(progress(|host| InstallProgress::DeletingTemporaryFiles { host }));
        staged.unstage();

        on_progress(progress(|host| InstallProgress::Completed { host }));
        Ok(match result {
            Ok(code) => InstallOutcome::Completed(self.options.results.describe(code)),
            Err(e) => InstallOutcome::InstallFailed(e),
        })
    }

    /// Uninstall every pending row of a batch, in order.
    ///
    /// Rows already handled are skipped. Rows naming a host outside the
    /// fleet are marked failed.
    pub fn uninstall(&self, batch: &mut UninstallBatch) {
        let pending: Vec<(String, String)> = batch
            .pending()
            .map(|row| (row.host.clone(), row.identifying_code.clone()))
            .collect();

        for (host_name, code) in pending {
            let status = match self
                .require_host(&host_name)
                .and_then(|host| host.uninstall(&code))
            {
                Ok(result) => UninstallStatus::Done(self.options.results.describe(result)),
                Err(e) => {
                    warn!(host = %host_name, code = %code, error = %e, "uninstall failed");
                    UninstallStatus::Failed(e)
                }
            };
            batch.record(&host_name, &code, status);
        }
    }

    /// Stop every host's retrieval and release the hosts.
    pub async fn shutdown(self) {
        join_all(self.hosts.into_iter().map(Host::shutdown)).await;
    }
}

impl std::fmt::Debug for Fleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fleet")
            .field("hosts", &self.hosts)
            .field("patterns", &self.patterns)
            .finish()
    }
}
