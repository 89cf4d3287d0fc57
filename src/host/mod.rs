//! A managed host and its package cache.
//!
//! This module provides [`Host`], which owns one machine's credentials, its
//! cached package inventory and the retrieval task that refreshes it.
//! Retrieval is single-flight: while a pass is running, further calls to
//! [`Host::begin_retrieval`] are no-ops.
//!
//! # Example
//!
//! ```rust,no_run
//! use msi_fleet::{Host, ManagementChannel, ManagerOptions, RetrievalTicket};
//! use std::sync::Arc;
//!
//! async fn refresh(channel: Arc<dyn ManagementChannel>) {
//!     let host = Host::local(channel, Arc::new(ManagerOptions::default()));
//!     if let RetrievalTicket::Started(done) = host.begin_retrieval() {
//!         if let Ok(report) = done.await {
//!             println!("{}: {} packages", report.host, report.packages);
//!         }
//!     }
//!     host.shutdown().await;
//! }
//! ```

mod lifecycle;
mod retrieval;

pub use retrieval::{DroppedRecord, FieldFault, RetrievalReport};

use crate::channel::{Credentials, HostTarget, Location, ManagementChannel};
use crate::error::ManagerError;
use crate::filter::PatternSet;
use crate::options::ManagerOptions;
use crate::package::PackageRecord;
use retrieval::RetrievalJob;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Reported as the logged-on user when nobody is logged on.
pub const NOBODY: &str = "#Nobody#";

const COMPUTER_SYSTEM_QUERY: &str = "SELECT * FROM Win32_ComputerSystem";

/// Result of [`Host::begin_retrieval`].
#[derive(Debug)]
pub enum RetrievalTicket {
    /// A new pass was launched. The receiver yields its report once the
    /// cache is rebuilt; it is closed without a value if the pass is
    /// cancelled.
    Started(oneshot::Receiver<RetrievalReport>),
    /// A pass was already running; nothing was launched.
    AlreadyRunning,
}

impl RetrievalTicket {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

/// Counts shown next to a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSummary {
    pub name: String,
    /// Packages in the cache.
    pub total: usize,
    /// Packages passing the current filter.
    pub displayed: usize,
    /// Message of the most recent failure, if any.
    pub last_error: Option<String>,
}

/// State shared between a host and its retrieval task.
#[derive(Default)]
pub(crate) struct HostState {
    packages: Mutex<Vec<PackageRecord>>,
    retrieving: AtomicBool,
    last_error: Mutex<Option<Arc<ManagerError>>>,
    current_user: Mutex<String>,
}

impl HostState {
    fn packages(&self) -> MutexGuard<'_, Vec<PackageRecord>> {
        lock(&self.packages)
    }

    pub(crate) fn clear_packages(&self) {
        self.packages().clear();
    }

    /// Swap in a rebuilt cache unless the pass was cancelled.
    pub(crate) fn publish(&self, records: Vec<PackageRecord>, cancel: &CancellationToken) -> bool {
        let mut packages = self.packages();
        if cancel.is_cancelled() {
            return false;
        }
        *packages = records;
        true
    }

    pub(crate) fn set_last_error(&self, error: Option<Arc<ManagerError>>) {
        *lock(&self.last_error) = error;
    }

    /// Store a resolved user name. A blank name keeps the previous one.
    fn set_current_user(&self, user: &str) -> String {
        let mut current = lock(&self.current_user);
        if !user.trim().is_empty() {
            *current = user.to_string();
        }
        current.clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One machine under management.
pub struct Host {
    name: String,
    location: Location,
    credentials: Credentials,
    channel: Arc<dyn ManagementChannel>,
    options: Arc<ManagerOptions>,
    state: Arc<HostState>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Host {
    /// The machine this process runs on, queried with the process identity.
    pub fn local(channel: Arc<dyn ManagementChannel>, options: Arc<ManagerOptions>) -> Self {
        Self::new(local_machine_name(), Location::Local, Credentials::default(), channel, options)
    }

    /// A remote machine. Without credentials the process identity is used.
    pub fn remote(
        name: impl Into<String>,
        credentials: Option<Credentials>,
        channel: Arc<dyn ManagementChannel>,
        options: Arc<ManagerOptions>,
    ) -> Self {
        Self::new(
            name.into(),
            Location::Remote,
            credentials.unwrap_or_default(),
            channel,
            options,
        )
    }

    fn new(
        name: String,
        location: Location,
        credentials: Credentials,
        channel: Arc<dyn ManagementChannel>,
        options: Arc<ManagerOptions>,
    ) -> Self {
        Self {
            name,
            location,
            credentials,
            channel,
            options,
            state: Arc::new(HostState::default()),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn is_local(&self) -> bool {
        self.location == Location::Local
    }

    /// Username used against the host; empty when none was given.
    pub fn username(&self) -> &str {
        self.credentials.username()
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Replace the credentials used for later operations.
    ///
    /// Ignored for the local host, which always uses the process identity.
    pub fn set_credentials(&mut self, credentials: Credentials) {
        if self.is_local() {
            debug!(host = %self.name, "credentials ignored for local host");
            return;
        }
        self.credentials = credentials;
    }

    /// Addressing information handed to the channel.
    pub fn target(&self) -> HostTarget {
        let credentials = match self.location {
            Location::Remote if !self.credentials.is_empty() => Some(self.credentials.clone()),
            _ => None,
        };
        HostTarget {
            name: self.name.clone(),
            location: self.location,
            credentials,
        }
    }

    /// Snapshot of the cached packages.
    pub fn packages(&self) -> Vec<PackageRecord> {
        self.state.packages().clone()
    }

    /// Cached packages passing `patterns`, in cache order.
    pub fn filtered_packages(&self, patterns: &PatternSet) -> Vec<PackageRecord> {
        self.state
            .packages()
            .iter()
            .filter(|package| patterns.matches(package))
            .cloned()
            .collect()
    }

    pub fn package_count(&self) -> usize {
        self.state.packages().len()
    }

    /// Whether a retrieval pass is in flight.
    pub fn is_retrieving(&self) -> bool {
        self.state.retrieving.load(Ordering::SeqCst)
    }

    /// Most recent failure recorded by a retrieval pass.
    pub fn last_error(&self) -> Option<Arc<ManagerError>> {
        lock(&self.state.last_error).clone()
    }

    /// Logged-on user as last resolved by [`resolve_current_user`](Self::resolve_current_user).
    pub fn current_user(&self) -> String {
        lock(&self.state.current_user).clone()
    }

    pub fn summary(&self, patterns: &PatternSet) -> HostSummary {
        let packages = self.state.packages();
        HostSummary {
            name: self.name.clone(),
            total: packages.len(),
            displayed: packages.iter().filter(|p| patterns.matches(p)).count(),
            last_error: self.last_error().map(|e| e.to_string()),
        }
    }

    /// Launch a retrieval pass unless one is already running.
    ///
    /// Must be called from within a tokio runtime. The pass runs in the
    /// background; channel faults end up in the report and in
    /// [`last_error`](Self::last_error), never as a panic or error here.
    pub fn begin_retrieval(&self) -> RetrievalTicket {
        if self
            .state
            .retrieving
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(host = %self.name, "retrieval already running");
            return RetrievalTicket::AlreadyRunning;
        }

        let (tx, rx) = oneshot::channel();
        let state = self.state.clone();
        let job = RetrievalJob {
            state: self.state.clone(),
            channel: self.channel.clone(),
            target: self.target(),
            cancel: self.cancel.clone(),
        };
        let handle = tokio::spawn(async move {
            let report = retrieval::run(job).await;
            state.retrieving.store(false, Ordering::SeqCst);
            if let Some(report) = report {
                let _ = tx.send(report);
            }
        });
        *lock(&self.task) = Some(handle);
        RetrievalTicket::Started(rx)
    }

    /// Resolve the user logged on to the host.
    ///
    /// The local host reports the process identity. A remote host is asked
    /// for its computer system's user name; [`NOBODY`] means nobody is
    /// logged on. When the host returns no computer system at all the
    /// previous value is kept.
    pub fn resolve_current_user(&self) -> Result<String, ManagerError> {
        let resolved = match self.location {
            Location::Local => Some(process_user()),
            Location::Remote => {
                let rows = self
                    .channel
                    .query(&self.target(), COMPUTER_SYSTEM_QUERY)
                    .map_err(|e| ManagerError::from_channel(&self.name, e))?;
                rows.first().map(|row| {
                    row.get("UserName")
                        .map(|value| value.to_string())
                        .filter(|user| !user.trim().is_empty())
                        .unwrap_or_else(|| NOBODY.to_string())
                })
            }
        };

        Ok(self.state.set_current_user(resolved.as_deref().unwrap_or_default()))
    }

    /// Stop any in-flight retrieval and release the host.
    ///
    /// The retrieval task gets [`ManagerOptions::retrieval_grace`] to notice
    /// the cancellation before it is aborted. A cancelled pass neither
    /// touches the cache nor delivers its report.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let handle = lock(&self.task).take();
        if let Some(mut handle) = handle {
            if tokio::time::timeout(self.options.retrieval_grace, &mut handle)
                .await
                .is_err()
            {
                warn!(host = %self.name, "retrieval did not stop in time, aborting");
                handle.abort();
            }
        }
        debug!(host = %self.name, "host shut down");
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("credentials", &self.credentials)
            .field("retrieving", &self.is_retrieving())
            .finish()
    }
}

fn local_machine_name() -> String {
    ["COMPUTERNAME", "HOSTNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "localhost".to_string())
}

/// `DOMAIN\user` when the domain is known, otherwise the bare user name.
fn process_user() -> String {
    user_from_env(|key| std::env::var(key).ok())
}

/// `DOMAIN\user` from the environment, or empty when no user is set.
fn user_from_env(var: impl Fn(&str) -> Option<String>) -> String {
    let user = ["USERNAME", "USER"]
        .iter()
        .find_map(|key| var(key).filter(|v| !v.is_empty()))
        .unwrap_or_default();
    match var("USERDOMAIN") {
        Some(domain) if !domain.is_empty() && !user.is_empty() => format!(r"{}\{}", domain, user),
        _ => user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelError, Row, Value};
    use crate::package::bracketed;
    use crate::testing::{product_row, MockChannel, JAVA, NOTEPAD, SEVEN_ZIP};
    use std::time::Duration;

    fn options() -> Arc<ManagerOptions> {
        Arc::new(ManagerOptions {
            retrieval_grace: Duration::from_secs(2),
            ..Default::default()
        })
    }

    fn remote(channel: &Arc<MockChannel>) -> Host {
        Host::remote(
            "srv01",
            Some(Credentials::new(r"CORP\admin", "secret")),
            channel.clone(),
            options(),
        )
    }

    async fn retrieve(host: &Host) -> RetrievalReport {
        match host.begin_retrieval() {
            RetrievalTicket::Started(rx) => rx.await.unwrap(),
            RetrievalTicket::AlreadyRunning => panic!("retrieval unexpectedly running"),
        }
    }

    #[tokio::test]
    async fn test_retrieval_populates_cache() {
        let channel = Arc::new(MockChannel::with_standard_products());
        let host = remote(&channel);

        let report = retrieve(&host).await;
        assert!(report.is_ok());
        assert_eq!(report.host, "srv01");
        assert_eq!(report.packages, 3);
        assert_eq!(host.package_count(), 3);
        assert!(!host.is_retrieving());
        assert!(host.packages().iter().any(|p| p.identifying_code == JAVA));
    }

    #[tokio::test]
    async fn test_second_begin_while_running_is_noop() {
        let channel = Arc::new(MockChannel::with_standard_products());
        channel.hold();
        let host = remote(&channel);

        let first = host.begin_retrieval();
        assert!(first.is_started());
        channel.wait_for_query().await;
        assert!(host.is_retrieving());
        assert!(matches!(host.begin_retrieval(), RetrievalTicket::AlreadyRunning));

        channel.release();
        let RetrievalTicket::Started(rx) = first else {
            unreachable!()
        };
        let report = rx.await.unwrap();
        assert_eq!(report.packages, 3);
        assert_eq!(channel.product_queries(), 1);

        // A finished pass allows the next one.
        let again = retrieve(&host).await;
        assert_eq!(again.packages, 3);
        assert_eq!(channel.product_queries(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_retrieval_sends_nothing_and_leaves_cache_empty() {
        let channel = Arc::new(MockChannel::with_standard_products());
        let host = remote(&channel);
        retrieve(&host).await;
        assert_eq!(host.package_count(), 3);

        channel.hold();
        let RetrievalTicket::Started(rx) = host.begin_retrieval() else {
            panic!("retrieval should start");
        };
        channel.wait_for_query().await;
        assert_eq!(host.package_count(), 0);

        host.cancel.cancel();
        channel.release();
        assert!(rx.await.is_err());
        assert_eq!(host.package_count(), 0);
        assert!(!host.is_retrieving());
    }

    #[tokio::test]
    async fn test_shutdown_stops_running_retrieval() {
        let channel = Arc::new(MockChannel::with_standard_products());
        channel.hold();
        let host = remote(&channel);
        let state = host.state.clone();

        let RetrievalTicket::Started(rx) = host.begin_retrieval() else {
            panic!("retrieval should start");
        };
        channel.wait_for_query().await;

        let releaser = {
            let channel = channel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                channel.release();
            })
        };
        host.shutdown().await;
        releaser.join().unwrap();

        assert!(rx.await.is_err());
        assert!(state.packages().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_aborts_after_grace() {
        let channel = Arc::new(MockChannel::with_standard_products());
        channel.hold();
        let host = Host::remote(
            "srv01",
            None,
            channel.clone(),
            Arc::new(ManagerOptions {
                retrieval_grace: Duration::from_millis(20),
                ..Default::default()
            }),
        );
        let state = host.state.clone();
        let RetrievalTicket::Started(rx) = host.begin_retrieval() else {
            panic!("retrieval should start");
        };
        channel.wait_for_query().await;

        host.shutdown().await;
        assert!(rx.await.is_err());
        channel.release();
        assert!(state.packages().is_empty());
    }

    #[tokio::test]
    async fn test_channel_fault_is_recorded_not_raised() {
        let channel = Arc::new(MockChannel::with_standard_products());
        channel.fail_queries(ChannelError::AccessDenied("bad password".into()));
        let host = remote(&channel);

        let report = retrieve(&host).await;
        assert!(!report.is_ok());
        assert!(report.error.as_ref().unwrap().is_authorization());
        assert!(host.last_error().unwrap().is_authorization());
        assert_eq!(host.package_count(), 0);
        assert!(!host.is_retrieving());
    }

    #[tokio::test]
    async fn test_invalid_rows_are_dropped() {
        let channel = Arc::new(MockChannel::new(vec![
            product_row(JAVA, "Java", "8.0"),
            product_row(SEVEN_ZIP, "7-Zip", "19.00").with("IdentifyingNumber", "not-a-code"),
        ]));
        let host = remote(&channel);

        let report = retrieve(&host).await;
        assert_eq!(report.packages, 1);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].raw_code, "not-a-code");
        assert!(!report.field_faults.is_empty());
    }

    #[test]
    fn test_target_credentials_only_for_remote() {
        let channel: Arc<dyn ManagementChannel> = Arc::new(MockChannel::new(Vec::new()));
        let remote = Host::remote(
            "srv01",
            Some(Credentials::new("admin", "pw")),
            channel.clone(),
            options(),
        );
        assert_eq!(remote.target().credentials.unwrap().username(), "admin");

        let anonymous = Host::remote("srv02", None, channel.clone(), options());
        assert!(anonymous.target().credentials.is_none());

        let mut local = Host::local(channel, options());
        local.set_credentials(Credentials::new("admin", "pw"));
        assert!(local.target().credentials.is_none());
        assert_eq!(local.username(), "");
    }

    #[test]
    fn test_debug_hides_password() {
        let channel: Arc<dyn ManagementChannel> = Arc::new(MockChannel::new(Vec::new()));
        let credentials = Some(Credentials::new("admin", "hunter2"));
        let host = Host::remote("srv01", credentials, channel, options());
        let debug = format!("{:?}", host);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_resolve_current_user() {
        let channel = Arc::new(MockChannel::new(Vec::new()));
        let host = remote(&channel);

        channel.set_user(Some(Value::from(r"CORP\jdoe")));
        assert_eq!(host.resolve_current_user().unwrap(), r"CORP\jdoe");

        channel.set_user(Some(Value::Null));
        assert_eq!(host.resolve_current_user().unwrap(), NOBODY);

        // No computer system row keeps the previous value.
        channel.set_user(None);
        assert_eq!(host.resolve_current_user().unwrap(), NOBODY);
        assert_eq!(host.current_user(), NOBODY);
    }

    #[test]
    fn test_blank_user_keeps_previous_value() {
        let channel: Arc<dyn ManagementChannel> = Arc::new(MockChannel::new(Vec::new()));
        let host = Host::local(channel, options());

        assert_eq!(host.state.set_current_user("alice"), "alice");
        assert_eq!(host.state.set_current_user(""), "alice");
        assert_eq!(host.state.set_current_user("  "), "alice");
        assert_eq!(host.current_user(), "alice");
    }

    #[test]
    fn test_user_from_env() {
        let env = |pairs: &'static [(&'static str, &'static str)]| {
            move |key: &str| {
                pairs
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.to_string())
            }
        };
        assert_eq!(user_from_env(env(&[("USER", "alice")])), "alice");
        assert_eq!(
            user_from_env(env(&[("USERNAME", "jdoe"), ("USERDOMAIN", "CORP")])),
            r"CORP\jdoe"
        );
        assert_eq!(user_from_env(env(&[("USERDOMAIN", "CORP")])), "");
        assert_eq!(user_from_env(env(&[])), "");
    }

    #[test]
    fn test_resolve_current_user_authorization_failure() {
        let channel = Arc::new(MockChannel::new(Vec::new()));
        channel.fail_queries(ChannelError::AccessDenied("denied".into()));
        let err = remote(&channel).resolve_current_user().unwrap_err();
        assert!(err.is_authorization());
    }

    #[tokio::test]
    async fn test_install_passes_location_and_options() {
        let channel = Arc::new(MockChannel::new(Vec::new()));
        channel.set_install_result(3010);
        let host = remote(&channel);

        let code = host.install(r"C:\Windows\Temp\x\app.msi", "REBOOT=ReallySuppress").unwrap();
        assert_eq!(code, 3010);
        let code = host.install(r"C:\Windows\Temp\x\app.msi", "  ").unwrap();
        assert_eq!(code, 3010);

        let calls = channel.calls();
        assert_eq!(
            calls[0],
            r"Win32_Product.Install srv01 C:\Windows\Temp\x\app.msi [REBOOT=ReallySuppress]"
        );
        assert_eq!(calls[1], r"Win32_Product.Install srv01 C:\Windows\Temp\x\app.msi []");
    }

    #[tokio::test]
    async fn test_uninstall_success_removes_only_matching_record() {
        let channel = Arc::new(MockChannel::with_standard_products());
        let host = remote(&channel);
        retrieve(&host).await;

        let code = host.uninstall(&SEVEN_ZIP.to_lowercase()).unwrap();
        assert_eq!(code, 0);
        let remaining: Vec<_> = host.packages().into_iter().map(|p| p.identifying_code).collect();
        assert_eq!(remaining, vec![JAVA.to_string(), NOTEPAD.to_string()]);
        assert!(channel
            .calls()
            .iter()
            .any(|c| c.contains(&format!("like '{{{}}}'", SEVEN_ZIP.to_lowercase()))));
    }

    #[tokio::test]
    async fn test_uninstall_pending_restart_removes_record() {
        let channel = Arc::new(MockChannel::with_standard_products());
        channel.set_uninstall_result(3010);
        let host = remote(&channel);
        retrieve(&host).await;

        assert_eq!(host.uninstall(JAVA).unwrap(), 3010);
        assert_eq!(host.package_count(), 2);
    }

    #[tokio::test]
    async fn test_uninstall_failure_keeps_cache() {
        let channel = Arc::new(MockChannel::with_standard_products());
        channel.set_uninstall_result(1603);
        let host = remote(&channel);
        retrieve(&host).await;

        assert_eq!(host.uninstall(JAVA).unwrap(), 1603);
        assert_eq!(host.package_count(), 3);
    }

    #[tokio::test]
    async fn test_uninstall_unknown_code_is_not_found() {
        let channel = Arc::new(MockChannel::with_standard_products());
        let host = remote(&channel);
        retrieve(&host).await;

        let err = host.uninstall("00000000-0000-0000-0000-000000000000").unwrap_err();
        assert!(matches!(err, ManagerError::NotFound { .. }));
        assert_eq!(host.package_count(), 3);
    }

    /// Answers every `like` query with the whole product list, last first,
    /// as a channel evaluating `%` against it would.
    struct WildcardChannel(MockChannel);

    impl ManagementChannel for WildcardChannel {
        fn query(&self, target: &HostTarget, statement: &str) -> Result<Vec<Row>, ChannelError> {
            let mut rows = self.0.query(target, "Select * from Win32_Product")?;
            if statement.contains(" like ") {
                rows.reverse();
            }
            Ok(rows)
        }

        fn invoke_static(
            &self,
            target: &HostTarget,
            class: &str,
            method: &str,
            params: Row,
        ) -> Result<Row, ChannelError> {
            self.0.invoke_static(target, class, method, params)
        }

        fn invoke_on(
            &self,
            target: &HostTarget,
            instance: &Row,
            method: &str,
            params: Row,
        ) -> Result<Row, ChannelError> {
            self.0.invoke_on(target, instance, method, params)
        }
    }

    #[tokio::test]
    async fn test_uninstall_rejects_wildcard_codes() {
        let channel = Arc::new(WildcardChannel(MockChannel::with_standard_products()));
        let host = Host::remote("srv01", None, channel.clone(), options());
        retrieve(&host).await;

        for code in ["%", "26A24AE4%", "{%}", "26A24AE4-039D-4CA4-87B4-2F86418065F_"] {
            let err = host.uninstall(code).unwrap_err();
            assert!(matches!(err, ManagerError::NotFound { .. }), "{}", code);
        }
        assert!(!channel.0.calls().iter().any(|call| call.starts_with("Uninstall")));
        assert_eq!(host.package_count(), 3);
    }

    #[tokio::test]
    async fn test_uninstall_invokes_only_the_requested_product() {
        let channel = Arc::new(WildcardChannel(MockChannel::with_standard_products()));
        let host = Host::remote("srv01", None, channel.clone(), options());
        retrieve(&host).await;

        assert_eq!(host.uninstall(&bracketed(JAVA)).unwrap(), 0);
        let invoked: Vec<_> = channel
            .0
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("Uninstall"))
            .collect();
        assert_eq!(invoked, vec![format!("Uninstall srv01 {}", bracketed(JAVA))]);
        assert_eq!(host.package_count(), 2);
        assert!(host.packages().iter().all(|p| !p.has_code(JAVA)));
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let channel = Arc::new(MockChannel::with_standard_products());
        let host = remote(&channel);
        retrieve(&host).await;

        let summary = host.summary(&PatternSet::new("26A24AE4%", ""));
        assert_eq!(summary.name, "srv01");
        assert_eq!(summary.total, 3);
        assert_eq!(summary.displayed, 1);
        assert!(summary.last_error.is_none());
        assert_eq!(host.filtered_packages(&PatternSet::new("26A24AE4%", "")).len(), 1);
    }
}
