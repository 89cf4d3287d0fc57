//! In-memory channel and share doubles shared by unit tests.

use crate::channel::{ChannelError, Credentials, HostTarget, ManagementChannel, Row, Value};
use crate::share::ShareTransport;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

pub(crate) const JAVA: &str = "26A24AE4-039D-4CA4-87B4-2F86418065F0";
pub(crate) const SEVEN_ZIP: &str = "23170F69-40C1-2702-1900-000001000000";
pub(crate) const NOTEPAD: &str = "99A2B3C4-0000-1111-2222-333344445555";

pub(crate) fn product_row(code: &str, name: &str, version: &str) -> Row {
    Row::new()
        .with("IdentifyingNumber", format!("{{{}}}", code))
        .with("Name", name)
        .with("Version", version)
        .with("Vendor", "Test Vendor")
        .with("InstallDate", "20240115")
        .with("AssignmentType", 1u32)
        .with("InstallState", 5i32)
}

/// Channel serving a fixed product list.
pub(crate) struct MockChannel {
    products: Mutex<Vec<Row>>,
    user: Mutex<Option<Value>>,
    query_error: Mutex<Option<ChannelError>>,
    install_result: Mutex<u32>,
    uninstall_result: Mutex<u32>,
    calls: Mutex<Vec<String>>,
    product_queries: AtomicUsize,
    held: Mutex<bool>,
    released: Condvar,
}

impl MockChannel {
    pub(crate) fn new(products: Vec<Row>) -> Self {
        Self {
            products: Mutex::new(products),
            user: Mutex::new(None),
            query_error: Mutex::new(None),
            install_result: Mutex::new(0),
            uninstall_result: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
            product_queries: AtomicUsize::new(0),
            held: Mutex::new(false),
            released: Condvar::new(),
        }
    }

    pub(crate) fn with_standard_products() -> Self {
        Self::new(vec![
            product_row(JAVA, "Java 8 Update 251", "8.0.2510.8"),
            product_row(SEVEN_ZIP, "7-Zip 19.00 (x64 edition)", "19.00.00.0"),
            product_row(NOTEPAD, "Notepad++", "8.6.2"),
        ])
    }

    pub(crate) fn set_user(&self, user: Option<Value>) {
        *self.user.lock().unwrap() = user;
    }

    pub(crate) fn fail_queries(&self, error: ChannelError) {
        *self.query_error.lock().unwrap() = Some(error);
    }

    pub(crate) fn set_install_result(&self, code: u32) {
        *self.install_result.lock().unwrap() = code;
    }

    pub(crate) fn set_uninstall_result(&self, code: u32) {
        *self.uninstall_result.lock().unwrap() = code;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn product_queries(&self) -> usize {
        self.product_queries.load(Ordering::SeqCst)
    }

    /// Block inventory queries until [`release`](Self::release).
    pub(crate) fn hold(&self) {
        *self.held.lock().unwrap() = true;
    }

    pub(crate) fn release(&self) {
        *self.held.lock().unwrap() = false;
        self.released.notify_all();
    }

    /// Poll until an inventory query has started.
    pub(crate) async fn wait_for_query(&self) {
        for _ in 0..200 {
            if self.product_queries() > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("inventory query never started");
    }

    fn wait_while_held(&self) {
        let mut held = self.held.lock().unwrap();
        while *held {
            held = self.released.wait(held).unwrap();
        }
    }

    fn matching_products(&self, statement: &str) -> Vec<Row> {
        let code = statement
            .split("'{")
            .nth(1)
            .and_then(|rest| rest.split("}'").next())
            .unwrap_or_default()
            .to_string();
        self.products
            .lock()
            .unwrap()
            .iter()
            .filter(|row| {
                row.get("IdentifyingNumber")
                    .map(|value| value.to_string().eq_ignore_ascii_case(&format!("{{{}}}", code)))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}

impl ManagementChannel for MockChannel {
    fn query(&self, target: &HostTarget, statement: &str) -> Result<Vec<Row>, ChannelError> {
        if let Some(error) = self.query_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.calls
            .lock()
            .unwrap()
            .push(format!("query {} {}", target.name, statement));

        if statement.contains("Win32_ComputerSystem") {
            return Ok(match self.user.lock().unwrap().clone() {
                Some(user) => vec![Row::new()
                    .with("Name", target.name.as_str())
                    .with("UserName", user)],
                None => Vec::new(),
            });
        }
        if statement.contains("IdentifyingNumber like") {
            return Ok(self.matching_products(statement));
        }

        self.product_queries.fetch_add(1, Ordering::SeqCst);
        self.wait_while_held();
        Ok(self.products.lock().unwrap().clone())
    }

    fn invoke_static(
        &self,
        target: &HostTarget,
        class: &str,
        method: &str,
        params: Row,
    ) -> Result<Row, ChannelError> {
        let location = params
            .get("PackageLocation")
            .map(|v| v.to_string())
            .unwrap_or_default();
        let options = params.get("Options").map(|v| v.to_string()).unwrap_or_default();
        self.calls.lock().unwrap().push(format!(
            "{}.{} {} {} [{}]",
            class, method, target.name, location, options
        ));
        Ok(Row::new().with("ReturnValue", *self.install_result.lock().unwrap()))
    }

    fn invoke_on(
        &self,
        target: &HostTarget,
        instance: &Row,
        method: &str,
        _params: Row,
    ) -> Result<Row, ChannelError> {
        let code = instance
            .get("IdentifyingNumber")
            .map(|v| v.to_string())
            .unwrap_or_default();
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {} {}", method, target.name, code));
        let result = *self.uninstall_result.lock().unwrap();
        if result == 0 || result == 3010 {
            self.products.lock().unwrap().retain(|row| {
                row.get("IdentifyingNumber").map(|v| v.to_string()) != Some(code.clone())
            });
        }
        Ok(Row::new().with("ReturnValue", result))
    }
}

/// Share transport mapping every UNC path onto one local directory.
pub(crate) struct DirShare {
    root: PathBuf,
    password: Option<String>,
    pub(crate) mounts: AtomicUsize,
}

impl DirShare {
    pub(crate) fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            password: None,
            mounts: AtomicUsize::new(0),
        }
    }

    /// Only accept this password.
    pub(crate) fn requiring_password(root: &Path, password: &str) -> Self {
        Self {
            password: Some(password.to_string()),
            ..Self::new(root)
        }
    }
}

impl ShareTransport for DirShare {
    fn mount(&self, _unc: &str, credentials: &Credentials) -> io::Result<PathBuf> {
        if let Some(expected) = &self.password {
            if credentials.password() != expected {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "logon failure"));
            }
        }
        self.mounts.fetch_add(1, Ordering::SeqCst);
        Ok(self.root.clone())
    }

    fn unmount(&self, _unc: &str) -> io::Result<()> {
        self.mounts.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
