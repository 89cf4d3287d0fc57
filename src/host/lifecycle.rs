//! Install and uninstall through the management channel.

use super::{lock, Host};
use crate::channel::Row;
use crate::error::ManagerError;
use crate::package::{bracketed, normalize_identifying_code};
use tracing::info;

const PRODUCT_CLASS: &str = "Win32_Product";

impl Host {
    /// Install a package already present on the host.
    ///
    /// `installer_path` is the package location as seen by the host. Options
    /// are passed as a property string (`PROP=value ...`) and omitted when
    /// blank. Returns the raw installer result code, unclassified.
    pub fn install(&self, installer_path: &str, options: &str) -> Result<u32, ManagerError> {
        let mut params = Row::new()
            .with("PackageLocation", installer_path)
            .with("AllUsers", true);
        if !options.trim().is_empty() {
            params.set("Options", options);
        }

        let result = self
            .channel
            .invoke_static(&self.target(), PRODUCT_CLASS, "Install", params)
            .and_then(|row| row.return_value())
            .map_err(|e| ManagerError::from_channel(&self.name, e))?;
        info!(host = %self.name, package = %installer_path, result, "install finished");
        Ok(result)
    }

    /// Uninstall the package with the given identifying code.
    ///
    /// The code must be a GUID, with or without braces; anything else is
    /// reported as not found without querying the host. On a successful
    /// result the record is removed from the cache. The cache is left
    /// untouched when the result is a failure or the package is not on the
    /// host.
    pub fn uninstall(&self, identifying_code: &str) -> Result<u32, ManagerError> {
        let not_found = || ManagerError::NotFound {
            host: self.name.clone(),
            code: identifying_code.to_string(),
        };
        let code = normalize_identifying_code(identifying_code).ok_or_else(not_found)?;

        let target = self.target();
        let statement = format!(
            "Select * from {} where IdentifyingNumber like '{}'",
            PRODUCT_CLASS,
            bracketed(&code)
        );
        let rows = self
            .channel
            .query(&target, &statement)
            .map_err(|e| ManagerError::from_channel(&self.name, e))?;
        let product = rows
            .iter()
            .find(|row| {
                row.get("IdentifyingNumber")
                    .and_then(|value| normalize_identifying_code(&value.to_string()))
                    .is_some_and(|found| found.eq_ignore_ascii_case(&code))
            })
            .ok_or_else(not_found)?;

        let result = self
            .channel
            .invoke_on(&target, product, "Uninstall", Row::new())
            .and_then(|row| row.return_value())
            .map_err(|e| ManagerError::from_channel(&self.name, e))?;
        info!(host = %self.name, code = %code, result, "uninstall finished");

        if self.options.results.is_success(result) {
            lock(&self.state.packages).retain(|package| !package.has_code(&code));
        }
        Ok(result)
    }
}
