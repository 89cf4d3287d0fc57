//! Copying install files to a host's staging folder.

use super::transport::{MountGuard, ShareTransport};
use crate::channel::Credentials;
use crate::error::ManagerError;
use crate::options::ShareOptions;
use rand::Rng;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const INSTALLER_EXTENSION: &str = "msi";

/// Attempts at finding an unused staging folder name.
const MAX_NAME_ATTEMPTS: usize = 16;

/// Files to copy for one install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageRequest {
    /// The `.msi` package.
    pub installer: PathBuf,
    /// Files copied next to the installer.
    pub extra_files: Vec<PathBuf>,
    /// Folders whose contents are merged next to the installer.
    pub extra_folders: Vec<PathBuf>,
}

impl StageRequest {
    pub fn new(installer: impl Into<PathBuf>) -> Self {
        Self {
            installer: installer.into(),
            ..Default::default()
        }
    }

    pub fn with_files(mut self, files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.extra_files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn with_folders(mut self, folders: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.extra_folders.extend(folders.into_iter().map(Into::into));
        self
    }

    /// Reject requests that cannot be staged.
    ///
    /// The installer must be an existing `.msi` file (extension compared
    /// case-insensitively), every extra file and folder must exist, and no
    /// path may be listed twice.
    pub fn validate(&self) -> Result<(), ManagerError> {
        let invalid = |message: String| ManagerError::InvalidRequest { message };

        let is_msi = self
            .installer
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(INSTALLER_EXTENSION));
        if !is_msi {
            return Err(invalid(format!(
                "{} is not a Windows Installer package",
                self.installer.display()
            )));
        }
        if !self.installer.is_file() {
            return Err(invalid(format!(
                "installer {} does not exist",
                self.installer.display()
            )));
        }

        let mut seen = HashSet::new();
        for file in &self.extra_files {
            if !file.is_file() {
                return Err(invalid(format!("file {} does not exist", file.display())));
            }
            if !seen.insert(file) {
                return Err(invalid(format!("file {} is listed twice", file.display())));
            }
        }
        for folder in &self.extra_folders {
            if !folder.is_dir() {
                return Err(invalid(format!("folder {} does not exist", folder.display())));
            }
            if !seen.insert(folder) {
                return Err(invalid(format!("folder {} is listed twice", folder.display())));
            }
        }
        Ok(())
    }

    fn installer_file_name(&self) -> Result<&str, ManagerError> {
        self.installer
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ManagerError::InvalidRequest {
                message: format!("installer path {} has no file name", self.installer.display()),
            })
    }
}

/// Files staged on a host, with the share mount kept open until
/// [`unstage`](Self::unstage).
#[derive(Debug)]
pub struct StagedInstall {
    host: String,
    mount: MountGuard,
    dir: PathBuf,
    installer: PathBuf,
    target_installer: String,
}

impl StagedInstall {
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Staging folder as reached through the share.
    pub fn staged_dir(&self) -> &Path {
        &self.dir
    }

    /// Installer path as reached through the share.
    pub fn installer_path(&self) -> &Path {
        &self.installer
    }

    /// Installer path as seen locally on the target host.
    pub fn target_installer_path(&self) -> &str {
        &self.target_installer
    }

    /// Delete the staged files and release the share.
    ///
    /// Failures are logged and otherwise ignored.
    pub fn unstage(self) {
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            warn!(host = %self.host, dir = %self.dir.display(), error = %e, "failed to delete staged files");
        } else {
            debug!(host = %self.host, dir = %self.dir.display(), "staged files deleted");
        }
        let host = self.host;
        if let Err(e) = self.mount.release() {
            warn!(host = %host, error = %e, "failed to release share after unstaging");
        }
    }
}

/// Copy an installer and its auxiliary files to a fresh folder on `host`.
///
/// The share is mounted with `credentials`, a randomly named subfolder is
/// created under the staging directory, and the installer, each extra file
/// and the contents of each extra folder are copied into it, overwriting
/// files of the same name. On failure the share is released and whatever
/// was copied is removed on a best-effort basis.
pub fn stage(
    transport: Arc<dyn ShareTransport>,
    host: &str,
    credentials: &Credentials,
    request: &StageRequest,
    share: &ShareOptions,
) -> Result<StagedInstall, ManagerError> {
    request.validate()?;
    let installer_name = request.installer_file_name()?.to_string();
    let staging_error = |source: io::Error| ManagerError::Staging {
        host: host.to_string(),
        source,
    };

    let unc = share.unc_root(host);
    let mount = MountGuard::mount(transport, &unc, credentials).map_err(staging_error)?;

    let mut staging_root = mount.path().to_path_buf();
    staging_root.extend(share.staging_components());
    fs::create_dir_all(&staging_root).map_err(staging_error)?;
    let (subfolder, dir) = create_unique_dir(&staging_root).map_err(staging_error)?;

    let copied = match copy_request(request, &installer_name, &dir) {
        Ok(copied) => copied,
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                warn!(host = %host, error = %cleanup, "failed to delete partially staged files");
            }
            return Err(staging_error(e));
        }
    };
    info!(host = %host, dir = %dir.display(), files = copied, "install files staged");

    Ok(StagedInstall {
        host: host.to_string(),
        mount,
        installer: dir.join(&installer_name),
        dir,
        target_installer: share.target_path(&subfolder, &installer_name),
    })
}

/// Create a new randomly named folder under `root`.
fn create_unique_dir(root: &Path) -> io::Result<(String, PathBuf)> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let name = random_folder_name();
        let dir = root.join(&name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok((name, dir)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free staging folder name under {}", root.display()),
    ))
}

/// Eight random characters, a dot and three more, lower case.
fn random_folder_name() -> String {
    let mut chars = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .map(|b| char::from(b).to_ascii_lowercase());
    let stem: String = chars.by_ref().take(8).collect();
    let ext: String = chars.take(3).collect();
    format!("{}.{}", stem, ext)
}

fn copy_request(request: &StageRequest, installer_name: &str, dir: &Path) -> io::Result<usize> {
    fs::copy(&request.installer, dir.join(installer_name))?;
    let mut copied = 1;

    for file in &request.extra_files {
        let name = file.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no file name", file.display()),
            )
        })?;
        fs::copy(file, dir.join(name))?;
        copied += 1;
    }

    for folder in &request.extra_folders {
        copied += copy_folder_contents(folder, dir)?;
    }
    Ok(copied)
}

/// Copy everything below `source` into `dest`, keeping relative paths.
fn copy_folder_contents(source: &Path, dest: &Path) -> io::Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
