use super::transport::ShareTransport;
use crate::channel::Credentials;
use crate::options::ShareOptions;
use tracing::{debug, warn};

/// Check that a host's administrative share accepts the credentials.
///
/// Mounts the share and releases it immediately. Every failure, whatever its
/// cause, yields `false`.
pub fn test_credentials(
    transport: &dyn ShareTransport,
    host: &str,
    credentials: &Credentials,
    share: &ShareOptions,
) -> bool {
    let unc = share.unc_root(host);
    match transport.mount(&unc, credentials) {
        Ok(_) => {
            if let Err(e) = transport.unmount(&unc) {
                warn!(host = %host, share = %unc, error = %e, "failed to release share after credential test");
            }
            debug!(host = %host, "credentials accepted");
            true
        }
        Err(e) => {
            debug!(host = %host, error = %e, "credentials rejected");
            false
        }
    }
}
