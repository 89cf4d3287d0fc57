//! Startup switches.
//!
//! A front end accepts five switches, each written `/k=value`, `-k=value`,
//! `/k:value` or `-k:value` with the key in either case:
//!
//! | Key | Meaning                               |
//! |-----|---------------------------------------|
//! | `i` | include pattern                       |
//! | `x` | exclude pattern                       |
//! | `c` | comma-separated hosts to add          |
//! | `u` | username for those hosts              |
//! | `p` | password for those hosts              |
//!
//! Anything else is ignored.

use crate::channel::Credentials;
use crate::fleet::Fleet;
use tracing::warn;

/// Settings read from startup switches.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StartupArgs {
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub hosts: Vec<String>,
    pub username: String,
    pub password: String,
}

impl StartupArgs {
    /// Parse switches. Later occurrences of a switch win.
    ///
    /// ```rust
    /// use msi_fleet::StartupArgs;
    ///
    /// let args = StartupArgs::parse(["/I=26A24AE4%", "-c:srv01,,srv02", "/u=admin"]);
    /// assert_eq!(args.include.as_deref(), Some("26A24AE4%"));
    /// assert_eq!(args.hosts, vec!["srv01", "srv02"]);
    /// assert_eq!(args.username, "admin");
    /// ```
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Self::default();
        for arg in args {
            let Some((key, value)) = split_switch(arg.as_ref()) else {
                continue;
            };
            match key {
                'i' => parsed.include = Some(value.to_string()),
                'x' => parsed.exclude = Some(value.to_string()),
                'c' => parsed.hosts = parse_host_list(value),
                'u' => parsed.username = value.to_string(),
                'p' => parsed.password = value.to_string(),
                _ => {}
            }
        }
        parsed
    }

    /// Credentials for the listed hosts, when a username was given.
    pub fn credentials(&self) -> Option<Credentials> {
        (!self.username.is_empty()).then(|| Credentials::new(&self.username, &self.password))
    }

    /// Set the fleet's patterns and add the listed hosts.
    ///
    /// Hosts that cannot be added are skipped.
    pub fn apply(&self, fleet: &mut Fleet) {
        if self.include.is_some() || self.exclude.is_some() {
            let include = self
                .include
                .clone()
                .unwrap_or_else(|| fleet.patterns().include().to_string());
            let exclude = self
                .exclude
                .clone()
                .unwrap_or_else(|| fleet.patterns().exclude().to_string());
            fleet.set_patterns(include, exclude);
        }
        for host in &self.hosts {
            if let Err(e) = fleet.add_host(host, self.credentials()) {
                warn!(host = %host, error = %e, "host from startup switches skipped");
            }
        }
    }
}

impl std::fmt::Debug for StartupArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupArgs")
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("hosts", &self.hosts)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Split `/k=value` into the lowercase key and the value.
fn split_switch(arg: &str) -> Option<(char, &str)> {
    let mut chars = arg.chars();
    let prefix = chars.next()?;
    let key = chars.next()?.to_ascii_lowercase();
    let separator = chars.next()?;
    if !matches!(prefix, '/' | '-') || !matches!(separator, '=' | ':') {
        return None;
    }
    Some((key, chars.as_str()))
}

/// Split a comma-separated host list, trimming names and dropping empties.
pub fn parse_host_list(hosts: &str) -> Vec<String> {
    hosts
        .split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DirShare, MockChannel};
    use crate::ManagerOptions;
    use std::sync::Arc;

    #[test]
    fn test_all_switch_forms() {
        for form in ["/i=", "-i=", "/i:", "-i:", "/I=", "-I:"] {
            let args = StartupArgs::parse([format!("{}ABC%", form)]);
            assert_eq!(args.include.as_deref(), Some("ABC%"), "form {}", form);
        }
    }

    #[test]
    fn test_every_key() {
        let args = StartupArgs::parse([
            "/i=26A24AE4%",
            "/x=26A24AE4-039D%",
            "/c=srv01, srv02",
            "/u=CORP\\admin",
            "/p=p@ss:word=1",
        ]);
        assert_eq!(args.include.as_deref(), Some("26A24AE4%"));
        assert_eq!(args.exclude.as_deref(), Some("26A24AE4-039D%"));
        assert_eq!(args.hosts, vec!["srv01", "srv02"]);
        assert_eq!(args.username, r"CORP\admin");
        assert_eq!(args.password, "p@ss:word=1");
        assert_eq!(args.credentials().unwrap().username(), r"CORP\admin");
    }

    #[test]
    fn test_unknown_and_short_args_ignored() {
        let args = StartupArgs::parse(["", "/i", "i=ABC", "/z=1", "--verbose"]);
        assert_eq!(args, StartupArgs::default());
        assert!(args.credentials().is_none());
    }

    #[test]
    fn test_debug_hides_password() {
        let args = StartupArgs::parse(["/u=admin", "/p=hunter2"]);
        assert!(!format!("{:?}", args).contains("hunter2"));
    }

    #[test]
    fn test_parse_host_list() {
        assert_eq!(parse_host_list(" a ,b,,c,"), vec!["a", "b", "c"]);
        assert!(parse_host_list("").is_empty());
        assert!(parse_host_list(" , ").is_empty());
    }

    #[test]
    fn test_apply_to_fleet() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut fleet = Fleet::new(
            Arc::new(MockChannel::new(Vec::new())),
            Arc::new(DirShare::new(dir.path())),
            ManagerOptions::default(),
        );
        fleet.set_patterns("%", "OLD%");
        StartupArgs::parse(["/i=ABC%", "/c=srv01,srv01,srv02", "/u=admin", "/p=pw"])
            .apply(&mut fleet);

        assert_eq!(fleet.patterns().include(), "ABC%");
        assert_eq!(fleet.patterns().exclude(), "OLD%");
        assert_eq!(fleet.hosts().len(), 2);
        assert_eq!(fleet.host("srv02").unwrap().username(), "admin");
    }
}
