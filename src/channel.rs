//! Boundary to the host management channel.
//!
//! The crate never speaks a management protocol itself. Everything it needs
//! from a host (inventory rows, the logged-on user, the install and
//! uninstall methods) goes through the [`ManagementChannel`] trait, which a
//! WMI client or a test double implements.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Whether a host is the machine this process runs on or a remote one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    /// The machine running this process. Queried with the process identity.
    Local,
    /// A remote machine, queried with explicit credentials when given.
    Remote,
}

/// Username and password used against a remote host.
///
/// The `Debug` output never contains the password.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Create credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The account name, possibly domain qualified (`DOMAIN\user`).
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password, for channel and share implementations.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// True when no username was supplied.
    pub fn is_empty(&self) -> bool {
        self.username.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything a channel needs to address one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    /// Host name or address.
    pub name: String,
    /// Local or remote.
    pub location: Location,
    /// Explicit credentials. Only set for remote hosts with a username.
    pub credentials: Option<Credentials>,
}

impl HostTarget {
    /// Management namespace path for this host (`\\name\root\cimv2`).
    pub fn namespace(&self) -> String {
        format!(r"\\{}\root\cimv2", self.name)
    }
}

/// A single property value as returned by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// The property exists but carries no value.
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Str(String),
}

impl Value {
    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Self::Int(i) => write!(f, "{}", i),
            Self::UInt(u) => write!(f, "{}", u),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Self::UInt(u64::from(u))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

/// An ordered bag of named properties.
///
/// Used both for query result rows and for method parameters. Property
/// lookup ignores ASCII case, as management property names do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    properties: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace a property.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self
            .properties
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((name, value)),
        }
    }

    /// Look up a property by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Iterate over properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Read the `ReturnValue` property of a method result.
    pub fn return_value(&self) -> Result<u32, ChannelError> {
        let value = self
            .get("ReturnValue")
            .ok_or_else(|| ChannelError::Fault("method result has no ReturnValue".to_string()))?;
        value.to_string().parse::<u32>().map_err(|_| {
            ChannelError::Fault(format!("ReturnValue '{}' is not a result code", value))
        })
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.set(name, value);
        }
        row
    }
}

/// Faults reported by a management channel implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ChannelError {
    /// The credentials were refused.
    #[error("Access denied: {0}")]
    AccessDenied(String),
    /// The endpoint could not be reached.
    #[error("Host unreachable: {0}")]
    Unreachable(String),
    /// Any other fault.
    #[error("{0}")]
    Fault(String),
}

/// Query and invoke interface of a system management endpoint.
///
/// Implementations are blocking; the crate calls them from blocking
/// worker threads. They must be shareable across threads because one
/// channel serves every host of a fleet.
pub trait ManagementChannel: Send + Sync {
    /// Run a select statement and return the matching rows.
    fn query(&self, target: &HostTarget, statement: &str) -> Result<Vec<Row>, ChannelError>;

    /// Invoke a static method of a management class (e.g. `Win32_Product.Install`).
    fn invoke_static(
        &self,
        target: &HostTarget,
        class: &str,
        method: &str,
        params: Row,
    ) -> Result<Row, ChannelError>;

    /// Invoke a method on an instance previously returned by [`query`](Self::query).
    fn invoke_on(
        &self,
        target: &HostTarget,
        instance: &Row,
        method: &str,
        params: Row,
    ) -> Result<Row, ChannelError>;
}
