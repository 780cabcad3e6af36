//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Oid`] - Git object identifier (content hash)
//! - [`RefName`] - Validated Git reference name
//! - [`Namespace`] - Validated ref-name prefix scoping one logical queue
//! - [`UtcTimestamp`] - Creation/modification timestamp of a ref
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs: a
//! [`Namespace`] always expands to a well-formed refspec, and a
//! [`RefName`] always names a ref the backing store will accept.
//!
//! # Examples
//!
//! ```
//! use refq::core::types::{Namespace, Oid, RefName};
//!
//! // Valid constructions
//! let ns = Namespace::new("refs/queue/").unwrap();
//! let name = ns.item_ref("task-1").unwrap();
//! assert_eq!(name.as_str(), "refs/queue/task-1");
//! assert!(ns.contains(&name));
//!
//! // Invalid constructions fail at creation time
//! assert!(Namespace::new("queue/").is_err());
//! assert!(RefName::new("bad..name").is_err());
//! assert!(Oid::new("not-a-hash").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),
}

/// A Git object identifier (SHA-1 content hash, 40 hex characters).
///
/// Replicas are SHA-1 repositories, which is all libgit2 can create or
/// clone; accepting the SHA-256 length here would only defer the
/// rejection to the first lookup.
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use refq::core::types::Oid;
///
/// // Create from hex string (normalized to lowercase)
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
///
/// // Get abbreviated form
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// The OID is normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters. If `len` exceeds the OID length,
    /// returns the full OID.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Validate an object id.
    fn validate(oid: &str) -> Result<(), TypeError> {
        if oid.len() != 40 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git reference name.
///
/// Reference names must conform to Git's refname rules (see
/// `git check-ref-format`) and live under `refs/`, so that they can be
/// carried by a push or fetch refspec.
///
/// # Example
///
/// ```
/// use refq::core::types::RefName;
///
/// let name = RefName::new("refs/queue/task-1").unwrap();
/// assert_eq!(name.strip_prefix("refs/queue/"), Some("task-1"));
///
/// assert!(RefName::new("").is_err());
/// assert!(RefName::new("HEAD").is_err());
/// assert!(RefName::new("refs/queue/a..b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name violates Git's
    /// refname rules or is not under `refs/`.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Strip a prefix from the ref name and return the remainder.
    ///
    /// Returns `None` if the ref doesn't start with the given prefix.
    ///
    /// # Example
    ///
    /// ```
    /// use refq::core::types::RefName;
    ///
    /// let name = RefName::new("refs/queue/task-1").unwrap();
    /// assert_eq!(name.strip_prefix("refs/queue/"), Some("task-1"));
    /// assert_eq!(name.strip_prefix("refs/locks/"), None);
    /// ```
    pub fn strip_prefix(&self, prefix: &str) -> Option<&str> {
        self.0.strip_prefix(prefix)
    }

    /// Validate a ref name against Git's refname rules.
    fn validate(name: &str) -> Result<(), TypeError> {
        // Cannot be empty
        if name.is_empty() {
            return Err(TypeError::InvalidRefName("ref name cannot be empty".into()));
        }

        // Must live under refs/ so push/fetch refspecs can carry it
        if !name.starts_with("refs/") {
            return Err(TypeError::InvalidRefName(
                "ref name must start with 'refs/'".into(),
            ));
        }

        // Cannot end with "/" or ".lock"
        if name.ends_with('/') {
            return Err(TypeError::InvalidRefName(
                "ref name cannot end with '/'".into(),
            ));
        }
        if name.ends_with(".lock") {
            return Err(TypeError::InvalidRefName(
                "ref name cannot end with '.lock'".into(),
            ));
        }

        Self::validate_body(name).map_err(TypeError::InvalidRefName)
    }

    /// Character and component rules shared with [`Namespace`].
    fn validate_body(name: &str) -> Result<(), String> {
        // Cannot contain "..", "@{", or "//"
        if name.contains("..") {
            return Err("cannot contain '..'".into());
        }
        if name.contains("@{") {
            return Err("cannot contain '@{'".into());
        }
        if name.contains("//") {
            return Err("cannot contain '//'".into());
        }

        // Cannot contain certain special characters
        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        for c in INVALID_CHARS {
            if name.contains(c) {
                return Err(format!("cannot contain '{c}'"));
            }
        }

        // Cannot contain ASCII control characters
        for c in name.chars() {
            if c.is_ascii_control() {
                return Err("cannot contain control characters".into());
            }
        }

        // Check each component (split by /)
        for component in name.split('/') {
            if component.is_empty() {
                continue;
            }
            if component.starts_with('.') {
                return Err("path component cannot start with '.'".into());
            }
            if component.ends_with(".lock") {
                return Err("path component cannot end with '.lock'".into());
            }
        }

        Ok(())
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated ref-name prefix scoping one logical queue.
///
/// A namespace is purely a naming convention over the flat ref space:
/// every ref whose name starts with the prefix belongs to the queue.
/// The prefix always starts with `refs/` and ends with `/`.
///
/// # Example
///
/// ```
/// use refq::core::types::Namespace;
///
/// let ns = Namespace::new("refs/queue/").unwrap();
/// assert_eq!(ns.glob(), "refs/queue/*");
/// assert_eq!(ns.refspec(), "+refs/queue/*:refs/queue/*");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Create a new validated namespace prefix.
    ///
    /// A trailing `/` is required so that `refs/queue/` cannot
    /// accidentally match `refs/queue-archive/x`.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidNamespace` if the prefix is malformed.
    pub fn new(prefix: impl Into<String>) -> Result<Self, TypeError> {
        let prefix = prefix.into();
        Self::validate(&prefix)?;
        Ok(Self(prefix))
    }

    fn validate(prefix: &str) -> Result<(), TypeError> {
        if prefix.is_empty() {
            return Err(TypeError::InvalidNamespace(
                "namespace cannot be empty".into(),
            ));
        }
        if !prefix.starts_with("refs/") {
            return Err(TypeError::InvalidNamespace(
                "namespace must start with 'refs/'".into(),
            ));
        }
        if !prefix.ends_with('/') {
            return Err(TypeError::InvalidNamespace(
                "namespace must end with '/'".into(),
            ));
        }
        if prefix == "refs/" {
            return Err(TypeError::InvalidNamespace(
                "namespace must name a subtree of refs/".into(),
            ));
        }

        RefName::validate_body(prefix).map_err(TypeError::InvalidNamespace)
    }

    /// Check whether a ref name falls inside this namespace.
    pub fn contains(&self, name: &RefName) -> bool {
        self.contains_str(name.as_str())
    }

    /// Prefix check against a raw ref name string.
    ///
    /// Used when filtering ref advertisements from a remote, where names
    /// arrive unvalidated.
    pub fn contains_str(&self, name: &str) -> bool {
        name.starts_with(self.0.as_str())
    }

    /// Build the ref name for an item in this namespace.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if `item` produces an invalid
    /// ref name.
    pub fn item_ref(&self, item: &str) -> Result<RefName, TypeError> {
        RefName::new(format!("{}{}", self.0, item))
    }

    /// Glob pattern matching every ref in the namespace.
    pub fn glob(&self) -> String {
        format!("{}*", self.0)
    }

    /// Symmetric refspec carrying the namespace over push or fetch.
    ///
    /// Forced, because queue refs point at blobs: repointing a ref is
    /// never a fast-forward, and the backing store's contract is
    /// last-writer-wins at a given name.
    pub fn refspec(&self) -> String {
        format!("+{0}*:{0}*", self.0)
    }

    /// Get the namespace prefix as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Namespace {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp, ordered and serialized in RFC3339 format.
///
/// Carried by every listed ref as its ordering key. Timestamps are
/// assigned by the backing store at ref creation/update time, never by
/// the caller.
///
/// # Example
///
/// ```
/// use refq::core::types::UtcTimestamp;
///
/// let earlier = UtcTimestamp::now();
/// let later = UtcTimestamp::now();
/// assert!(earlier <= later);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a filesystem time.
    pub fn from_system_time(t: std::time::SystemTime) -> Self {
        Self(chrono::DateTime::<chrono::Utc>::from(t))
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
