//! Deterministic string-format grammars.
//!
//! Every check returns `Err(reason)` for malformed input and never panics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The string formats a [`Rule::Format`](crate::core::rule::Rule::Format)
/// can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatKind {
    /// `local@domain.tld`
    Email,
    /// Absolute URL with a host
    Url,
    /// IPv4 or IPv6 address
    Ip,
    /// Dotted-quad IPv4 address
    Ipv4,
    /// IPv6 address
    Ipv6,
    /// Calendar date, `YYYY-MM-DD`
    Date,
    /// RFC 3339 timestamp
    DateTime,
    /// Address block, `10.0.0.0/16` or `2001:db8::/32`
    Cidr,
    /// Terraform-style version constraint, `>= 1.0, < 2.0`
    VersionConstraint,
}

impl FormatKind {
    /// Canonical name, as accepted by [`FormatKind::from_name`].
    pub fn name(&self) -> &'static str {
        match self {
            FormatKind::Email => "email",
            FormatKind::Url => "url",
            FormatKind::Ip => "ip",
            FormatKind::Ipv4 => "ipv4",
            FormatKind::Ipv6 => "ipv6",
            FormatKind::Date => "date",
            FormatKind::DateTime => "date-time",
            FormatKind::Cidr => "cidr",
            FormatKind::VersionConstraint => "version-constraint",
        }
    }

    /// Resolve a format by name. The JSON-Schema spellings `uri` and
    /// `datetime` are accepted as aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "email" => Some(FormatKind::Email),
            "url" | "uri" => Some(FormatKind::Url),
            "ip" => Some(FormatKind::Ip),
            "ipv4" => Some(FormatKind::Ipv4),
            "ipv6" => Some(FormatKind::Ipv6),
            "date" => Some(FormatKind::Date),
            "date-time" | "datetime" => Some(FormatKind::DateTime),
            "cidr" => Some(FormatKind::Cidr),
            "version-constraint" | "version_constraint" => Some(FormatKind::VersionConstraint),
            _ => None,
        }
    }

    /// Check `text` against this format's grammar.
    pub fn check(&self, text: &str) -> Result<(), String> {
        match self {
            FormatKind::Email => check_email(text),
            FormatKind::Url => check_url(text),
            FormatKind::Ip => text
                .parse::<IpAddr>()
                .map(|_| ())
                .map_err(|_| "not an IP address".to_string()),
            FormatKind::Ipv4 => text
                .parse::<Ipv4Addr>()
                .map(|_| ())
                .map_err(|_| "not an IPv4 address".to_string()),
            FormatKind::Ipv6 => text
                .parse::<Ipv6Addr>()
                .map(|_| ())
                .map_err(|_| "not an IPv6 address".to_string()),
            FormatKind::Date => check_date(text),
            FormatKind::DateTime => chrono::DateTime::parse_from_rfc3339(text)
                .map(|_| ())
                .map_err(|e| format!("not an RFC 3339 timestamp ({})", e)),
            FormatKind::Cidr => check_cidr(text),
            FormatKind::VersionConstraint => check_version_constraint(text),
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn check_email(text: &str) -> Result<(), String> {
    let (local, domain) = text
        .split_once('@')
        .ok_or_else(|| "missing '@'".to_string())?;

    if local.is_empty() {
        return Err("empty local part".to_string());
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err("misplaced '.' in local part".to_string());
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c));
    if !local_ok {
        return Err("invalid character in local part".to_string());
    }

    if domain.contains('@') {
        return Err("more than one '@'".to_string());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err("domain needs a top-level part".to_string());
    }
    for label in &labels {
        if label.is_empty() {
            return Err("empty domain label".to_string());
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(format!("domain label '{}' starts or ends with '-'", label));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(format!("invalid character in domain label '{}'", label));
        }
    }
    let tld = labels[labels.len() - 1];
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(format!("invalid top-level domain '{}'", tld));
    }
    Ok(())
}

fn check_url(text: &str) -> Result<(), String> {
    if text.chars().any(char::is_whitespace) {
        return Err("contains whitespace".to_string());
    }
    let url = url::Url::parse(text).map_err(|e| e.to_string())?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err("missing host".to_string()),
    }
}

fn check_date(text: &str) -> Result<(), String> {
    if text.len() != 10 {
        return Err("expected YYYY-MM-DD".to_string());
    }
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|e| format!("not a calendar date ({})", e))
}

fn check_cidr(text: &str) -> Result<(), String> {
    let (address, prefix) = text
        .split_once('/')
        .ok_or_else(|| "missing '/prefix'".to_string())?;
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid prefix length '{}'", prefix));
    }
    let address: IpAddr = address
        .parse()
        .map_err(|_| format!("invalid address '{}'", address))?;
    let limit = if address.is_ipv4() { 32 } else { 128 };
    let prefix: u32 = prefix
        .parse()
        .map_err(|_| format!("invalid prefix length '{}'", prefix))?;
    if prefix > limit {
        return Err(format!("prefix length {} exceeds {}", prefix, limit));
    }
    Ok(())
}

const VERSION_OPERATORS: [&str; 7] = ["~>", ">=", "<=", "!=", "=", ">", "<"];

fn check_version_constraint(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("empty version constraint".to_string());
    }
    for clause in text.split(',') {
        let clause = clause.trim();
        let version = VERSION_OPERATORS
            .iter()
            .find_map(|op| clause.strip_prefix(op))
            .unwrap_or(clause)
            .trim();
        check_version(version).map_err(|reason| format!("'{}': {}", clause, reason))?;
    }
    Ok(())
}

fn check_version(version: &str) -> Result<(), String> {
    if version.is_empty() {
        return Err("missing version".to_string());
    }
    let (core, prerelease) = match version.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (version, None),
    };
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 {
        return Err("more than three version parts".to_string());
    }
    if parts
        .iter()
        .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return Err("version parts must be numbers".to_string());
    }
    if let Some(pre) = prerelease {
        if pre.is_empty() || !pre.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Err("invalid pre-release suffix".to_string());
        }
    }
    Ok(())
}
