//! Naming rules shared by every derived resource name
//!
//! A tenant name is used both as a DNS label and as a resource-naming
//! prefix. Everything downstream derives from the two forms produced here,
//! so identical configs always yield identical names.

use once_cell::sync::Lazy;
use regex::Regex;
use std::net::Ipv4Addr;

/// Longest DNS label (RFC 1035)
pub const MAX_LABEL_LEN: usize = 63;

/// Longest fully qualified domain name (RFC 1035)
pub const MAX_DOMAIN_LEN: usize = 253;

/// Shortest accepted bucket name
pub const MIN_BUCKET_NAME_LEN: usize = 3;

/// Longest accepted bucket name
pub const MAX_BUCKET_NAME_LEN: usize = 63;

/// Suffix appended to a tenant label to form its auth domain prefix
pub const AUTH_DOMAIN_SUFFIX: &str = "-auth";

/// Longest tenant label that still leaves room for [`AUTH_DOMAIN_SUFFIX`]
pub const MAX_TENANT_LABEL_LEN: usize = MAX_LABEL_LEN - AUTH_DOMAIN_SUFFIX.len();

static DNS_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("static regex"));

static BUCKET_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("static regex"));

/// Case-normalize a name into its DNS label form
#[inline]
#[must_use]
pub fn normalize_label(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Check a (normalized) DNS label
#[must_use]
pub fn is_valid_dns_label(label: &str) -> bool {
    DNS_LABEL.is_match(label)
}

/// Check an object-storage bucket name
///
/// Lower-case letters, digits, dots and hyphens, alphanumeric at both ends,
/// no empty dot-separated part and not shaped like an IPv4 address.
#[must_use]
pub fn is_valid_bucket_name(name: &str) -> bool {
    BUCKET_NAME.is_match(name) && !name.contains("..") && name.parse::<Ipv4Addr>().is_err()
}

/// Check a (normalized) domain name: at least two valid labels
#[must_use]
pub fn is_valid_domain_name(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| is_valid_dns_label(l))
}

/// Title-case a name the way resource prefixes are formed
///
/// Every run of letters starts upper-case and continues lower-case; any
/// non-letter (digit, hyphen) starts a new run. `my-app` → `My-App`,
/// `app2go` → `App2Go`.
#[must_use]
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_cased = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if prev_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_cased = true;
        } else {
            out.push(c);
            prev_cased = false;
        }
    }
    out
}

/// Host name of a tenant inside a zone
#[inline]
#[must_use]
pub fn host_name(label: &str, zone: &str) -> String {
    format!("{label}.{zone}")
}

/// Auth domain prefix of a tenant
#[inline]
#[must_use]
pub fn auth_domain_prefix(label: &str) -> String {
    format!("{label}{AUTH_DOMAIN_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_matches_prefix_convention() {
        assert_eq!(title_case("alpha"), "Alpha");
        assert_eq!(title_case("ALPHA"), "Alpha");
        assert_eq!(title_case("my-app"), "My-App");
        assert_eq!(title_case("app2go"), "App2Go");
        assert_eq!(title_case("9lives"), "9Lives");
    }

    #[test]
    fn labels() {
        assert!(is_valid_dns_label("alpha"));
        assert!(is_valid_dns_label("a"));
        assert!(is_valid_dns_label("my-app-2"));
        assert!(!is_valid_dns_label(""));
        assert!(!is_valid_dns_label("-alpha"));
        assert!(!is_valid_dns_label("alpha-"));
        assert!(!is_valid_dns_label("Alpha"));
        assert!(!is_valid_dns_label("al_pha"));
        assert!(!is_valid_dns_label("al.pha"));
        assert!(!is_valid_dns_label(&"a".repeat(64)));
        assert!(is_valid_dns_label(&"a".repeat(63)));
    }

    #[test]
    fn bucket_names() {
        assert!(is_valid_bucket_name("alpha.apps.example.com"));
        assert!(is_valid_bucket_name("my-app-2.example.com"));
        assert!(is_valid_bucket_name("abc"));
        assert!(is_valid_bucket_name(&"a".repeat(MAX_BUCKET_NAME_LEN)));
        assert!(!is_valid_bucket_name("ab"));
        assert!(!is_valid_bucket_name(&"a".repeat(MAX_BUCKET_NAME_LEN + 1)));
        assert!(!is_valid_bucket_name("Alpha.example.com"));
        assert!(!is_valid_bucket_name("alpha..example.com"));
        assert!(!is_valid_bucket_name(".alpha.example.com"));
        assert!(!is_valid_bucket_name("alpha.example.com-"));
        assert!(!is_valid_bucket_name("al_pha.example.com"));
        assert!(!is_valid_bucket_name("192.168.0.1"));
    }

    #[test]
    fn domains() {
        assert!(is_valid_domain_name("app-ecosystem.example.com"));
        assert!(!is_valid_domain_name("localhost"));
        assert!(!is_valid_domain_name("example..com"));
        assert!(!is_valid_domain_name("example.com."));
    }

    #[test]
    fn derived_names() {
        assert_eq!(normalize_label(" Alpha "), "alpha");
        assert_eq!(host_name("alpha", "example.com"), "alpha.example.com");
        assert_eq!(auth_domain_prefix("alpha"), "alpha-auth");
        assert_eq!(MAX_TENANT_LABEL_LEN, 58);
    }
}
