use crate::error::{Result, ShortenerError};
use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Default bound on the length of a target URL.
pub const DEFAULT_MAX_URL_LENGTH: usize = 2048;

/// Validates and normalizes target URLs before they reach the service.
///
/// Policy: http/https only, bounded length, no denylisted domains, and no
/// literal private, loopback, or link-local IP hosts. Hostnames are not
/// resolved; a domain that merely points at a private address passes here
/// and has to be caught by network-level egress policy.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    max_length: usize,
    denylist: HashSet<String>,
}

impl UrlValidator {
    /// Creates a validator with the given URL length bound and an empty
    /// domain denylist.
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            denylist: HashSet::new(),
        }
    }

    /// Creates a validator with a domain denylist. Entries are matched
    /// case-insensitively against the host.
    pub fn with_denylist(
        max_length: usize,
        domains: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            max_length,
            denylist: domains.into_iter().map(|d| d.to_lowercase()).collect(),
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Checks the raw input and returns its normalized form.
    ///
    /// Normalization: trims whitespace, defaults a missing scheme to
    /// https, lowercases the host, and drops default ports. The output is
    /// the canonical string used for storage and idempotency probes.
    pub fn validate_and_normalize(&self, raw: &str) -> Result<String> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(ShortenerError::InvalidUrl("url cannot be empty".into()));
        }

        if trimmed.len() > self.max_length {
            return Err(ShortenerError::UrlTooLong {
                max: self.max_length,
            });
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };

        let parsed = Url::parse(&candidate)
            .map_err(|e| ShortenerError::InvalidUrl(format!("{trimmed}: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ShortenerError::InvalidUrl(format!(
                "scheme must be http or https, got '{}'",
                parsed.scheme()
            )));
        }

        match parsed.host() {
            Some(Host::Domain(domain)) => self.check_domain(domain)?,
            Some(Host::Ipv4(ip)) => Self::check_ipv4(ip)?,
            Some(Host::Ipv6(ip)) => Self::check_ipv6(ip)?,
            None => {
                return Err(ShortenerError::InvalidUrl(format!(
                    "url has no host: {trimmed}"
                )));
            }
        }

        Ok(parsed.into())
    }

    fn check_domain(&self, domain: &str) -> Result<()> {
        let domain = domain.to_lowercase();

        if domain == "localhost" {
            return Err(ShortenerError::InvalidUrl(
                "loopback targets are not allowed".into(),
            ));
        }

        if self.denylist.contains(&domain) {
            return Err(ShortenerError::InvalidUrl(format!(
                "domain is denylisted: {domain}"
            )));
        }

        Ok(())
    }

    fn check_ipv4(ip: Ipv4Addr) -> Result<()> {
        if ip.is_private()
            || ip.is_loopback()
            || ip.is_link_local()
            || ip.is_unspecified()
        {
            return Err(ShortenerError::InvalidUrl(format!(
                "private or loopback targets are not allowed: {ip}"
            )));
        }
        Ok(())
    }

    fn check_ipv6(ip: Ipv6Addr) -> Result<()> {
        let is_unique_local = (ip.segments()[0] & 0xfe00) == 0xfc00;
        let is_link_local = (ip.segments()[0] & 0xffc0) == 0xfe80;

        if ip.is_loopback() || ip.is_unspecified() || is_unique_local || is_link_local {
            return Err(ShortenerError::InvalidUrl(format!(
                "private or loopback targets are not allowed: {ip}"
            )));
        }
        Ok(())
    }
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_URL_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_normalizes_plain_urls() {
        let validator = UrlValidator::default();
        assert_eq!(
            validator
                .validate_and_normalize("https://example.com/path?q=1")
                .unwrap(),
            "https://example.com/path?q=1"
        );
    }

    #[test]
    fn defaults_missing_scheme_to_https() {
        let validator = UrlValidator::default();
        assert_eq!(
            validator.validate_and_normalize("example.com/page").unwrap(),
            "https://example.com/page"
        );
    }

    #[test]
    fn lowercases_host_and_drops_default_port() {
        let validator = UrlValidator::default();
        assert_eq!(
            validator
                .validate_and_normalize("https://EXAMPLE.COM:443/Path")
                .unwrap(),
            "https://example.com/Path"
        );
        assert_eq!(
            validator
                .validate_and_normalize("http://Example.com:80/")
                .unwrap(),
            "http://example.com/"
        );
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let validator = UrlValidator::default();
        assert_eq!(
            validator
                .validate_and_normalize("  https://example.com  ")
                .unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn rejects_empty_and_overlong_input() {
        let validator = UrlValidator::new(64);
        assert!(matches!(
            validator.validate_and_normalize("   "),
            Err(ShortenerError::InvalidUrl(_))
        ));

        let long = format!("https://example.com/{}", "a".repeat(64));
        assert!(matches!(
            validator.validate_and_normalize(&long),
            Err(ShortenerError::UrlTooLong { max: 64 })
        ));
    }

    #[test]
    fn rejects_disallowed_schemes() {
        let validator = UrlValidator::default();
        for input in [
            "ftp://example.com/file",
            "file:///etc/passwd",
            "javascript:alert(1)",
            "data:text/plain,hello",
        ] {
            assert!(
                matches!(
                    validator.validate_and_normalize(input),
                    Err(ShortenerError::InvalidUrl(_))
                ),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_denylisted_domains() {
        let validator = UrlValidator::with_denylist(
            DEFAULT_MAX_URL_LENGTH,
            vec!["malicious-site.com".to_string()],
        );
        assert!(validator
            .validate_and_normalize("https://malicious-site.com/login")
            .is_err());
        assert!(validator
            .validate_and_normalize("https://MALICIOUS-SITE.com/login")
            .is_err());
        assert!(validator
            .validate_and_normalize("https://example.com")
            .is_ok());
    }

    #[test]
    fn rejects_private_and_loopback_hosts() {
        let validator = UrlValidator::default();
        for input in [
            "http://127.0.0.1/admin",
            "http://10.0.0.8/",
            "http://172.16.4.2/",
            "http://192.168.1.1/router",
            "http://169.254.0.5/",
            "http://0.0.0.0/",
            "http://localhost:8080/debug",
            "http://[::1]/",
            "http://[fc00::1]/",
            "http://[fe80::1]/",
        ] {
            assert!(
                validator.validate_and_normalize(input).is_err(),
                "{input} should be rejected"
            );
        }

        assert!(validator.validate_and_normalize("http://93.184.216.34/").is_ok());
    }
}
