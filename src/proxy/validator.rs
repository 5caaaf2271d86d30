//! Email address validation
//!
//! Decides whether an authenticated email address is allowed through the
//! proxy, based on the configured email domains and the optional
//! authenticated emails file.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::debug;

use crate::common::ProxyError;

/// Identity validator handed to the proxy
#[derive(Debug, Clone, Default)]
pub struct EmailValidator {
    allow_all: bool,
    domains: Vec<String>,
    emails: HashSet<String>,
}

impl EmailValidator {
    /// Build a validator from email domains and an authenticated emails file
    ///
    /// `*` as a domain allows every address. A domain starting with `.`
    /// allows its subdomains. The file holds one address per line.
    pub fn new(domains: &[String], authenticated_emails_file: Option<&Path>) -> Result<Self, ProxyError> {
        let mut validator = Self::default();

        for domain in domains {
            let domain = domain.trim().to_ascii_lowercase();
            if domain == "*" {
                validator.allow_all = true;
            } else if !domain.is_empty() {
                validator.domains.push(domain);
            }
        }

        if let Some(path) = authenticated_emails_file {
            let content = fs::read_to_string(path).map_err(|e| {
                ProxyError::Init(format!("unable to read authenticated emails file {}: {}", path.display(), e))
            })?;
            validator.emails = content
                .lines()
                .map(|line| line.trim().to_ascii_lowercase())
                .filter(|line| !line.is_empty())
                .collect();
            debug!("Loaded {} authenticated email(s) from {}", validator.emails.len(), path.display());
        }

        Ok(validator)
    }

    /// Whether `email` may pass
    pub fn is_valid(&self, email: &str) -> bool {
        let email = email.trim().to_ascii_lowercase();
        let Some((_, domain)) = email.rsplit_once('@') else {
            return false;
        };

        if self.allow_all || self.emails.contains(&email) {
            return true;
        }

        self.domains.iter().any(|allowed| match allowed.strip_prefix('.') {
            Some(parent) => domain == parent || domain.ends_with(allowed.as_str()),
            None => domain == allowed,
        })
    }
}
