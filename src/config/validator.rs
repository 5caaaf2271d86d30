//! Configuration validator
//!
//! This module checks a loaded configuration for semantic problems that
//! parsing alone cannot catch. Every problem is collected so that a single
//! run reports all of them.

use std::collections::HashSet;

use log::warn;

use crate::config::error::ValidationError;
use crate::config::options::{Header, Options};

/// Configuration validator trait
pub trait OptionsValidator {
    /// Validate the configuration, returning every problem found
    fn validate(&self, options: &Options) -> Result<(), ValidationError>;
}

/// The validation rules applied before the proxy starts
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValidator;

impl OptionsValidator for DefaultValidator {
    fn validate(&self, options: &Options) -> Result<(), ValidationError> {
        let mut messages = Vec::new();

        validate_cookie(options, &mut messages);
        validate_providers(options, &mut messages);
        validate_upstreams(options, &mut messages);
        validate_headers("injectRequestHeaders", &options.inject_request_headers, &mut messages);
        validate_headers("injectResponseHeaders", &options.inject_response_headers, &mut messages);
        validate_identity(options, &mut messages);

        if messages.is_empty() {
            Ok(())
        } else {
            Err(ValidationError(messages))
        }
    }
}

fn validate_cookie(options: &Options, messages: &mut Vec<String>) {
    let secret = &options.cookie.secret;
    if secret.is_empty() {
        messages.push("missing setting: cookie-secret".to_string());
    } else if ![16, 24, 32].contains(&secret.len()) {
        messages.push(format!(
            "cookie_secret must be 16, 24, or 32 bytes to create an AES cipher, but is {} bytes",
            secret.len()
        ));
    }

    if !options.cookie.secure {
        warn!("Cookies are not restricted to HTTPS connections");
    }
}

fn validate_providers(options: &Options, messages: &mut Vec<String>) {
    if options.providers.is_empty() {
        messages.push("at least one provider must be configured".to_string());
    }

    let mut ids = HashSet::new();
    for provider in &options.providers {
        if provider.client_id.is_empty() {
            messages.push(format!("provider {:?} is missing a client id", provider.id));
        }
        if provider.client_secret.is_empty() && provider.client_secret_file.is_empty() {
            messages.push(format!(
                "provider {:?} is missing a client secret or client secret file",
                provider.id
            ));
        }
        if !ids.insert(provider.id.as_str()) {
            messages.push(format!("multiple providers found with id {:?}", provider.id));
        }
    }
}

fn validate_upstreams(options: &Options, messages: &mut Vec<String>) {
    let mut ids = HashSet::new();
    let mut paths = HashSet::new();

    for upstream in &options.upstream_servers.upstreams {
        if upstream.id.is_empty() {
            messages.push("upstream has empty id".to_string());
        } else if !ids.insert(upstream.id.as_str()) {
            messages.push(format!("multiple upstreams found with id {:?}", upstream.id));
        }

        if upstream.path.is_empty() {
            messages.push(format!("upstream {:?} has empty path", upstream.id));
        } else if !paths.insert(upstream.path.as_str()) {
            messages.push(format!("multiple upstreams found with path {:?}", upstream.path));
        }

        if upstream.is_static {
            if !upstream.uri.is_empty() {
                messages.push(format!("upstream {:?} has uri, but is a static upstream", upstream.id));
            }
        } else if upstream.uri.is_empty() {
            messages.push(format!("upstream {:?} has empty uri", upstream.id));
        } else if upstream.static_code.is_some() {
            messages.push(format!("upstream {:?} has staticCode, but is not a static upstream", upstream.id));
        }
    }
}

fn validate_headers(section: &str, headers: &[Header], messages: &mut Vec<String>) {
    let mut names = HashSet::new();

    for header in headers {
        if header.name.is_empty() {
            messages.push(format!("{}: header has empty name", section));
            continue;
        }
        if !names.insert(header.name.to_ascii_lowercase()) {
            messages.push(format!("{}: multiple headers found with name {:?}", section, header.name));
        }
        if header.values.is_empty() {
            messages.push(format!("{}: header {:?} has no values", section, header.name));
        }

        for value in &header.values {
            let sources = [
                value.value.is_some(),
                value.from_env.is_some(),
                value.from_file.is_some(),
                value.claim.is_some(),
            ]
            .iter()
            .filter(|set| **set)
            .count();

            if sources != 1 {
                messages.push(format!(
                    "{}: header {:?} value must have exactly one of value, fromEnv, fromFile or claim",
                    section, header.name
                ));
            }
            if let Some(password) = &value.basic_auth_password {
                if password.source_count() != 1 {
                    messages.push(format!(
                        "{}: header {:?} basicAuthPassword must have exactly one source",
                        section, header.name
                    ));
                }
            }
        }
    }
}

fn validate_identity(options: &Options, messages: &mut Vec<String>) {
    if options.email_domains.is_empty() && options.authenticated_emails_file.is_none() {
        messages.push("missing setting for email validation: email-domain or authenticated-emails-file required".to_string());
    }
}
