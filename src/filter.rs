//! Save/skip decisions for paused exchanges.

use std::net::IpAddr;

use url::Url;

use crate::config::{Config, PartyFilter};
use crate::exchange::InterceptedExchange;

/// Decides whether the response of `exchange`, triggered by the page at
/// `job_url`, should be written to disk.
///
/// Only the first include entry is ever consulted: a content type that misses
/// it is skipped even when a later include entry would match.
pub fn should_save(exchange: &InterceptedExchange, job_url: &str, config: &Config) -> bool {
    let content_type = exchange.content_type();

    if let Some(first) = config.includes.first() {
        if !content_type.contains(&first.to_lowercase()) {
            return false;
        }
    }

    if config
        .excludes
        .iter()
        .any(|e| content_type.contains(&e.to_lowercase()))
    {
        return false;
    }

    match config.party {
        PartyFilter::Any => true,
        PartyFilter::ThirdPartyOnly => {
            is_third_party(&hostname_of(job_url), &hostname_of(&exchange.url))
        }
        PartyFilter::FirstPartyOnly => {
            !is_third_party(&hostname_of(job_url), &hostname_of(&exchange.url))
        }
    }
}

/// Hostname of `url`, empty when it does not parse or has no host.
pub fn hostname_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_matches(['[', ']']).to_string()))
        .unwrap_or_default()
}

/// Two hosts are third-party to each other when their registrable domains
/// differ. A host without a registrable domain counts as same-party.
pub fn is_third_party(base: &str, sub: &str) -> bool {
    match (registrable_domain(base), registrable_domain(sub)) {
        (Some(base), Some(sub)) => base != sub,
        _ => false,
    }
}

/// The effective TLD plus one label (`www.example.co.uk` -> `example.co.uk`).
pub fn registrable_domain(host: &str) -> Option<String> {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() || host.parse::<IpAddr>().is_ok() || !is_hostname(&host) {
        return None;
    }
    psl::domain_str(&host).map(str::to_string)
}

fn is_hostname(host: &str) -> bool {
    host.split('.').all(|label| {
        !label.is_empty()
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    })
}
