use thiserror::Error;
use x509_parser::extensions::GeneralName;
use x509_parser::pem::parse_x509_pem;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PemError {
    #[error("failed to parse PEM: {0}")]
    Pem(String),

    #[error("failed to parse certificate: {0}")]
    Certificate(String),
}

/// Domains a certificate covers: DNS subject alternative names in
/// certificate order, or the subject common name when there are none.
pub fn domain_list_from_pem(cert_pem: &str) -> Result<Vec<String>, PemError> {
    let (_, pem) =
        parse_x509_pem(cert_pem.trim().as_bytes()).map_err(|e| PemError::Pem(e.to_string()))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| PemError::Certificate(e.to_string()))?;

    let mut domains = Vec::new();
    if let Ok(Some(san)) = cert.subject_alternative_name() {
        for name in &san.value.general_names {
            if let GeneralName::DNSName(dns) = name {
                push_unique(&mut domains, dns);
            }
        }
    }
    if domains.is_empty() {
        for cn in cert.subject().iter_common_name() {
            if let Ok(value) = cn.as_str() {
                push_unique(&mut domains, value);
            }
        }
    }
    Ok(domains)
}

/// First recovered domain with any wildcard label removed; used as the
/// `issuer` tag on imported certificates.
pub fn canonical_domain(domains: &[String]) -> String {
    domains
        .first()
        .map(|d| strip_wildcard(d).to_string())
        .unwrap_or_default()
}

pub fn strip_wildcard(domain: &str) -> &str {
    domain.strip_prefix("*.").unwrap_or(domain)
}

fn push_unique(domains: &mut Vec<String>, value: &str) {
    let value = value.trim().to_ascii_lowercase();
    if !value.is_empty() && !domains.contains(&value) {
        domains.push(value);
    }
}
