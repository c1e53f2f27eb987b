//! TLS certificate diagnostics
//!
//! reqwest surfaces certificate failures as generic connect errors, so they
//! are recognized by walking the error's source chain and looking for
//! certificate-related wording.

use std::error::Error;

const CERTIFICATE_KEYWORDS: &[&str] = &[
    "certificate verify failed",
    "unable to get local issuer certificate",
    "self signed certificate",
    "self-signed certificate",
    "invalid peer certificate",
    "unknownissuer",
    "ssl: certificate",
    "ssl certificate",
    "certificate",
    "[ssl:",
];

/// Join an error and all of its sources into one message
pub fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = inner.source();
    }
    parts.join(": ")
}

/// Whether an error (or anything in its source chain) is a certificate failure
pub fn is_certificate_error(err: &(dyn Error + 'static)) -> bool {
    let chain = error_chain(err).to_lowercase();
    CERTIFICATE_KEYWORDS
        .iter()
        .any(|keyword| chain.contains(keyword))
}

/// Whether this host is known to need a manually installed CA bundle
pub fn requires_manual_ca_bundle() -> bool {
    cfg!(target_os = "macos")
}

/// Build a remediation message for a certificate failure
pub fn remediation_message(err: &(dyn Error + 'static)) -> String {
    let base = "SSL certificate verification failed. The system trust store could not \
                validate the server certificate.";

    let steps = if requires_manual_ca_bundle() {
        "\n\nTo fix this on macOS, try one of the following:\n\
         \n1. Install CA certificates via Homebrew:\n   brew install ca-certificates\
         \n\n2. Point OpenSSL at a CA bundle:\n   export SSL_CERT_FILE=$(brew --prefix)/etc/ca-certificates/cert.pem\
         \n\n3. Make sure the Keychain trusts any corporate proxy root certificate."
    } else {
        "\n\nTo fix this, try:\
         \n\n1. Install or update your distribution's CA bundle (e.g. ca-certificates)\
         \n\n2. Point OpenSSL at a CA bundle:\n   export SSL_CERT_FILE=/etc/ssl/certs/ca-certificates.crt"
    };

    format!("{base}{steps}\n\nOriginal error: {}", error_chain(err))
}
