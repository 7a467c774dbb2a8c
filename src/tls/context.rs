//! TLS context construction.
//!
//! Combines trust material, client identity, and the allowed protocol
//! versions into a rustls [`ClientConfig`] ready for the HTTP layer.

use super::{
    material::{build_client_identity, build_trust_store},
    verifier::InsecureServerVerifier,
};
use crate::{
    config::{ConnectionConfig, TlsVersion},
    error::{Error, Result},
};
use rustls::{ClientConfig, RootCertStore, SupportedProtocolVersion};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

static CRYPTO_PROVIDER_INIT: OnceLock<()> = OnceLock::new();

/// Ensure the rustls crypto provider is installed.
///
/// Safe to call multiple times as installation only happens once. When the
/// embedding application has already installed a provider of its own, that
/// one stays in place.
pub fn ensure_crypto_provider() {
    CRYPTO_PROVIDER_INIT.get_or_init(|| {
        if let Err(provider) = rustls::crypto::ring::default_provider().install_default() {
            debug!("crypto provider already installed: {provider:?}");
        }
    });
}

/// Build the rustls client configuration for a connection record.
///
/// Protocol versions come from the allowed list when one is configured,
/// otherwise the library default applies. `trust_all` replaces server
/// verification wholesale with [`InsecureServerVerifier`], which drops
/// hostname checks along with chain validation. With CA material configured,
/// the assembled trust store backs verification and must resolve at least
/// one anchor; without CA material the compiled-in Mozilla roots apply. A
/// client identity is attached only when both certificate and key resolve.
///
/// # Errors
///
/// Material loading failures, a trust store that resolves no anchors, and
/// certificate/key pairs rustls rejects.
pub async fn build_client_tls(config: &ConnectionConfig) -> Result<ClientConfig> {
    ensure_crypto_provider();

    let builder =
        ClientConfig::builder_with_protocol_versions(&protocol_versions(&config.tls_versions));

    let builder = if config.trust_all {
        warn!(
            url = %config.master_url,
            "server certificate and hostname verification are DISABLED (trust_all)"
        );
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(InsecureServerVerifier))
    } else if config.has_ca_material() {
        let store = build_trust_store(config).await?;
        if store.is_empty() {
            return Err(Error::TlsConstruction(
                "no trust anchors resolved from the configured CA material".to_string(),
            ));
        }
        debug!(anchors = store.len(), "using configured trust material");
        builder.with_root_certificates(store.into_root_store()?)
    } else {
        builder.with_root_certificates(default_root_store())
    };

    match build_client_identity(config).await? {
        Some(identity) => {
            debug!(subject = %identity.subject, "attaching client identity");
            builder
                .with_client_auth_cert(identity.cert_chain, identity.key)
                .map_err(|e| Error::TlsConstruction(format!("client certificate rejected: {e}")))
        }
        None => Ok(builder.with_no_client_auth()),
    }
}

fn default_root_store() -> RootCertStore {
    webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect()
}

fn protocol_versions(allowed: &[TlsVersion]) -> Vec<&'static SupportedProtocolVersion> {
    if allowed.is_empty() {
        return rustls::ALL_VERSIONS.to_vec();
    }
    allowed
        .iter()
        .map(|version| match version {
            TlsVersion::Tls12 => &rustls::version::TLS12,
            TlsVersion::Tls13 => &rustls::version::TLS13,
        })
        .collect()
}
