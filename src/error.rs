//! Error taxonomy for client provisioning and request execution.
//!
//! Construction-time failures (decode, certificate, key store, TLS assembly,
//! proxy configuration) are fatal: they propagate to whoever asked for a
//! client and no partial client is ever handed out. Request-time failures
//! never propagate; the request layer logs them and reports an absent result.

use thiserror::Error;

/// Errors produced while building a client or executing a request.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading certificate or key material from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed DER, PEM, or base64 structure in certificate/key material.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Bytes that do not parse as an X.509 certificate.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Trust or key material could not be assembled into a usable store.
    #[error("key store error: {0}")]
    KeyStore(String),

    /// TLS context or client assembly failed, including the case where no
    /// trust anchors were resolvable.
    #[error("TLS construction error: {0}")]
    TlsConstruction(String),

    /// The configured proxy URL does not parse.
    #[error("invalid proxy configuration: {0}")]
    ProxyConfig(String),

    /// Network or I/O failure while executing a request. Callers of the
    /// request capability never see this variant; it is logged and swallowed
    /// at the call site.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Structural failures from the DER reader and PEM framing.
///
/// Each condition the reader can hit is its own variant, so a truncated
/// stream is distinguishable from a mistyped field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Stream ended before a tag byte.
    #[error("truncated DER: missing tag byte")]
    TruncatedTag,

    /// Stream ended inside the length field.
    #[error("truncated DER: missing length bytes")]
    TruncatedLength,

    /// Long-form length announces more than four length bytes.
    #[error("invalid DER: length field of {0} bytes exceeds the 4-byte limit")]
    LengthOverflow(usize),

    /// Declared length runs past the end of the stream.
    #[error("truncated DER: value shorter than declared length")]
    ValueTooShort,

    /// An INTEGER was required but a different tag was found.
    #[error("invalid DER: not an integer (tag {0:#04x})")]
    NotAnInteger(u8),

    /// A SEQUENCE was required but a different tag was found.
    #[error("invalid DER: not a sequence (tag {0:#04x})")]
    NotASequence(u8),

    /// SEQUENCE tag present but encoded primitive instead of constructed.
    #[error("invalid DER: sequence is primitive, not constructed")]
    PrimitiveSequence,

    /// Data left over after the final field of an RSA key.
    #[error("invalid DER: trailing data after RSA key fields")]
    TrailingData,

    /// PEM text without a `-----BEGIN` marker.
    #[error("invalid PEM: missing begin marker")]
    MissingBeginMarker,

    /// PEM text without the matching `-----END` marker.
    #[error("invalid PEM: missing end marker")]
    MissingEndMarker,

    /// PEM body between the markers that does not decode as base64.
    #[error("invalid PEM: body is not valid base64")]
    InvalidPemBody,
}
