//! Minimal DER reader for bare PKCS#1 RSA private keys.
//!
//! Implements only the subset of ASN.1 needed to take apart
//! `RSAPrivateKey ::= SEQUENCE { version, n, e, d, p, q, dP, dQ, qInv }`:
//! tag/length/value framing, INTEGER, and SEQUENCE. The certificate/key
//! loader falls back to this reader when a client key is not in a wrapped
//! container format.

use crate::error::DecodeError;
use rsa::BigUint;
use std::fmt;

const TAG_TYPE_INTEGER: u8 = 0x02;
const TAG_TYPE_SEQUENCE: u8 = 0x10;
const TAG_TYPE_MASK: u8 = 0x1F;
const CONSTRUCTED_BIT: u8 = 0x20;
const LONG_FORM_BIT: u8 = 0x80;
const LONG_FORM_COUNT_MASK: u8 = 0x7F;
const MAX_LENGTH_BYTES: usize = 4;

/// One tag-length-value object lifted out of a DER stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asn1Object<'a> {
    tag: u8,
    value: &'a [u8],
}

impl<'a> Asn1Object<'a> {
    /// Low five bits of the tag byte: the tag type.
    #[must_use]
    pub const fn tag_type(&self) -> u8 {
        self.tag & TAG_TYPE_MASK
    }

    /// Whether the constructed bit is set on the tag.
    #[must_use]
    pub const fn is_constructed(&self) -> bool {
        self.tag & CONSTRUCTED_BIT != 0
    }

    /// Raw content octets of this object.
    #[must_use]
    pub const fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Interpret this object as an INTEGER, big-endian.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NotAnInteger`] when the tag type is not 0x02.
    pub fn decode_integer(&self) -> Result<BigUint, DecodeError> {
        if self.tag_type() != TAG_TYPE_INTEGER {
            return Err(DecodeError::NotAnInteger(self.tag));
        }
        Ok(BigUint::from_bytes_be(self.value))
    }

    /// Require this object to be a constructed SEQUENCE.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NotASequence`] for a non-sequence tag and
    /// [`DecodeError::PrimitiveSequence`] when the constructed bit is unset.
    pub fn validate_sequence(&self) -> Result<(), DecodeError> {
        if self.tag_type() != TAG_TYPE_SEQUENCE {
            return Err(DecodeError::NotASequence(self.tag));
        }
        if !self.is_constructed() {
            return Err(DecodeError::PrimitiveSequence);
        }
        Ok(())
    }
}

/// Cursor over a DER byte stream, yielding one [`Asn1Object`] per `read`.
#[derive(Debug)]
pub struct DerReader<'a> {
    input: &'a [u8],
}

impl<'a> DerReader<'a> {
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    /// Whether every byte of the stream has been consumed.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.input.is_empty()
    }

    /// Consume the next tag-length-value object.
    ///
    /// Short-form lengths are a single byte ≤ 0x7F. Long-form lengths set the
    /// top bit, with the low seven bits giving the byte-count of a big-endian
    /// length integer, capped at four bytes.
    ///
    /// # Errors
    ///
    /// Distinct conditions for a stream truncated at the tag
    /// ([`DecodeError::TruncatedTag`]), inside the length field
    /// ([`DecodeError::TruncatedLength`]), a length field over four bytes
    /// ([`DecodeError::LengthOverflow`]), and a value shorter than its
    /// declared length ([`DecodeError::ValueTooShort`]).
    pub fn read(&mut self) -> Result<Asn1Object<'a>, DecodeError> {
        let (&tag, after_tag) = self.input.split_first().ok_or(DecodeError::TruncatedTag)?;
        let (&first, after_first) = after_tag
            .split_first()
            .ok_or(DecodeError::TruncatedLength)?;

        let (length, after_length) = if first & LONG_FORM_BIT == 0 {
            (usize::from(first), after_first)
        } else {
            let count = usize::from(first & LONG_FORM_COUNT_MASK);
            if count > MAX_LENGTH_BYTES {
                return Err(DecodeError::LengthOverflow(count));
            }
            let (length_bytes, rest) = after_first
                .split_at_checked(count)
                .ok_or(DecodeError::TruncatedLength)?;
            let length = length_bytes
                .iter()
                .fold(0_usize, |acc, &b| (acc << 8) | usize::from(b));
            (length, rest)
        };

        let (value, rest) = after_length
            .split_at_checked(length)
            .ok_or(DecodeError::ValueTooShort)?;
        self.input = rest;
        Ok(Asn1Object { tag, value })
    }
}

/// RSA private key recovered from bare PKCS#1 DER, as its CRT components.
///
/// The `Debug` form deliberately omits the component values.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPrivateCrtKey {
    pub modulus: BigUint,
    pub public_exponent: BigUint,
    pub private_exponent: BigUint,
    pub prime1: BigUint,
    pub prime2: BigUint,
    pub exponent1: BigUint,
    pub exponent2: BigUint,
    pub coefficient: BigUint,
}

impl fmt::Debug for RsaPrivateCrtKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateCrtKey")
            .field("modulus_bits", &self.modulus.bits())
            .finish_non_exhaustive()
    }
}

/// Decode a bare PKCS#1 `RSAPrivateKey` structure.
///
/// Reads the outer SEQUENCE, discards the version integer, then reads exactly
/// eight further integers in order: modulus, public exponent, private
/// exponent, prime1, prime2, exponent1, exponent2, coefficient.
///
/// # Errors
///
/// Any missing, extra, or mistyped field is fatal for the key: truncation
/// surfaces as the matching [`DecodeError`] condition, a wrong tag as
/// [`DecodeError::NotAnInteger`]/[`DecodeError::NotASequence`], and leftover
/// bytes after the coefficient as [`DecodeError::TrailingData`].
pub fn decode_rsa_private_key(der: &[u8]) -> Result<RsaPrivateCrtKey, DecodeError> {
    let mut outer = DerReader::new(der);
    let sequence = outer.read()?;
    sequence.validate_sequence()?;

    let mut fields = DerReader::new(sequence.value());
    // version integer, value unused
    fields.read()?.decode_integer()?;

    let modulus = fields.read()?.decode_integer()?;
    let public_exponent = fields.read()?.decode_integer()?;
    let private_exponent = fields.read()?.decode_integer()?;
    let prime1 = fields.read()?.decode_integer()?;
    let prime2 = fields.read()?.decode_integer()?;
    let exponent1 = fields.read()?.decode_integer()?;
    let exponent2 = fields.read()?.decode_integer()?;
    let coefficient = fields.read()?.decode_integer()?;

    if !fields.is_exhausted() {
        return Err(DecodeError::TrailingData);
    }

    Ok(RsaPrivateCrtKey {
        modulus,
        public_exponent,
        private_exponent,
        prime1,
        prime2,
        exponent1,
        exponent2,
        coefficient,
    })
}
