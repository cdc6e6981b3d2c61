//! The Windbag envelope: a timestamped, optionally signed, optionally
//! multi-part payload carried inside an AX.25 UI frame's information field.

use std::io;
use std::io::Write;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use log::debug;

use crate::ax25::{self, Ax25EncodeError};
use crate::buffer::{ChatBuffer, SplitError};
use crate::callsign::Callsign;
use crate::keyring::Keyring;

/// Required 2-byte prefix of every envelope.
pub const MAGIC: [u8; 2] = [0xA4, 0x55];

const FLAG_MULTIPART: u8 = 0x01;
const FLAG_SIGNED: u8 = 0x02;

/// Length of a detached Ed25519 signature.
pub const SIG_LEN: usize = 64;

/// Smallest legal envelope: magic + header_length + flags + timestamp.
pub const MIN_PAYLOAD_LENGTH: usize = 8;

/// Errors raised building or sending an envelope.
#[derive(Debug, thiserror::Error)]
pub enum WindbagError {
    /// `content`, once the prolog is accounted for, wouldn't fit in one
    /// AX.25 information field.
    #[error("content of {0} bytes exceeds the per-frame budget")]
    TooLong(usize),

    /// Splitting content across frames failed.
    #[error(transparent)]
    Split(#[from] SplitError),

    /// Writing a frame to the transport failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding the AX.25 frame around an envelope failed.
    #[error(transparent)]
    Ax25(#[from] Ax25EncodeError),

    /// The supplied keypair bytes were not a valid Ed25519 keypair.
    #[error("invalid Ed25519 keypair bytes")]
    BadKey,
}

/// Classification of a received signed frame's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    /// The frame was not signed.
    None,
    /// Signed, but the source callsign has no entry in the keyring.
    Unknown,
    /// Signed, and the signature verifies against the source's key.
    Good,
    /// Signed, but the signature does not verify.
    Bad,
    /// Reserved: a key bound to a different callsign than the frame's
    /// source verified. The wire format never distinguishes this from
    /// `Good`/`Bad`; nothing in this crate currently produces it.
    Alternate(Callsign),
}

/// A decoded Windbag envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindbagPacket {
    /// Opaque content bytes (one fragment, if multi-part).
    pub content: Vec<u8>,
    /// Unix seconds captured at send time, shared by every fragment of one
    /// message.
    pub timestamp: u32,
    /// 0-based index of this fragment.
    pub part_index: u8,
    /// 0-based index of the last fragment (`0` for single-part messages).
    pub final_index: u8,
    /// Signature classification.
    pub status: SignatureStatus,
}

/// The addressing a sent message travels under: AX.25 destination, source,
/// and digipeater path. Carries no file I/O of its own — a caller fills
/// this in from whatever configuration surface it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendHeader {
    /// Destination address.
    pub dest: Callsign,
    /// Source address (must match the callsign under which the keyring
    /// expects to find this station's public key, for recipients to verify
    /// signed messages).
    pub src: Callsign,
    /// 0-2 digipeater addresses.
    pub digipeaters: Vec<Callsign>,
}

/// An Ed25519 keypair used to sign outgoing messages.
pub struct SigningIdentity {
    key: SigningKey,
}

impl SigningIdentity {
    /// Build from the 64-byte seed+public-key form produced by standard
    /// Ed25519 keypair generation (libsodium convention).
    pub fn from_keypair_bytes(bytes: &[u8; 64]) -> Result<Self, WindbagError> {
        SigningKey::from_keypair_bytes(bytes)
            .map(|key| Self { key })
            .map_err(|_| WindbagError::BadKey)
    }

    /// Generate a fresh keypair.
    pub fn generate<R: rand_core::CryptoRngCore>(rng: &mut R) -> Self {
        Self {
            key: SigningKey::generate(rng),
        }
    }

    /// The 32-byte public key, as stored in a [`crate::keyring::Keyring`].
    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    fn sign(&self, message: &[u8]) -> [u8; SIG_LEN] {
        self.key.sign(message).to_bytes()
    }
}

fn reserved_len(signed: bool, multipart: bool) -> usize {
    let mut n = MIN_PAYLOAD_LENGTH;
    if signed {
        n += 1 + SIG_LEN;
    }
    if multipart {
        n += 2;
    }
    n
}

/// Largest content length that fits in one AX.25 information field, given
/// whether the envelope will be signed and/or multi-part.
pub fn max_content_len(signed: bool, multipart: bool) -> usize {
    ax25::INFO_MAX - reserved_len(signed, multipart)
}

fn signed_bytes(multipart: Option<(u8, u8)>, timestamp: u32, content: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + 4 + content.len());
    if let Some((idx, fin)) = multipart {
        buf.push(idx);
        buf.push(fin);
    }
    buf.extend_from_slice(&timestamp.to_le_bytes());
    buf.extend_from_slice(content);
    buf
}

/// Build one envelope. `content` must already fit within
/// [`max_content_len`] for the chosen signing/multipart combination.
pub fn build_envelope(
    content: &[u8],
    timestamp: u32,
    multipart: Option<(u8, u8)>,
    signing: Option<&SigningIdentity>,
) -> Result<Vec<u8>, WindbagError> {
    let signed = signing.is_some();
    let is_multipart = multipart.is_some();
    let header_length = reserved_len(signed, is_multipart);
    if header_length + content.len() > ax25::INFO_MAX {
        return Err(WindbagError::TooLong(content.len()));
    }

    let mut flags = 0u8;
    if is_multipart {
        flags |= FLAG_MULTIPART;
    }
    if signed {
        flags |= FLAG_SIGNED;
    }

    let mut out = Vec::with_capacity(header_length + content.len());
    out.extend_from_slice(&MAGIC);
    out.push(header_length as u8);
    out.push(flags);

    if let Some(identity) = signing {
        let sig = identity.sign(&signed_bytes(multipart, timestamp, content));
        out.push(sig.len() as u8);
        out.extend_from_slice(&sig);
    }
    if let Some((idx, fin)) = multipart {
        out.push(idx);
        out.push(fin);
    }
    out.extend_from_slice(&timestamp.to_le_bytes());
    out.extend_from_slice(content);
    Ok(out)
}

/// Parse one AX.25 information field as a Windbag envelope. Returns `None`
/// for anything structurally malformed (bad magic, inconsistent lengths) —
/// dropped, not an error, per the layer-local-malformation policy.
pub fn parse_envelope(info: &[u8], source: &Callsign, keyring: &Keyring) -> Option<WindbagPacket> {
    if info.len() < MIN_PAYLOAD_LENGTH || info[0..2] != MAGIC {
        debug!("windbag: bad magic or short frame ({} bytes)", info.len());
        return None;
    }

    let header_length = info[2] as usize;
    let flags = info[3];
    if header_length > info.len() {
        debug!("windbag: header_length {header_length} exceeds frame length");
        return None;
    }

    let signed = flags & FLAG_SIGNED != 0;
    let multipart = flags & FLAG_MULTIPART != 0;

    let sig_length = if signed { *info.get(4)? as usize } else { 0 };
    let expected_header_length = MIN_PAYLOAD_LENGTH
        + if signed { 1 + sig_length } else { 0 }
        + if multipart { 2 } else { 0 };
    if header_length != expected_header_length {
        debug!(
            "windbag: header_length {header_length} inconsistent with flags (expected {expected_header_length})"
        );
        return None;
    }

    let sig = if signed {
        let sig_start: usize = 5;
        let sig_end = sig_start + sig_length;
        Some(info.get(sig_start..sig_end)?)
    } else {
        None
    };

    let multipart_start = 4 + if signed { 1 + sig_length } else { 0 };
    let (part_index, final_index) = if multipart {
        (info[multipart_start], info[multipart_start + 1])
    } else {
        (0, 0)
    };
    if part_index > final_index {
        debug!("windbag: part_index {part_index} > final_index {final_index}");
        return None;
    }

    let timestamp_start = header_length - 4;
    let timestamp = u32::from_le_bytes(info[timestamp_start..timestamp_start + 4].try_into().ok()?);

    let content = info[header_length..].to_vec();

    let status = if !signed {
        SignatureStatus::None
    } else {
        match keyring.search(source) {
            None => SignatureStatus::Unknown,
            Some(identity) => {
                let multipart_idx = if multipart {
                    Some((part_index, final_index))
                } else {
                    None
                };
                let message = signed_bytes(multipart_idx, timestamp, &content);
                let verified = sig
                    .and_then(|s| Signature::from_slice(s).ok())
                    .zip(VerifyingKey::from_bytes(&identity.public_key).ok())
                    .is_some_and(|(sig, key)| key.verify(&message, &sig).is_ok());
                if verified {
                    SignatureStatus::Good
                } else {
                    SignatureStatus::Bad
                }
            }
        }
    };

    Some(WindbagPacket {
        content,
        timestamp,
        part_index,
        final_index,
        status,
    })
}

fn write_frame<W: Write>(
    w: &mut W,
    header: &SendHeader,
    payload: &[u8],
) -> Result<usize, WindbagError> {
    let ax25_frame = ax25::encode(&header.dest, &header.src, &header.digipeaters, payload)?;
    let kiss_frame = crate::kiss::encode_frame(&ax25_frame);
    w.write_all(&kiss_frame)?;
    Ok(kiss_frame.len())
}

/// Build and send a full message, splitting into multiple fragments if it
/// doesn't fit a single frame. The timestamp is captured once and reused
/// for every fragment. Send errors are sticky: the first write failure
/// aborts the remaining fragments without retracting what was already
/// written.
pub fn send_message<W: Write>(
    w: &mut W,
    header: &SendHeader,
    content: &[u8],
    timestamp: u32,
    signing: Option<&SigningIdentity>,
) -> Result<usize, WindbagError> {
    let signed = signing.is_some();
    let mut buffer = ChatBuffer::new();
    buffer.append(content);

    let single_max = max_content_len(signed, false);
    if buffer.len() <= single_max {
        let envelope = build_envelope(buffer.as_slice(), timestamp, None, signing)?;
        return write_frame(w, header, &envelope);
    }

    let multi_max = max_content_len(signed, true);
    let chunks = buffer.split(multi_max)?;
    let final_index = (chunks.len() - 1) as u8;
    let mut total = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        let envelope = build_envelope(chunk, timestamp, Some((i as u8, final_index)), signing)?;
        total += write_frame(w, header, &envelope)?;
    }
    Ok(total)
}
