#![warn(missing_docs)]
/*! Wire stack for packet-radio text chat over AX.25.

This crate provides three layered, single-threaded codecs plus a small
identity store, in order from the wire up:

```text
  [ byte transport ]        8-N-1 serial or equivalent, owned by the caller
         ↓ ↑
  [ KISS codec ]            byte-stuffed framing, resumable decoder
         ↓ ↑
  [ AX.25 codec ]           UI-frame addressing, digipeater path, PID
         ↓ ↑
  [ Windbag codec ]         timestamped, optionally signed, optionally
         ↓ ↑               multi-part envelope
  [ chat application ]
```

A [`keyring::Keyring`] of [`keyring::Identity`] entries anchors signature
verification: each received signed envelope is checked against the public
key on file for its source [`callsign::Callsign`].

None of these types spawn threads, open files implicitly, or read
configuration. Byte transports, terminal I/O, and key-file formats are the
caller's concern.
*/

pub mod ax25;
pub mod buffer;
pub mod callsign;
pub mod keyring;
pub mod kiss;
pub mod windbag;

pub use ax25::{Ax25EncodeError, Ax25Packet};
pub use buffer::{ChatBuffer, SplitError};
pub use callsign::{Callsign, CallsignError};
pub use keyring::{Identity, Keyring, KeyringError};
pub use kiss::KissDecoder;
pub use windbag::{SendHeader, SignatureStatus, SigningIdentity, WindbagError, WindbagPacket};
