//! KISS byte-stuffed framing between a host and a TNC.

use log::{debug, trace};
use std::io::Read;

use crate::ax25::FRAME_MAX;

/// Frame delimiter.
pub const FEND: u8 = 0xC0;
/// Escape introducer.
pub const FESC: u8 = 0xDB;
/// Escaped `FEND`.
pub const TFEND: u8 = 0xDC;
/// Escaped `FESC`.
pub const TFESC: u8 = 0xDD;

/// KISS data-frame command byte; the only command the core surfaces.
pub const CMD_DATA: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    NoCommand,
    AwaitingCommand,
    DataFrame,
}

/// A resumable KISS decoder.
///
/// Feeding it bytes one at a time (directly, via [`KissDecoder::feed_byte`])
/// or pulling from a [`Read`] (via [`KissDecoder::decode_next`]) are
/// equivalent: all parse state lives in this struct, so a decode may be
/// split across calls at any byte boundary without losing synchronization.
#[derive(Debug, Default)]
pub struct KissDecoder {
    state: State,
    escape: bool,
    frame: Vec<u8>,
}

impl KissDecoder {
    /// A fresh decoder, synchronized to nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte into the state machine. Returns a complete AX.25 raw
    /// frame when this byte terminates one.
    pub fn feed_byte(&mut self, byte: u8) -> Option<Vec<u8>> {
        match self.state {
            State::NoCommand => {
                if byte == FEND {
                    self.state = State::AwaitingCommand;
                }
                None
            }
            State::AwaitingCommand => {
                if byte == CMD_DATA {
                    self.frame.clear();
                    self.escape = false;
                    self.state = State::DataFrame;
                } else if byte != FEND {
                    trace!("kiss: skipping non-data command {byte:#04x}");
                    self.state = State::NoCommand;
                }
                None
            }
            State::DataFrame => {
                if self.escape {
                    self.escape = false;
                    match byte {
                        TFEND => self.push(FEND),
                        TFESC => self.push(FESC),
                        other => trace!("kiss: dropping invalid escape byte {other:#04x}"),
                    }
                    None
                } else if byte == FEND {
                    self.state = State::AwaitingCommand;
                    Some(std::mem::take(&mut self.frame))
                } else if byte == FESC {
                    self.escape = true;
                    None
                } else {
                    self.push(byte);
                    None
                }
            }
        }
    }

    fn push(&mut self, byte: u8) {
        if self.frame.len() < FRAME_MAX {
            self.frame.push(byte);
        } else {
            debug!("kiss: dropping byte, frame exceeds {FRAME_MAX} bytes");
        }
    }

    /// Pull bytes from `r` until one frame is decoded, `r` returns `Ok(0)`
    /// (no data right now), or an I/O error occurs. Internal state survives
    /// across calls, so a caller may retry after an `Ok(None)` once more
    /// bytes are available.
    pub fn decode_next<R: Read>(&mut self, r: &mut R) -> std::io::Result<Option<Vec<u8>>> {
        let mut byte = [0u8; 1];
        loop {
            match r.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    if let Some(frame) = self.feed_byte(byte[0]) {
                        return Ok(Some(frame));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Escape `FEND`/`FESC` bytes within `data` for KISS framing.
fn escape(data: &[u8], out: &mut Vec<u8>) {
    for &b in data {
        match b {
            FEND => out.extend_from_slice(&[FESC, TFEND]),
            FESC => out.extend_from_slice(&[FESC, TFESC]),
            other => out.push(other),
        }
    }
}

/// Encode one data frame: `FEND cmd=0x00 <escaped bytes> FEND`.
pub fn encode_frame(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 4);
    out.push(FEND);
    out.push(CMD_DATA);
    escape(data, &mut out);
    out.push(FEND);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_round_trip() {
        let input = [0x01, 0xC0, 0xDB, 0x02];
        let encoded = encode_frame(&input);
        assert_eq!(
            encoded,
            vec![0xC0, 0x00, 0x01, 0xDB, 0xDC, 0xDB, 0xDD, 0x02, 0xC0]
        );

        let mut dec = KissDecoder::new();
        let mut out = None;
        for &b in &encoded {
            if let Some(f) = dec.feed_byte(b) {
                out = Some(f);
            }
        }
        assert_eq!(out.unwrap(), input);
    }

    #[test]
    fn encode_empty() {
        assert_eq!(encode_frame(&[]), vec![0xC0, 0x00, 0xC0]);
    }

    #[test]
    fn decode_skips_non_data_commands() {
        let mut dec = KissDecoder::new();
        let bytes = [FEND, 0x01, 0xAA, 0xBB, FEND, 0x00, 0x42, FEND];
        let mut out = None;
        for &b in &bytes {
            if let Some(f) = dec.feed_byte(b) {
                out = Some(f);
            }
        }
        assert_eq!(out.unwrap(), vec![0x42]);
    }

    #[test]
    fn decode_resumes_across_reader_calls() {
        let frame = [0xDE, 0xAD, 0xBE, 0xEF];
        let encoded = encode_frame(&frame);
        for split in 0..encoded.len() {
            let (a, b) = encoded.split_at(split);
            let mut dec = KissDecoder::new();
            let mut got = None;
            let mut r1 = a;
            if let Ok(Some(f)) = dec.decode_next(&mut r1) {
                got = Some(f);
            }
            if got.is_none() {
                let mut r2 = b;
                while let Ok(Some(f)) = dec.decode_next(&mut r2) {
                    got = Some(f);
                }
            }
            assert_eq!(got, Some(frame.to_vec()), "split at {split}");
        }
    }

    #[test]
    fn unescaped_fesc_byte_is_dropped() {
        let mut dec = KissDecoder::new();
        let bytes = [FEND, 0x00, 0x01, FESC, 0xAA, 0x02, FEND];
        let mut out = None;
        for &b in &bytes {
            if let Some(f) = dec.feed_byte(b) {
                out = Some(f);
            }
        }
        assert_eq!(out.unwrap(), vec![0x01, 0x02]);
    }
}
