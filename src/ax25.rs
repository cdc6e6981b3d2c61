//! AX.25 UI-frame codec: shifted-ASCII addressing, digipeater path, PID.

use log::debug;

use crate::callsign::Callsign;

/// Maximum textual address length, also the per-slot wire size cap.
pub const ADDR_SIZE: usize = 7;

/// Destination + source + up to 2 digipeaters.
pub const MAX_ADDRS: usize = 4;

/// `3 + 7*4`: largest possible address field, plus control and PID.
pub const HEADER_MAX: usize = 3 + ADDR_SIZE * MAX_ADDRS;

/// Largest legal information field.
pub const INFO_MAX: usize = 256;

/// Smallest legal raw frame: two bare 7-byte addresses plus control and PID.
pub const FRAME_MIN: usize = ADDR_SIZE * 2 + 2;

/// Largest legal raw frame.
pub const FRAME_MAX: usize = HEADER_MAX + INFO_MAX;

/// `0xF0`: "no layer 3 protocol", the only PID the core understands.
pub const PID_NO_L3: u8 = 0xF0;

const SPACE_SHIFTED: u8 = 0x40;
const ADDR_END_MASK: u8 = 0x01;
const SSID_MASK: u8 = 0x1E;
const CONTROL_UI: u8 = 0x03;
const CONTROL_UI_MASK: u8 = 0x03;

/// Errors raised when building a raw frame from a [`Ax25Packet`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Ax25EncodeError {
    /// More than two digipeaters were supplied.
    #[error("too many digipeaters: {0} (max 2)")]
    TooManyDigipeaters(usize),

    /// The information field exceeds [`INFO_MAX`].
    #[error("information field too long: {0} bytes (max {INFO_MAX})")]
    InfoTooLong(usize),
}

/// A decoded AX.25 UI frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Packet {
    /// Destination address.
    pub dest: Callsign,
    /// Source address.
    pub src: Callsign,
    /// 0-2 digipeater addresses, in path order.
    pub digipeaters: Vec<Callsign>,
    /// Control field byte, as decoded from the wire (always `0x03` when
    /// produced by [`encode`]).
    pub control: u8,
    /// Protocol ID byte (always [`PID_NO_L3`] when produced by [`encode`]).
    pub pid: u8,
    /// Information field, `0..=256` bytes.
    pub info: Vec<u8>,
}

fn encode_addr(out: &mut [u8; ADDR_SIZE], cs: &Callsign, last: bool) {
    let base = cs.base().as_bytes();
    for (i, slot) in out.iter_mut().enumerate().take(CALL_FIELD_LEN) {
        let b = base.get(i).copied().unwrap_or(b' ');
        *slot = b << 1;
    }
    out[CALL_FIELD_LEN] = (cs.ssid() << 1) | if last { ADDR_END_MASK } else { 0 };
}

const CALL_FIELD_LEN: usize = ADDR_SIZE - 1;

fn decode_addr(bytes: &[u8; ADDR_SIZE]) -> Result<Callsign, crate::callsign::CallsignError> {
    let mut base = String::with_capacity(CALL_FIELD_LEN);
    for &b in &bytes[..CALL_FIELD_LEN] {
        let shifted = b >> 1;
        if shifted == (SPACE_SHIFTED >> 1) {
            break;
        }
        base.push(shifted as char);
    }
    let ssid = (bytes[CALL_FIELD_LEN] & SSID_MASK) >> 1;
    Callsign::new(&base, ssid)
}

/// Encode a UI frame. Fails only if the digipeater path or information
/// field is out of range; callsigns are assumed already validated.
pub fn encode(
    dest: &Callsign,
    src: &Callsign,
    digipeaters: &[Callsign],
    info: &[u8],
) -> Result<Vec<u8>, Ax25EncodeError> {
    if digipeaters.len() > 2 {
        return Err(Ax25EncodeError::TooManyDigipeaters(digipeaters.len()));
    }
    if info.len() > INFO_MAX {
        return Err(Ax25EncodeError::InfoTooLong(info.len()));
    }

    let addrs: Vec<&Callsign> = std::iter::once(dest)
        .chain(std::iter::once(src))
        .chain(digipeaters.iter())
        .collect();
    let last_index = addrs.len() - 1;

    let mut out = Vec::with_capacity(addrs.len() * ADDR_SIZE + 2 + info.len());
    for (i, cs) in addrs.iter().enumerate() {
        let mut slot = [0u8; ADDR_SIZE];
        encode_addr(&mut slot, cs, i == last_index);
        out.extend_from_slice(&slot);
    }
    out.push(CONTROL_UI);
    out.push(PID_NO_L3);
    out.extend_from_slice(info);
    Ok(out)
}

/// Decode a raw AX.25 frame. Returns `None` for anything that isn't a
/// well-formed UI frame with PID `0xF0` — malformed frames are dropped, not
/// treated as an error condition.
pub fn decode(frame: &[u8]) -> Option<Ax25Packet> {
    if frame.len() < FRAME_MIN {
        debug!("ax25: frame too short ({} bytes)", frame.len());
        return None;
    }

    let addr_len = frame
        .iter()
        .position(|b| b & ADDR_END_MASK == ADDR_END_MASK)
        .map(|idx| idx + 1)?;
    if addr_len < ADDR_SIZE * 2 || addr_len % ADDR_SIZE != 0 {
        debug!("ax25: bad address field length {addr_len}");
        return None;
    }
    if frame.len() < addr_len + 2 {
        debug!("ax25: frame shorter than address field + control/pid");
        return None;
    }

    let num_addrs = addr_len / ADDR_SIZE;
    if num_addrs > MAX_ADDRS {
        debug!("ax25: too many addresses ({num_addrs})");
        return None;
    }

    let mut addrs = Vec::with_capacity(num_addrs);
    for chunk in frame[..addr_len].chunks_exact(ADDR_SIZE) {
        let slot: [u8; ADDR_SIZE] = chunk.try_into().unwrap();
        match decode_addr(&slot) {
            Ok(cs) => addrs.push(cs),
            Err(e) => {
                debug!("ax25: bad address: {e}");
                return None;
            }
        }
    }

    let control = frame[addr_len];
    let pid = frame[addr_len + 1];
    if control & CONTROL_UI_MASK != CONTROL_UI_MASK {
        debug!("ax25: not a UI frame (control={control:#04x})");
        return None;
    }
    if pid != PID_NO_L3 {
        debug!("ax25: unsupported PID {pid:#04x}");
        return None;
    }

    let info = frame[addr_len + 2..].to_vec();
    if info.len() > INFO_MAX {
        debug!("ax25: info field too long ({} bytes)", info.len());
        return None;
    }

    let mut iter = addrs.into_iter();
    let dest = iter.next().unwrap();
    let src = iter.next().unwrap();
    let digipeaters = iter.collect();

    Some(Ax25Packet {
        dest,
        src,
        digipeaters,
        control,
        pid,
        info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_cq_example() {
        // dest "CQ" shifted: 'C'<<1=0x86, 'Q'<<1=0xA2.
        let frame = [
            0x86, 0xA2, 0x40, 0x40, 0x40, 0x40, 0x00, 0x9C, 0x60, 0x86, 0x82, 0x98, 0x98, 0x0B,
            0x03, 0xF0, 0x00,
        ];
        let pkt = decode(&frame).unwrap();
        assert_eq!(pkt.dest.to_string(), "CQ");
        assert_eq!(pkt.src.to_string(), "N0CALL-5");
        assert!(pkt.digipeaters.is_empty());
        assert_eq!(pkt.info, vec![0x00]);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let dest: Callsign = "CQ".parse().unwrap();
        let src: Callsign = "N0CALL-5".parse().unwrap();
        let frame = encode(&dest, &src, &[], &[]).unwrap();
        let pkt = decode(&frame).unwrap();
        assert_eq!(pkt.dest, dest);
        assert_eq!(pkt.src, src);
    }

    #[test]
    fn encode_with_digipeaters_roundtrip() {
        let dest: Callsign = "APRS".parse().unwrap();
        let src: Callsign = "N0CALL-1".parse().unwrap();
        let digis: Vec<Callsign> = vec!["WIDE1-1".parse().unwrap(), "WIDE2-2".parse().unwrap()];
        let info = b"hello world".to_vec();
        let frame = encode(&dest, &src, &digis, &info).unwrap();
        let pkt = decode(&frame).unwrap();
        assert_eq!(pkt.digipeaters, digis);
        assert_eq!(pkt.info, info);
    }

    #[test]
    fn too_many_digipeaters_rejected() {
        let dest: Callsign = "CQ".parse().unwrap();
        let src: Callsign = "N0CALL".parse().unwrap();
        let digis: Vec<Callsign> = vec![
            "A".parse().unwrap(),
            "B".parse().unwrap(),
            "C".parse().unwrap(),
        ];
        assert_eq!(
            encode(&dest, &src, &digis, &[]),
            Err(Ax25EncodeError::TooManyDigipeaters(3))
        );
    }

    #[test]
    fn non_ui_frame_is_dropped() {
        let dest: Callsign = "CQ".parse().unwrap();
        let src: Callsign = "N0CALL".parse().unwrap();
        let mut frame = encode(&dest, &src, &[], &[]).unwrap();
        let ctrl_idx = frame.len() - 2;
        frame[ctrl_idx] = 0x00;
        assert!(decode(&frame).is_none());
    }

    #[test]
    fn wrong_pid_is_dropped() {
        let dest: Callsign = "CQ".parse().unwrap();
        let src: Callsign = "N0CALL".parse().unwrap();
        let mut frame = encode(&dest, &src, &[], &[]).unwrap();
        let pid_idx = frame.len() - 1;
        frame[pid_idx] = 0xCF;
        assert!(decode(&frame).is_none());
    }

    #[test]
    fn too_short_is_dropped() {
        assert!(decode(&[0u8; 10]).is_none());
    }
}
