//! Cross-layer integration tests: send through KISS+AX.25+Windbag and
//! decode the result back, exercising the full stack end to end.

use windbag::ax25;
use windbag::kiss::KissDecoder;
use windbag::windbag::{parse_envelope, send_message, SendHeader, SignatureStatus, SigningIdentity};
use windbag::{Callsign, Keyring};

fn header() -> SendHeader {
    SendHeader {
        dest: "CQ".parse().unwrap(),
        src: "N0CALL-5".parse().unwrap(),
        digipeaters: vec![],
    }
}

fn decode_all(bytes: &[u8]) -> Vec<(ax25::Ax25Packet, Vec<u8>)> {
    let mut dec = KissDecoder::new();
    let mut r = bytes;
    let mut out = Vec::new();
    while let Ok(Some(frame)) = dec.decode_next(&mut r) {
        if let Some(pkt) = ax25::decode(&frame) {
            let info = pkt.info.clone();
            out.push((pkt, info));
        }
    }
    out
}

#[test]
fn unsigned_single_part_end_to_end() {
    let mut wire = Vec::new();
    send_message(&mut wire, &header(), b"hello there", 123, None).unwrap();

    let frames = decode_all(&wire);
    assert_eq!(frames.len(), 1);
    let keyring = Keyring::new();
    let pkt = parse_envelope(&frames[0].1, &frames[0].0.src, &keyring).unwrap();
    assert_eq!(pkt.content, b"hello there");
    assert_eq!(pkt.status, SignatureStatus::None);
    assert_eq!(pkt.timestamp, 123);
}

#[test]
fn signed_single_part_end_to_end() {
    let mut rng = rand::rngs::OsRng;
    let identity = SigningIdentity::generate(&mut rng);
    let src: Callsign = "N0CALL-5".parse().unwrap();
    let mut keyring = Keyring::new();
    keyring.add(src.clone(), identity.public_key());

    let mut wire = Vec::new();
    send_message(&mut wire, &header(), b"authenticated", 7, Some(&identity)).unwrap();

    let frames = decode_all(&wire);
    assert_eq!(frames.len(), 1);
    let pkt = parse_envelope(&frames[0].1, &frames[0].0.src, &keyring).unwrap();
    assert_eq!(pkt.status, SignatureStatus::Good);
    assert_eq!(pkt.content, b"authenticated");
}

#[test]
fn multipart_split_large_message() {
    // 700 ASCII bytes, unsigned: exceeds one frame's content budget, so it
    // must split across 3 fragments.
    let content = vec![b'x'; 700];
    let mut wire = Vec::new();
    send_message(&mut wire, &header(), &content, 1, None).unwrap();

    let frames = decode_all(&wire);
    assert_eq!(frames.len(), 3);
    let keyring = Keyring::new();
    let packets: Vec<_> = frames
        .iter()
        .map(|(pkt, info)| parse_envelope(info, &pkt.src, &keyring).unwrap())
        .collect();
    assert_eq!(
        packets.iter().map(|p| p.part_index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(packets.iter().all(|p| p.final_index == 2));
    let reassembled: Vec<u8> = packets.iter().flat_map(|p| p.content.clone()).collect();
    assert_eq!(reassembled, content);
}

#[test]
fn keyring_persistence_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keyring.bin");

    let mut kr = Keyring::new();
    kr.add("N0CALL-5".parse().unwrap(), [0xAB; 32]);
    kr.add("W1AW".parse().unwrap(), [0xCD; 32]);
    kr.save(&path).unwrap();

    let loaded = Keyring::load(&path).unwrap();
    assert_eq!(loaded.identities().len(), 2);

    std::fs::write(&path, vec![0u8; 40]).unwrap();
    assert!(Keyring::load(&path).is_err());
}
