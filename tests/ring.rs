#![allow(missing_docs)]
//! Host-level tests for the receive ring: FIFO order, overflow policy,
//! and index wraparound.

use arm_pilot::ring::RxRing;

#[test]
fn pops_in_push_order() {
    let ring: RxRing<8> = RxRing::new();
    assert!(ring.is_empty());

    for byte in b"abc" {
        assert!(ring.push(*byte));
    }
    assert_eq!(ring.len(), 3);
    assert_eq!(ring.pop(), Some(b'a'));
    assert_eq!(ring.pop(), Some(b'b'));
    assert_eq!(ring.pop(), Some(b'c'));
    assert_eq!(ring.pop(), None);
}

#[test]
fn full_ring_drops_new_bytes() {
    let ring: RxRing<4> = RxRing::new();
    // Indices count total bytes, so all N slots are usable.
    for byte in 1..=4 {
        assert!(ring.push(byte));
    }
    assert!(!ring.push(5));
    assert_eq!(ring.len(), 4);

    // The stored bytes are untouched by the rejected push.
    for byte in 1..=4 {
        assert_eq!(ring.pop(), Some(byte));
    }
    assert_eq!(ring.pop(), None);
}

#[test]
fn indices_wrap_cleanly_past_capacity() {
    let ring: RxRing<4> = RxRing::new();
    // Push/pop far more bytes than the capacity so head and tail wrap
    // several times.
    for round in 0..100_u32 {
        let byte = (round % 251) as u8;
        assert!(ring.push(byte));
        assert_eq!(ring.pop(), Some(byte));
    }
    assert!(ring.is_empty());
}

#[test]
fn interleaved_push_pop_keeps_order() {
    let ring: RxRing<8> = RxRing::new();
    let mut expected = std::collections::VecDeque::new();
    for value in 0..50_u8 {
        if ring.push(value) {
            expected.push_back(value);
        }
        if value % 3 == 0 {
            assert_eq!(ring.pop(), expected.pop_front());
        }
    }
    while let Some(byte) = ring.pop() {
        assert_eq!(Some(byte), expected.pop_front());
    }
    assert!(expected.is_empty());
}
