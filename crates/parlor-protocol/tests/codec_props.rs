use parlor_protocol::codec::{self, Reassembler};
use parlor_protocol::PeerId;
use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;

proptest! {
    /// Chunks concatenate back to the payload, counts and indexes agree.
    #[test]
    fn fragments_cover_the_payload(
        payload in prop::collection::vec(any::<u8>(), 0..20000),
        size in 16usize..4096,
    ) {
        let frags = codec::fragment(&payload, size);

        let expected = payload.len().div_ceil(size).max(1);
        prop_assert_eq!(frags.len(), expected);
        prop_assert!(frags.iter().all(|f| f.total as usize == expected));
        prop_assert!(frags.iter().enumerate().all(|(i, f)| f.index as usize == i));
        prop_assert!(frags.iter().all(|f| f.chunk.len() <= size));

        let rebuilt: Vec<u8> = frags.iter().flat_map(|f| f.chunk.clone()).collect();
        prop_assert_eq!(rebuilt, payload);
    }

    /// Tiny chunk sizes still yield a total reassembly.
    #[test]
    fn tiny_chunk_sizes_roundtrip(
        payload in prop::collection::vec(any::<u8>(), 0..256),
        size in 1usize..16,
    ) {
        let frags = codec::fragment(&payload, size);
        let sender = PeerId::new("a");
        let mut reassembler = Reassembler::new();

        let mut result = None;
        for frag in frags {
            if let Some(done) = reassembler.accept(&sender, frag, 0) {
                result = Some(done);
            }
        }
        prop_assert_eq!(result, Some(payload));
        prop_assert_eq!(reassembler.pending_groups(), 0);
    }

    /// Delivery order does not matter; the last fragment in completes.
    #[test]
    fn shuffled_delivery_roundtrips(
        payload in prop::collection::vec(any::<u8>(), 1..20000),
        size in 16usize..1024,
        seed in any::<u64>(),
    ) {
        let mut frags = codec::fragment(&payload, size);
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        frags.shuffle(&mut rng);

        let sender = PeerId::new("a");
        let mut reassembler = Reassembler::new();

        let total = frags.len();
        let mut completions = 0;
        let mut result = None;
        for (i, frag) in frags.into_iter().enumerate() {
            if let Some(done) = reassembler.accept(&sender, frag, 0) {
                completions += 1;
                // Only the final fragment may complete the group.
                prop_assert_eq!(i, total - 1);
                result = Some(done);
            }
        }
        prop_assert_eq!(completions, 1);
        prop_assert_eq!(result, Some(payload));
    }

    /// Groups from different senders reassemble independently.
    #[test]
    fn interleaved_senders_do_not_mix(
        payload_a in prop::collection::vec(any::<u8>(), 1..2000),
        payload_b in prop::collection::vec(any::<u8>(), 1..2000),
        size in 16usize..256,
    ) {
        let frags_a = codec::fragment(&payload_a, size);
        let frags_b = codec::fragment(&payload_b, size);
        let alice = PeerId::new("alice");
        let bob = PeerId::new("bob");
        let mut reassembler = Reassembler::new();

        let mut done_a = None;
        let mut done_b = None;
        let mut a_iter = frags_a.into_iter();
        let mut b_iter = frags_b.into_iter();
        loop {
            let mut progressed = false;
            if let Some(frag) = a_iter.next() {
                progressed = true;
                if let Some(done) = reassembler.accept(&alice, frag, 0) {
                    done_a = Some(done);
                }
            }
            if let Some(frag) = b_iter.next() {
                progressed = true;
                if let Some(done) = reassembler.accept(&bob, frag, 0) {
                    done_b = Some(done);
                }
            }
            if !progressed {
                break;
            }
        }

        prop_assert_eq!(done_a, Some(payload_a));
        prop_assert_eq!(done_b, Some(payload_b));
        prop_assert_eq!(reassembler.pending_groups(), 0);
    }
}
