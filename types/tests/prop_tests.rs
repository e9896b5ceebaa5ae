use proptest::prelude::*;

use awards_types::{CategoryId, Timestamp, UserId, VoteId, VoteType};

proptest! {
    /// Ids survive bincode encoding unchanged (they are stored as record fields).
    #[test]
    fn vote_id_bincode_roundtrip(raw in any::<u128>()) {
        let id = VoteId::from_u128(raw);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: VoteId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }

    /// Display output parses back into the same id.
    #[test]
    fn user_id_display_parses(raw in any::<u128>()) {
        let id = UserId::from_u128(raw);
        let parsed: UserId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// Byte order of the key follows the numeric order, so LMDB range scans
    /// over id-prefixed keys are stable.
    #[test]
    fn category_id_bytes_preserve_order(a in any::<u128>(), b in any::<u128>()) {
        let ia = CategoryId::from_u128(a);
        let ib = CategoryId::from_u128(b);
        prop_assert_eq!(ia.as_bytes() < ib.as_bytes(), a < b);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// The paid flag maps onto exactly one pool and back.
    #[test]
    fn vote_type_flag_roundtrip(paid in any::<bool>()) {
        let vt = VoteType::from_paid_flag(paid);
        prop_assert_eq!(vt == VoteType::Paid, paid);
        prop_assert_eq!(vt.is_capped_per_category(), !paid);
    }
}
