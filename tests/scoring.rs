use proptest::prelude::*;
use reaction_lab::game::accuracy::{FALLBACK_SCORE, SCORE_TABLE};
use reaction_lab::game::score_for_distance;
use reaction_lab::ranking::sort_entries;
use reaction_lab::{MemoryRankingStore, RankingEntry, RankingStore};
use rstest::rstest;

// --- Distance table ---

#[rstest]
#[case(0.0, 10.0)]
#[case(2.999, 10.0)]
#[case(3.0, 9.95)]
#[case(4.0, 9.95)]
#[case(5.0, 9.9)]
#[case(9.0, 9.7)]
#[case(16.9, 9.1)]
#[case(17.0, 8.85)]
#[case(19.99, 8.85)]
#[case(20.0, 8.4)]
#[case(26.5, 7.7)]
#[case(32.0, 6.6)]
#[case(34.999, 5.85)]
#[case(35.0, 5.0)]
#[case(120.0, 5.0)]
fn distance_maps_to_table_score(#[case] distance: f64, #[case] expected: f64) {
    assert_eq!(score_for_distance(distance), expected);
}

#[test]
fn every_bound_is_exclusive() {
    let mut previous = None;
    for (bound, score) in SCORE_TABLE {
        assert_eq!(score_for_distance(bound - 1e-9), score);
        if let Some(prev_score) = previous {
            assert!(prev_score > score, "table must strictly decrease");
        }
        previous = Some(score);
    }
    assert_eq!(score_for_distance(SCORE_TABLE[SCORE_TABLE.len() - 1].0), FALLBACK_SCORE);
}

// --- Ranking store ---

prop_compose! {
    fn arb_entry()(id in "[a-z]{1,8}", avg in 50.0..2000.0f64) -> RankingEntry {
        RankingEntry::new(id, avg)
    }
}

proptest! {
    #[test]
    fn score_never_increases_with_distance(a in 0.0..100.0f64, b in 0.0..100.0f64) {
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(score_for_distance(near) >= score_for_distance(far));
    }

    #[test]
    fn load_after_save_returns_sorted_input(entries in proptest::collection::vec(arb_entry(), 0..20)) {
        let store = MemoryRankingStore::new();
        store.save(&entries).unwrap();
        let loaded = store.load();

        let mut expected = entries.clone();
        sort_entries(&mut expected);
        prop_assert_eq!(&loaded, &expected);
        prop_assert!(loaded.windows(2).all(|w| w[0].average_reaction_time_ms <= w[1].average_reaction_time_ms));
    }

    #[test]
    fn save_of_load_is_idempotent(entries in proptest::collection::vec(arb_entry(), 0..20)) {
        let store = MemoryRankingStore::new();
        store.save(&entries).unwrap();
        let once = store.load();
        store.save(&once).unwrap();
        let raw_once = store.raw();
        store.save(&store.load()).unwrap();
        prop_assert_eq!(store.raw(), raw_once);
        prop_assert_eq!(store.load(), once);
    }
}
