use opsdeck_query::{select_mode, FetchMode, FilterField, FilterSet, FilterValue, DEFAULT_STATUS};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn field() -> impl Strategy<Value = FilterField> {
    prop::sample::select(FilterField::ALL.to_vec())
}

fn raw_value() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(""),
        Just("   "),
        Just("all"),
        Just("ALL"),
        Just("acme"),
        Just("pending"),
        Just("2024-01-01"),
    ]
}

fn constrains(field: FilterField, raw: &str) -> bool {
    !raw.trim().is_empty()
        && !(field == FilterField::Status && raw.eq_ignore_ascii_case(DEFAULT_STATUS))
}

proptest! {
    #[test]
    fn prop_infinite_iff_unconstrained(
        edits in prop::collection::vec((field(), raw_value()), 0..12)
    ) {
        let mut filters = FilterSet::new();
        let mut last: BTreeMap<FilterField, &str> = BTreeMap::new();
        for (field, raw) in &edits {
            filters.set(*field, Some(FilterValue::parse(*field, raw)));
            last.insert(*field, *raw);
        }

        let constrained = last.iter().any(|(field, raw)| constrains(*field, raw));
        let expected = if constrained { FetchMode::Paginated } else { FetchMode::Infinite };
        prop_assert_eq!(select_mode(&filters), expected);
        prop_assert_eq!(filters.is_unconstrained(), !constrained);
    }

    #[test]
    fn prop_equal_edits_give_equal_sets(
        edits in prop::collection::vec((field(), raw_value()), 0..8)
    ) {
        let forward: FilterSet = edits
            .iter()
            .map(|(field, raw)| (*field, FilterValue::parse(*field, raw)))
            .collect();
        let mut replayed = FilterSet::new();
        for (field, raw) in &edits {
            replayed.set(*field, Some(FilterValue::parse(*field, raw)));
        }
        prop_assert_eq!(forward, replayed);
    }
}
