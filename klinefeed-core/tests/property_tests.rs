//! Property tests for pagination and table invariants.
//!
//! Uses proptest to verify, for any series length and page size:
//! 1. Termination: the loop makes at most ceil(n / page_size) calls, plus
//!    one confirming empty page when the range starts before the series
//! 2. Ordering: open times are strictly ascending (sorted, no duplicates)
//! 3. Completeness: every candle in the range is returned exactly once
//! 4. Close time is open time plus the timeframe duration

mod common;

use chrono::{TimeZone, Utc};
use common::{StubExchange, HOUR_MS, JAN_1_2024_MS};
use klinefeed_core::data::{CandleSchema, MemoryCandleStore, PaginatedFetcher, StopReason};
use klinefeed_core::ExchangeDataProvider;
use proptest::prelude::*;
use std::sync::Arc;

fn utc_ms(ms: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

fn range_for(count: usize) -> (i64, i64) {
    (JAN_1_2024_MS, JAN_1_2024_MS + count as i64 * HOUR_MS)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pagination_terminates_within_page_bound(count in 0usize..300, page_size in 1usize..50) {
        let stub = StubExchange::series(JAN_1_2024_MS, HOUR_MS, count, page_size);
        let (start, end) = range_for(count);

        let outcome = PaginatedFetcher::new(&stub).fetch("BTC-USDT", "1H", start, end);

        let bound = count.div_ceil(page_size).max(1);
        let calls = stub.calls();
        prop_assert!(calls <= bound, "{} calls for bound {}", calls, bound);
        prop_assert_eq!(outcome.pages, stub.calls());
        prop_assert_eq!(outcome.rows.len(), count);
        if count == 0 {
            prop_assert_eq!(outcome.stop, StopReason::EmptyPage);
        } else {
            prop_assert_eq!(outcome.stop, StopReason::ReachedStart);
        }
    }

    #[test]
    fn range_starting_before_series_confirms_with_empty_page(
        count in 0usize..300,
        page_size in 1usize..50,
        lead_hours in 1i64..48,
    ) {
        let stub = StubExchange::series(JAN_1_2024_MS, HOUR_MS, count, page_size);
        let (first, end) = range_for(count);
        let start = first - lead_hours * HOUR_MS;

        let outcome = PaginatedFetcher::new(&stub).fetch("BTC-USDT", "1H", start, end);

        prop_assert!(stub.calls() <= count.div_ceil(page_size) + 1);
        prop_assert_eq!(outcome.pages, count / page_size + 1);
        prop_assert_eq!(outcome.rows.len(), count);
        let expected = if count % page_size == 0 {
            StopReason::EmptyPage
        } else {
            StopReason::ShortPage
        };
        prop_assert_eq!(outcome.stop, expected);
    }

    #[test]
    fn historical_table_is_strictly_ascending_and_complete(
        count in 0usize..300,
        page_size in 1usize..50,
    ) {
        let stub = Arc::new(StubExchange::series(JAN_1_2024_MS, HOUR_MS, count, page_size));
        let provider =
            ExchangeDataProvider::new(stub.clone(), Arc::new(MemoryCandleStore::new()));
        let (start, end) = range_for(count);

        let df = provider.get_historical_klines(
            "BTC/USDT",
            "1h",
            Some(utc_ms(start)),
            Some(utc_ms(end)),
            false,
        );

        prop_assert!(CandleSchema::validate(&df).is_ok());
        prop_assert_eq!(df.height(), count);

        let open = CandleSchema::timestamps_ms(&df, "open_time").unwrap();
        let close = CandleSchema::timestamps_ms(&df, "close_time").unwrap();
        for pair in open.windows(2) {
            prop_assert!(pair[0].unwrap() < pair[1].unwrap());
        }
        for (o, c) in open.iter().zip(&close) {
            prop_assert_eq!(c.unwrap() - o.unwrap(), HOUR_MS);
        }
    }

    #[test]
    fn latest_never_exceeds_limit(count in 0usize..200, limit in 1usize..150) {
        let stub = Arc::new(StubExchange::series(JAN_1_2024_MS, HOUR_MS, count, 100));
        let provider =
            ExchangeDataProvider::new(stub.clone(), Arc::new(MemoryCandleStore::new()));

        let df = provider.get_latest_data("BTC/USDT", "1h", limit);

        prop_assert_eq!(df.height(), count.min(limit));
        let open = CandleSchema::timestamps_ms(&df, "open_time").unwrap();
        if let Some(Some(newest)) = open.last() {
            prop_assert_eq!(*newest, JAN_1_2024_MS + (count as i64 - 1) * HOUR_MS);
        }
    }
}
