use polars::prelude::*;

/// Canonicalizer for candle tables
pub struct Canonicalizer;

impl Canonicalizer {
    /// Sort ascending by open time (stable for equal keys).
    pub fn sort(df: LazyFrame) -> LazyFrame {
        df.sort(
            ["open_time"],
            SortMultipleOptions::default()
                .with_order_descending(false)
                .with_maintain_order(true),
        )
    }

    /// Drop rows whose open time is null; they have no place in the series.
    pub fn drop_untimed(df: LazyFrame) -> LazyFrame {
        df.filter(col("open_time").is_not_null())
    }

    /// Drop untimed rows, sort ascending and keep the first row for each
    /// open time.
    ///
    /// History pages arrive newest-first and may overlap at their edges.
    pub fn canonicalize(df: LazyFrame) -> LazyFrame {
        Self::sort(Self::drop_untimed(df))
            .unique_stable(Some(vec!["open_time".into()]), UniqueKeepStrategy::First)
    }

    /// Eager convenience wrapper around [`Canonicalizer::canonicalize`].
    pub fn canonicalize_frame(df: DataFrame) -> PolarsResult<DataFrame> {
        Self::canonicalize(df.lazy()).collect()
    }

    /// Eager convenience wrapper around [`Canonicalizer::sort`].
    pub fn sort_frame(df: DataFrame) -> PolarsResult<DataFrame> {
        Self::sort(df.lazy()).collect()
    }
}
