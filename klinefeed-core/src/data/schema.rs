use polars::prelude::*;

/// Canonical candle columns, in table order.
pub const COLUMNS: [&str; 12] = [
    "open_time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "quote_volume",
    "close_time",
    "count",
    "taker_buy_volume",
    "taker_buy_quote_volume",
    "ignore",
];

/// Columns stored as timestamps.
pub const TIME_COLUMNS: [&str; 2] = ["open_time", "close_time"];

/// Float-valued columns.
pub const FLOAT_COLUMNS: [&str; 9] = [
    "open",
    "high",
    "low",
    "close",
    "volume",
    "quote_volume",
    "taker_buy_volume",
    "taker_buy_quote_volume",
    "ignore",
];

/// Expected schema for candle tables
pub struct CandleSchema;

impl CandleSchema {
    pub fn time_dtype() -> DataType {
        DataType::Datetime(TimeUnit::Milliseconds, None)
    }

    /// Get the canonical candle schema
    pub fn schema() -> Schema {
        Self::with_time_dtype(Self::time_dtype())
    }

    /// Schema of the on-disk form, where timestamps are epoch milliseconds.
    pub fn storage_schema() -> Schema {
        Self::with_time_dtype(DataType::Int64)
    }

    fn with_time_dtype(time: DataType) -> Schema {
        Schema::from_iter(COLUMNS.iter().map(|name| {
            let dtype = if TIME_COLUMNS.contains(name) {
                time.clone()
            } else if *name == "count" {
                DataType::Int64
            } else {
                DataType::Float64
            };
            Field::new((*name).into(), dtype)
        }))
    }

    /// Zero-row table with the canonical columns.
    pub fn empty() -> DataFrame {
        DataFrame::empty_with_schema(&Self::schema())
    }

    /// Validate DataFrame against schema: same columns, same order, same types.
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        let expected = Self::schema();
        let actual = df.schema();

        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }

        let names: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
        if names != COLUMNS {
            return Err(SchemaError::ColumnOrder(names.join(",")));
        }

        Ok(())
    }

    /// Timestamps of a time column as epoch milliseconds.
    pub fn timestamps_ms(df: &DataFrame, column: &str) -> PolarsResult<Vec<Option<i64>>> {
        let ms = df.column(column)?.cast(&DataType::Int64)?;
        Ok(ms.i64()?.into_iter().collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("Columns out of canonical order: {0}")]
    ColumnOrder(String),
}
