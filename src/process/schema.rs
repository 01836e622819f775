use crate::process::{utils::parse_bool, RawTable};
use arrow::datatypes::{DataType, Field, Schema};

/// Physical type chosen for one column of a `RawTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    Boolean,
    Utf8,
}

impl ColumnType {
    pub fn arrow_type(self) -> DataType {
        match self {
            ColumnType::Int64 => DataType::Int64,
            ColumnType::Float64 => DataType::Float64,
            ColumnType::Boolean => DataType::Boolean,
            ColumnType::Utf8 => DataType::Utf8,
        }
    }
}

/// Infer a column's type from its cells, dataframe-reader style:
/// - integers with no gaps → Int64 (a gap forces Float64, as NaN would)
/// - all numeric → Float64
/// - all boolean literals → Boolean
/// - anything else → Utf8
/// - no values at all → Float64
pub fn infer_column_type<'a, I>(cells: I) -> ColumnType
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut any_missing = false;
    let mut any_present = false;
    let (mut all_int, mut all_float, mut all_bool) = (true, true, true);

    for cell in cells {
        let Some(s) = cell else {
            any_missing = true;
            continue;
        };
        any_present = true;
        if all_int && s.parse::<i64>().is_err() {
            all_int = false;
        }
        if all_float && s.parse::<f64>().is_err() {
            all_float = false;
        }
        if all_bool && parse_bool(s).is_none() {
            all_bool = false;
        }
        if !all_int && !all_float && !all_bool {
            return ColumnType::Utf8;
        }
    }

    if !any_present {
        ColumnType::Float64
    } else if all_int && !any_missing {
        ColumnType::Int64
    } else if all_int || all_float {
        ColumnType::Float64
    } else if all_bool {
        ColumnType::Boolean
    } else {
        ColumnType::Utf8
    }
}

/// Per-column types plus the matching Arrow schema (all fields nullable).
pub fn infer_schema(table: &RawTable) -> (Vec<ColumnType>, Schema) {
    let types: Vec<ColumnType> = (0..table.num_columns())
        .map(|i| infer_column_type(table.column(i)))
        .collect();
    let fields: Vec<Field> = table
        .headers
        .iter()
        .zip(&types)
        .map(|(name, ty)| Field::new(name, ty.arrow_type(), true))
        .collect();
    (types, Schema::new(fields))
}
