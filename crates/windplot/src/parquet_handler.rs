use parquet::basic::{LogicalType, Repetition, Type as PhysicalType};
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::record::{Field, RecordWriter, Row};
use parquet::schema::types::Type;
use parquet_derive::ParquetRecordWriter;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use windplot_core::{path_exists, replace_file};

use crate::{Dataset, Observation};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to access dataset file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read or write parquet: {0}")]
    Parquet(#[from] ParquetError),
    #[error("failed to parse time string: {0}")]
    TimeParse(#[from] time::error::Parse),
    #[error("failed to format time string: {0}")]
    TimeFormat(#[from] time::error::Format),
    #[error("bad value in column {column}: {message}")]
    Column { column: String, message: String },
    #[error("missing column {0}")]
    MissingColumn(&'static str),
}

/// Persisted form of an [`Observation`]. Times are RFC 3339 in the civil zone.
#[derive(Debug, ParquetRecordWriter)]
pub struct ObservationRow {
    pub report_time: String,
    pub fetch_time: String,
    pub raw_text: String,
    pub wind_direction: Option<String>,
    pub wind_speed: Option<i64>,
    pub wind_gust: Option<i64>,
}

impl TryFrom<&Observation> for ObservationRow {
    type Error = Error;
    fn try_from(val: &Observation) -> Result<Self, Self::Error> {
        Ok(ObservationRow {
            report_time: val.report_time.format(&Rfc3339)?,
            fetch_time: val.fetch_time.format(&Rfc3339)?,
            raw_text: val.raw_text.clone(),
            wind_direction: val.wind_direction.map(|d| d.to_string()),
            wind_speed: val.wind_speed.map(i64::from),
            wind_gust: val.wind_gust.map(i64::from),
        })
    }
}

fn string_column(name: &str, repetition: Repetition) -> Result<Arc<Type>, ParquetError> {
    let column = Type::primitive_type_builder(name, PhysicalType::BYTE_ARRAY)
        .with_repetition(repetition)
        .with_logical_type(Some(LogicalType::String))
        .build()?;
    Ok(Arc::new(column))
}

fn int_column(name: &str) -> Result<Arc<Type>, ParquetError> {
    let column = Type::primitive_type_builder(name, PhysicalType::INT64)
        .with_repetition(Repetition::OPTIONAL)
        .build()?;
    Ok(Arc::new(column))
}

pub fn create_observation_schema() -> Result<Type, ParquetError> {
    Type::group_type_builder("observation")
        .with_fields(vec![
            string_column("report_time", Repetition::REQUIRED)?,
            string_column("fetch_time", Repetition::REQUIRED)?,
            string_column("raw_text", Repetition::REQUIRED)?,
            string_column("wind_direction", Repetition::OPTIONAL)?,
            int_column("wind_speed")?,
            int_column("wind_gust")?,
        ])
        .build()
}

const COLUMNS: [&str; 6] = [
    "report_time",
    "fetch_time",
    "raw_text",
    "wind_direction",
    "wind_speed",
    "wind_gust",
];

fn parse_time(value: &str) -> Result<OffsetDateTime, Error> {
    Ok(OffsetDateTime::parse(value, &Rfc3339)?)
}

fn knots(column: &str, value: i64) -> Result<u32, Error> {
    u32::try_from(value).map_err(|_| Error::Column {
        column: column.to_string(),
        message: format!("speed out of range: {}", value),
    })
}

fn observation_from_row(row: &Row) -> Result<Observation, Error> {
    let mut report_time = None;
    let mut fetch_time = None;
    let mut raw_text = None;
    let mut wind_direction = None;
    let mut wind_speed = None;
    let mut wind_gust = None;

    for (name, field) in row.get_column_iter() {
        match (name.as_str(), field) {
            (_, Field::Null) => {}
            ("report_time", Field::Str(value)) => report_time = Some(parse_time(value)?),
            ("fetch_time", Field::Str(value)) => fetch_time = Some(parse_time(value)?),
            ("raw_text", Field::Str(value)) => raw_text = Some(value.clone()),
            ("wind_direction", Field::Str(value)) => {
                wind_direction = Some(value.parse().map_err(|message| Error::Column {
                    column: name.clone(),
                    message,
                })?)
            }
            ("wind_speed", Field::Long(value)) => wind_speed = Some(knots(name, *value)?),
            ("wind_gust", Field::Long(value)) => wind_gust = Some(knots(name, *value)?),
            (column, other) if COLUMNS.contains(&column) => {
                return Err(Error::Column {
                    column: name.clone(),
                    message: format!("unexpected value {}", other),
                });
            }
            // columns from newer writers are ignored
            _ => {}
        }
    }

    Ok(Observation {
        report_time: report_time.ok_or(Error::MissingColumn("report_time"))?,
        fetch_time: fetch_time.ok_or(Error::MissingColumn("fetch_time"))?,
        raw_text: raw_text.ok_or(Error::MissingColumn("raw_text"))?,
        wind_direction,
        wind_speed,
        wind_gust,
    })
}

/// Load a dataset written by [`save_dataset`]. A missing file is an empty
/// dataset; rows repeating a report time keep the first one.
pub fn load_dataset(path: &Path) -> Result<Dataset, Error> {
    if !path_exists(path) {
        return Ok(Dataset::new());
    }
    let reader = SerializedFileReader::new(File::open(path)?)?;
    let mut observations = Vec::new();
    for row in reader.get_row_iter(None)? {
        observations.push(observation_from_row(&row?)?);
    }
    Ok(Dataset::from_observations(observations))
}

fn write_rows(file: File, rows: &[ObservationRow]) -> Result<(), Error> {
    let props = WriterProperties::builder().build();
    let mut writer = SerializedFileWriter::new(
        file,
        Arc::new(create_observation_schema()?),
        Arc::new(props),
    )?;
    let mut row_group = writer.next_row_group()?;
    rows.write_to_row_group(&mut row_group)?;
    row_group.close()?;
    writer.close()?;
    Ok(())
}

/// Write the whole dataset to `path` in report time order, replacing any
/// previous snapshot.
pub fn save_dataset(dataset: &Dataset, path: &Path) -> Result<(), Error> {
    let rows = dataset
        .iter()
        .map(ObservationRow::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    replace_file(path, |file| write_rows(file, &rows))
}
