//! Record serialization.

use std::io::Write;

use crime_log_layout::Record;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::SourceError;

/// How records are written.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
    strum_macros::VariantNames,
)]
#[strum(serialize_all = "snake_case")]
pub enum OutputFormat {
    /// Fields joined with `", "`, one record per line.
    #[default]
    Plain,
    /// One JSON object per line, keyed by column name in column order.
    Json,
}

/// One record paired with its column names, serialized as an ordered map.
struct KeyedRecord<'a> {
    columns: &'a [String],
    fields: &'a [String],
}

impl Serialize for KeyedRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, field) in self.columns.iter().zip(self.fields) {
            map.serialize_entry(column, field)?;
        }
        map.end()
    }
}

/// Writes records to any [`Write`] sink in an [`OutputFormat`].
pub struct RecordWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    columns: Vec<String>,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    /// Creates a writer; `columns` names the fields for JSON output.
    pub fn new(writer: W, format: OutputFormat, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            writer,
            format,
            columns: columns.into_iter().map(Into::into).collect(),
            written: 0,
        }
    }

    /// Writes one record followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if writing or JSON serialization fails.
    pub fn write_record(&mut self, record: &Record) -> Result<(), SourceError> {
        match self.format {
            OutputFormat::Plain => writeln!(self.writer, "{}", record.join(", "))?,
            OutputFormat::Json => {
                serde_json::to_writer(
                    &mut self.writer,
                    &KeyedRecord {
                        columns: &self.columns,
                        fields: &record.fields,
                    },
                )?;
                self.writer.write_all(b"\n")?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.written
    }

    /// Flushes the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if flushing fails.
    pub fn flush(&mut self) -> Result<(), SourceError> {
        Ok(self.writer.flush()?)
    }

    /// Returns the underlying sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
