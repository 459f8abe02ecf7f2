use crate::pipeline::{CatalogEntry, FunctionCatalog};
use clap::ValueEnum;
use serde_json;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One function name per line
    #[default]
    Names,
    /// A readable block per function, with its source
    Records,
    /// A JSON array of catalog entries
    Json,
}

pub trait OutputWriter {
    fn write_catalog(&mut self, catalog: &FunctionCatalog) -> anyhow::Result<()>;
}

pub struct NamesWriter<W: Write> {
    writer: W,
}

impl<W: Write> NamesWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for NamesWriter<W> {
    fn write_catalog(&mut self, catalog: &FunctionCatalog) -> anyhow::Result<()> {
        for entry in catalog {
            writeln!(self.writer, "{}", entry.name)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

pub struct RecordsWriter<W: Write> {
    writer: W,
}

impl<W: Write> RecordsWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_entry(&mut self, entry: &CatalogEntry) -> anyhow::Result<()> {
        writeln!(
            self.writer,
            "{} ({}:{}, {})",
            entry.name,
            entry.path.display(),
            entry.line,
            entry.acceptance.as_str()
        )?;
        for param in &entry.parameters {
            match &param.annotation {
                Some(annotation) => writeln!(self.writer, "  {}: {}", param.name, annotation)?,
                None => writeln!(self.writer, "  {}", param.name)?,
            }
        }
        writeln!(self.writer)?;
        for line in entry.source.lines() {
            writeln!(self.writer, "    {}", line)?;
        }
        Ok(())
    }
}

impl<W: Write> OutputWriter for RecordsWriter<W> {
    fn write_catalog(&mut self, catalog: &FunctionCatalog) -> anyhow::Result<()> {
        for (i, entry) in catalog.iter().enumerate() {
            if i > 0 {
                writeln!(self.writer)?;
            }
            self.write_entry(entry)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_catalog(&mut self, catalog: &FunctionCatalog) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(catalog)?;
        self.writer.write_all(json.as_bytes())?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

pub fn create_writer<'w>(format: OutputFormat, writer: Box<dyn Write + 'w>) -> Box<dyn OutputWriter + 'w> {
    match format {
        OutputFormat::Names => Box::new(NamesWriter::new(writer)),
        OutputFormat::Records => Box::new(RecordsWriter::new(writer)),
        OutputFormat::Json => Box::new(JsonWriter::new(writer)),
    }
}
