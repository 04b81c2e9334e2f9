use std::io::Write;
use std::path::PathBuf;

use csv_core::WriteResult;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum Format {
    Table,
    Jsonl,
    Csv,
}

#[derive(clap::Parser)]
#[group(id = "output::Args")]
pub struct Args {
    /// Write to this file instead of the terminal.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
    #[arg(long, short = 'f', value_enum, default_value_t = Format::Table)]
    format: Format,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not open the specified output file at {1:?}")]
    OpenOutputFile(#[source] std::io::Error, PathBuf),
    #[error("could not write data to the output file at {1:?}")]
    WriteFile(#[source] std::io::Error, PathBuf),
    #[error("could not write data to the terminal")]
    WriteStdout(#[source] std::io::Error),
    #[error("could not serialize the row to JSON")]
    SerializeJson(#[source] serde_json::Error),
}

impl Args {
    pub fn to_output(self) -> Output {
        Output {
            destination: self.output,
            format: self.format,
            headers: Vec::new(),
            rows: Vec::new(),
        }
    }
}

/// Rows are buffered and only rendered on [`Output::commit`], so a command that fails
/// halfway through leaves the destination untouched.
pub struct Output {
    destination: Option<PathBuf>,
    format: Format,
    headers: Vec<&'static str>,
    rows: Vec<Row>,
}

struct Row {
    cells: Vec<String>,
    record: serde_json::Value,
}

impl Output {
    /// Column names for the `table` and `csv` formats. JSONL rows carry their own keys.
    pub fn headers(&mut self, headers: Vec<&'static str>) {
        self.headers = headers;
    }

    pub fn push<R: serde::Serialize>(
        &mut self,
        cells: Vec<String>,
        record: &R,
    ) -> Result<(), Error> {
        let record = match self.format {
            Format::Jsonl => serde_json::to_value(record).map_err(Error::SerializeJson)?,
            Format::Table | Format::Csv => serde_json::Value::Null,
        };
        self.rows.push(Row { cells, record });
        Ok(())
    }

    pub fn commit(self) -> Result<(), Error> {
        let mut sink: Box<dyn Write> = match &self.destination {
            None => Box::new(std::io::stdout().lock()),
            Some(path) => Box::new(
                std::fs::File::create(path)
                    .map_err(|e| Error::OpenOutputFile(e, path.clone()))?,
            ),
        };
        let failed = |e: std::io::Error| match &self.destination {
            None => Error::WriteStdout(e),
            Some(path) => Error::WriteFile(e, path.clone()),
        };
        match self.format {
            Format::Table => {
                let mut table = comfy_table::Table::new();
                table.set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
                table.set_header(self.headers.clone());
                for row in &self.rows {
                    table.add_row(row.cells.clone());
                }
                writeln!(sink, "{table}").map_err(failed)?;
            }
            Format::Jsonl => {
                for row in &self.rows {
                    serde_json::to_writer(&mut sink, &row.record)
                        .map_err(Error::SerializeJson)?;
                    writeln!(sink).map_err(failed)?;
                }
            }
            Format::Csv => {
                let mut writer = csv_core::Writer::new();
                if !self.headers.is_empty() {
                    write_csv_row(&mut writer, &self.headers, &mut sink).map_err(failed)?;
                }
                for row in &self.rows {
                    let cells = row.cells.iter().map(String::as_str).collect::<Vec<_>>();
                    write_csv_row(&mut writer, &cells, &mut sink).map_err(failed)?;
                }
            }
        }
        sink.flush().map_err(failed)
    }
}

fn write_csv_row(
    writer: &mut csv_core::Writer,
    fields: &[&str],
    sink: &mut dyn Write,
) -> std::io::Result<()> {
    let longest = fields.iter().map(|f| f.len()).max().unwrap_or(0);
    let mut buffer = vec![0; 2 + 2 * longest];
    for (position, field) in fields.iter().enumerate() {
        if position > 0 {
            let (result, produced) = writer.delimiter(&mut buffer);
            debug_assert!(matches!(result, WriteResult::InputEmpty));
            sink.write_all(&buffer[..produced])?;
        }
        let (result, consumed, produced) = writer.field(field.as_bytes(), &mut buffer);
        debug_assert!(matches!(result, WriteResult::InputEmpty));
        debug_assert_eq!(consumed, field.len());
        sink.write_all(&buffer[..produced])?;
    }
    let (result, produced) = writer.terminator(&mut buffer);
    debug_assert!(matches!(result, WriteResult::InputEmpty));
    sink.write_all(&buffer[..produced])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_are_quoted_when_needed() {
        let mut sink = Vec::new();
        let mut writer = csv_core::Writer::new();
        write_csv_row(&mut writer, &["TEMPERATURE_OUTSIDE", "-8.7"], &mut sink).unwrap();
        write_csv_row(&mut writer, &["note", "says \"ok\", mostly"], &mut sink).unwrap();
        let text = String::from_utf8(sink).unwrap();
        assert_eq!(text.lines().next(), Some("TEMPERATURE_OUTSIDE,-8.7"));
        assert!(text.lines().nth(1).unwrap().contains("\"says \"\"ok\"\", mostly\""));
    }
}
