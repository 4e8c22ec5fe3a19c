//! Output formatting for the non-interactive commands

use crate::index::Record;
use crate::utils::is_binary;
use serde::Serialize;
use std::borrow::Cow;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// How `dump` renders records
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpOptions {
    /// Show hex instead of decoded text
    pub hex: bool,
    /// One JSON object per line
    pub json: bool,
    /// Stop after this many records
    pub limit: Option<usize>,
    pub color: bool,
}

/// JSON line for one record
#[derive(Debug, Serialize)]
struct RecordLine<'a> {
    key: &'a str,
    value: &'a str,
    key_hex: &'a str,
    value_hex: &'a str,
    key_binary: bool,
    value_binary: bool,
}

/// Print records to stdout
pub fn print_records<'a>(
    records: impl Iterator<Item = &'a Record>,
    options: &DumpOptions,
) -> io::Result<usize> {
    let choice = if options.color && !options.json {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    write_records(&mut stdout, records, options)
}

/// Write records in the requested format, returning how many were written
pub fn write_records<'a, W: WriteColor>(
    out: &mut W,
    records: impl Iterator<Item = &'a Record>,
    options: &DumpOptions,
) -> io::Result<usize> {
    let limit = options.limit.unwrap_or(usize::MAX);
    let mut written = 0;

    for record in records.take(limit) {
        if options.json {
            write_json_line(out, record)?;
        } else {
            write_text_line(out, record, options.hex)?;
        }
        written += 1;
    }

    out.flush()?;
    Ok(written)
}

fn write_json_line<W: Write>(out: &mut W, record: &Record) -> io::Result<()> {
    let key = record.key_display();
    let value = record.value_display();
    let line = RecordLine {
        key: &key,
        value: &value,
        key_hex: record.key_hex(),
        value_hex: record.value_hex(),
        key_binary: is_binary(record.key_bytes()),
        value_binary: is_binary(record.value_bytes()),
    };
    serde_json::to_writer(&mut *out, &line)?;
    writeln!(out)
}

fn write_text_line<W: WriteColor>(out: &mut W, record: &Record, hex: bool) -> io::Result<()> {
    let (key, value) = if hex {
        (Cow::Borrowed(record.key_hex()), Cow::Borrowed(record.value_hex()))
    } else {
        (record.key_display(), record.value_display())
    };

    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    write!(out, "{}", key)?;
    out.reset()?;
    write!(out, " = ")?;

    if !hex && is_binary(record.value_bytes()) {
        // Placeholder, not data
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        write!(out, "{}", value)?;
        out.reset()?;
    } else {
        write!(out, "{}", value)?;
    }

    writeln!(out)
}

/// Print the match count. `total` is shown when a query narrowed the result.
pub fn print_count(matched: usize, total: usize, filtered: bool) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    write_count(&mut stdout, matched, total, filtered)
}

pub fn write_count<W: WriteColor>(
    out: &mut W,
    matched: usize,
    total: usize,
    filtered: bool,
) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(out, "{}", matched)?;
    out.reset()?;
    if filtered {
        writeln!(out, " of {} entries match", total)
    } else {
        writeln!(out, " entries")
    }
}
