//! Splits raw file text into rows and rows into fields.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// How fields are delimited within a row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum DelimiterMode {
    /// Pick one delimiter from the header row (whichever of `,` and `;` occurs more often) and
    /// split every row with it, honoring double quotes. Falls back to `Both` on a tie.
    ///
    /// A semicolon file can then carry comma decimals (`25,500`) without the comma splitting
    /// the field.
    #[default]
    Sniff,
    /// Both `,` and `;` separate fields in every row. Quotes are not honored, so a label or a
    /// comma decimal containing either character is split.
    Both,
}

serde_plain::derive_display_from_serialize!(DelimiterMode);
serde_plain::derive_fromstr_from_deserialize!(DelimiterMode);

/// Returns the non-empty rows of `text`, in order. Rows end with `\n` or `\r\n`; rows holding
/// only whitespace are dropped.
pub(super) fn rows(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|row| row.strip_suffix('\r').unwrap_or(row))
        .filter(|row| !row.trim().is_empty())
        .collect()
}

/// The delimiter actually used for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Delimiter {
    Both,
    Single(u8),
}

impl Delimiter {
    /// Decides the delimiter for a file given the `mode` and the file's header row.
    pub(super) fn resolve(mode: DelimiterMode, header: &str) -> Self {
        match mode {
            DelimiterMode::Both => Delimiter::Both,
            DelimiterMode::Sniff => {
                let commas = header.matches(',').count();
                let semicolons = header.matches(';').count();
                trace!("Header has {commas} comma(s) and {semicolons} semicolon(s)");
                match commas.cmp(&semicolons) {
                    std::cmp::Ordering::Greater => Delimiter::Single(b','),
                    std::cmp::Ordering::Less => Delimiter::Single(b';'),
                    std::cmp::Ordering::Equal => Delimiter::Both,
                }
            }
        }
    }

    /// Splits `row` into whitespace-trimmed fields.
    pub(super) fn split(&self, row: &str) -> Vec<String> {
        match self {
            Delimiter::Both => row
                .split(|c| c == ',' || c == ';')
                .map(|field| field.trim().to_string())
                .collect(),
            Delimiter::Single(delimiter) => split_quoted(row, *delimiter),
        }
    }
}

/// Splits a single row with `delimiter`, treating double-quoted sections as one field.
///
/// A row with an odd number of quotes has an unterminated quoted field, which would swallow the
/// rest of the row. Such rows are split on every delimiter instead.
fn split_quoted(row: &str, delimiter: u8) -> Vec<String> {
    if row.matches('"').count() % 2 == 1 {
        return split_literal(row, delimiter);
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(row.as_bytes());
    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(|field| field.trim().to_string()).collect(),
        _ => split_literal(row, delimiter),
    }
}

fn split_literal(row: &str, delimiter: u8) -> Vec<String> {
    row.split(char::from(delimiter))
        .map(|field| field.trim().to_string())
        .collect()
}
