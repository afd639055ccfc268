//! The statement ingestion engine.
//!
//! A French bank statement or accounting journal export is turned into an `IngestionResult`: the
//! file's transactions, in order, with signed amounts, plus the last balance figure found in the
//! file. No schema is fixed in advance. The header row is inspected to find which column holds
//! the date, the label, the amount (or the debit and credit) and the balance.
//!
//! Structural problems abort the parse with an `IngestError`. Row-level problems never do: a
//! malformed number counts as zero and a row without date or label is dropped.
//!
//! The engine works on a fully materialized text buffer. `read_statement` is the only
//! asynchronous step; once the text is in memory the parse runs to completion.

mod error;
mod extract;
mod numeric;
mod roles;
mod source;
mod tokenize;

pub use error::IngestError;
pub use numeric::{parse_amount, parse_amount_or_zero};
pub use roles::{ColumnRoles, Role};
pub use source::{FileKind, SourceFile, ACCEPTED_EXTENSIONS};
pub use tokenize::DelimiterMode;

use crate::model::IngestionResult;
use crate::Result;
use anyhow::Context;
use extract::{extract_row, BalanceTracker};
use std::path::Path;
use tokenize::Delimiter;
use tracing::{debug, trace};

/// Options for a parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub delimiter: DelimiterMode,
}

impl ParseOptions {
    pub fn new(delimiter: DelimiterMode) -> Self {
        Self { delimiter }
    }
}

/// Parses the text of a statement export with default options.
pub fn parse_statement(text: &str) -> std::result::Result<IngestionResult, IngestError> {
    parse_statement_with(text, &ParseOptions::default())
}

/// Parses the text of a statement export.
///
/// # Errors
/// - `EmptyFile` if `text` is empty.
/// - `InsufficientRows` if there is no data row after the header.
/// - `MissingRequiredColumn` or `MissingAmountColumn` if the header cannot be understood.
pub fn parse_statement_with(
    text: &str,
    options: &ParseOptions,
) -> std::result::Result<IngestionResult, IngestError> {
    if text.is_empty() {
        return Err(IngestError::EmptyFile);
    }

    let rows = tokenize::rows(text);
    let (header, data) = match rows.split_first() {
        Some((header, data)) if !data.is_empty() => (*header, data),
        _ => return Err(IngestError::InsufficientRows),
    };

    let delimiter = Delimiter::resolve(options.delimiter, header);
    trace!("Splitting rows with {delimiter:?}");
    let roles = ColumnRoles::resolve(&delimiter.split(header))?;
    debug!("Resolved column roles {roles:?}");

    let mut transactions = Vec::with_capacity(data.len());
    let mut balance = BalanceTracker::new(roles.balance());
    for row in data {
        let fields = delimiter.split(row);
        if let Some(transaction) = extract_row(&fields, &roles) {
            transactions.push(transaction);
        }
        balance.observe(&fields);
    }

    let skipped = data.len() - transactions.len();
    if skipped > 0 {
        debug!("Skipped {skipped} row(s) without a date or a label");
    }
    Ok(IngestionResult::new(transactions, balance.finish()))
}

/// Reads a statement file into memory as text.
///
/// Invalid UTF-8 sequences are replaced rather than rejected and a leading byte-order mark is
/// removed.
pub async fn read_statement(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Unable to read {}", path.display()))?;
    Ok(decode(&bytes))
}

/// Reads and parses a statement file.
pub async fn ingest_file(path: &Path, options: &ParseOptions) -> Result<IngestionResult> {
    let text = read_statement(path).await?;
    let result = parse_statement_with(&text, options)?;
    debug!(
        "Read {} transaction(s) from {}",
        result.len(),
        path.display()
    );
    Ok(result)
}

/// Decodes file content the way a browser text reader does.
pub(crate) fn decode(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Transaction};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn amount(s: &str) -> Amount {
        Amount::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_split_debit_credit_file() {
        let text = "date;libelle;debit;credit\n01/01/2024;VIREMENT;;500,000\n02/01/2024;FRAIS;25,500;\n";
        let result = parse_statement(text).unwrap();
        assert_eq!(
            result.transactions(),
            &[
                Transaction::new("01/01/2024", "VIREMENT", amount("500")),
                Transaction::new("02/01/2024", "FRAIS", amount("-25.5")),
            ]
        );
        assert_eq!(result.reference_balance(), Amount::ZERO);
    }

    #[test]
    fn test_amount_and_balance_file() {
        let text = "Date,Libellé,Montant,Solde\r\n03/01/2024,\"PAIEMENT CB\",-10.750,989.250\r\n";
        let result = parse_statement(text).unwrap();
        assert_eq!(
            result.transactions(),
            &[Transaction::new("03/01/2024", "PAIEMENT CB", amount("-10.75"))]
        );
        assert_eq!(result.reference_balance(), amount("989.25"));
    }

    #[test]
    fn test_unrecognized_label_column() {
        let err = parse_statement("Date,X,Y\n01/01/2024,a,b\n").unwrap_err();
        assert_eq!(err, IngestError::MissingRequiredColumn(Role::Label));
    }

    #[test]
    fn test_missing_amount_columns() {
        let err = parse_statement("Date;Libellé;Solde\n01/01/2024;a;1\n").unwrap_err();
        assert_eq!(err, IngestError::MissingAmountColumn);
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(parse_statement("").unwrap_err(), IngestError::EmptyFile);
    }

    #[test]
    fn test_blank_file_has_insufficient_rows() {
        assert_eq!(
            parse_statement("\r\n  \n").unwrap_err(),
            IngestError::InsufficientRows
        );
    }

    #[test]
    fn test_header_only() {
        assert_eq!(
            parse_statement("date;libelle;montant\n\n").unwrap_err(),
            IngestError::InsufficientRows
        );
    }

    #[test]
    fn test_row_count_checked_before_header() {
        // a lone unrecognizable header still reports the missing data rows
        assert_eq!(
            parse_statement("foo;bar").unwrap_err(),
            IngestError::InsufficientRows
        );
    }

    #[test]
    fn test_skipped_rows_are_silent() {
        let text = "date;libelle;montant\n;SANS DATE;-5\n01/01/2024;;-6\n02/01/2024;OK;-7\n";
        let result = parse_statement(text).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.transactions()[0].label(), "OK");
    }

    #[test]
    fn test_all_rows_skipped_is_an_empty_result() {
        let result = parse_statement("date;libelle;montant\n;x;1\n").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_balance_retention_across_rows() {
        let text = "date;libelle;montant;solde\n\
                    01/01/2024;A;-1;1000.000\n\
                    02/01/2024;B;-2;abc\n\
                    03/01/2024;C;-3;950.250\n";
        let result = parse_statement(text).unwrap();
        assert_eq!(result.reference_balance(), amount("950.25"));
    }

    #[test]
    fn test_balance_read_from_skipped_rows() {
        let text = "date;libelle;montant;solde\n01/01/2024;A;-1;100\n;;;90\n";
        let result = parse_statement(text).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.reference_balance(), amount("90"));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let text = "date;libelle;montant\n01/01/2024;FRAIS;-1\n01/01/2024;FRAIS;-1\n";
        let result = parse_statement(text).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.transactions()[0], result.transactions()[1]);
    }

    #[test]
    fn test_amount_column_preferred_over_split() {
        let text = "date;libelle;debit;credit;montant\n01/01/2024;A;5;0;-9\n";
        let result = parse_statement(text).unwrap();
        assert_eq!(result.transactions()[0].amount(), amount("-9"));
    }

    #[test]
    fn test_both_delimiters_split_comma_decimals() {
        let text = "date;libelle;debit;credit\n02/01/2024;FRAIS;25,500;\n";
        let options = ParseOptions::new(DelimiterMode::Both);
        let result = parse_statement_with(text, &options).unwrap();
        // "25,500" becomes debit "25" and credit "500"
        assert_eq!(result.transactions()[0].amount(), amount("475"));
    }

    #[test]
    fn test_both_delimiters_split_labels() {
        let text = "Date;Libellé;Montant\n01/01/2024;PAIEMENT, CB;-10,5\n";
        let options = ParseOptions::new(DelimiterMode::Both);
        let result = parse_statement_with(text, &options).unwrap();
        // "PAIEMENT" and " CB" become separate fields, so the amount column reads "CB"
        assert_eq!(result.transactions()[0].label(), "PAIEMENT");
        assert!(result.transactions()[0].amount().is_zero());
    }

    #[test]
    fn test_sniffed_delimiter_keeps_commas_in_labels() {
        let text = "Date;Libellé;Montant\n01/01/2024;PAIEMENT, CB;-10,5\n";
        let result = parse_statement(text).unwrap();
        assert_eq!(result.transactions()[0].label(), "PAIEMENT, CB");
        assert_eq!(result.transactions()[0].amount(), amount("-10.5"));
    }

    #[test]
    fn test_sniffed_comma_file_with_quoted_label() {
        let text = "Date,Libellé,Montant,Solde\n03/01/2024,\"PAIEMENT; CB, ACHAT\",-10.750,989.250\n";
        let options = ParseOptions::new(DelimiterMode::Sniff);
        let result = parse_statement_with(text, &options).unwrap();
        assert_eq!(result.transactions()[0].label(), "PAIEMENT; CB, ACHAT");
        assert_eq!(result.reference_balance(), amount("989.25"));
    }

    #[test]
    fn test_out_of_range_amounts_do_not_abort() {
        let text = "date;libelle;debit;credit\n\
                    01/01/2024;X;-79000000000000000000000000000;79000000000000000000000000000\n";
        let result = parse_statement(text).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.transactions()[0].amount().is_zero());

        let text = "date;libelle;montant\n\
                    01/01/2024;A;79000000000000000000000000000\n\
                    02/01/2024;B;79000000000000000000000000000\n";
        let result = parse_statement(text).unwrap();
        assert_eq!(result.total(), Amount::new(Decimal::MAX));
    }

    #[test]
    fn test_sniffed_row_with_unterminated_quote() {
        let text = "date;libelle;montant\n01/01/2024;\"abc;-12\n";
        let result = parse_statement(text).unwrap();
        assert_eq!(
            result.transactions(),
            &[Transaction::new("01/01/2024", "abc", amount("-12"))]
        );
    }

    #[test]
    fn test_decode_strips_bom_and_replaces_invalid_bytes() {
        let mut bytes = "\u{feff}date".as_bytes().to_vec();
        bytes.push(0xff);
        assert_eq!(decode(&bytes), "date\u{fffd}");
    }

    #[tokio::test]
    async fn test_ingest_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("releve.csv");
        let mut content = "\u{feff}Date;Libellé;Débit;Crédit\n".as_bytes().to_vec();
        content.extend_from_slice("05/01/2024;LOYER;1 200,000;\n".as_bytes());
        tokio::fs::write(&path, content).await.unwrap();

        let result = ingest_file(&path, &ParseOptions::default()).await.unwrap();
        assert_eq!(result.transactions()[0].amount(), amount("-1200"));
    }

    #[tokio::test]
    async fn test_ingest_file_structural_error_is_typed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vide.csv");
        tokio::fs::write(&path, "").await.unwrap();

        let err = ingest_file(&path, &ParseOptions::default()).await.unwrap_err();
        assert_eq!(err.downcast_ref::<IngestError>(), Some(&IngestError::EmptyFile));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_statement(&dir.path().join("absent.csv")).await.unwrap_err();
        assert!(err.to_string().contains("Unable to read"));
    }
}
