//! The structural failures of a statement parse.
//!
//! Each variant aborts the whole parse and no partial result is returned. Row-level problems
//! (a malformed number, a row without a date or label) never show up here; they are absorbed by
//! the row extractor.
//!
//! The messages are shown to the end user as-is.

use crate::ingest::Role;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestError {
    /// The file has no readable content at all.
    #[error("Le fichier est vide.")]
    EmptyFile,

    /// Fewer than one header row plus one data row.
    #[error("Le fichier CSV doit contenir au moins un en-tête et une ligne de données.")]
    InsufficientRows,

    /// The `date` or `label` role could not be resolved from the header row.
    #[error(
        "La colonne '{}' est introuvable : les colonnes 'date' et 'libellé' sont obligatoires.",
        .0.display_name()
    )]
    MissingRequiredColumn(Role),

    /// None of the `debit`, `credit` or `amount` roles could be resolved.
    #[error("Impossible de trouver les colonnes de montant ('débit'/'crédit' ou 'montant').")]
    MissingAmountColumn,
}
