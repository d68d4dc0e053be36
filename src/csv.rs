use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::amount::AmountParseError;
use crate::engine::{Operation, Report};
use crate::model::{PaymentId, TransactionType};
use crate::plugin::PAYMENT_SYSTEM_NAME;

/// Errors that can occur when reading csv rows
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open csv file: {0}")]
    Open(csv::Error),

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized operation type '{op_type}'")]
    UnrecognizedType { line: usize, op_type: String },

    #[error("line {line}: invalid amount: {source}")]
    InvalidAmount {
        line: usize,
        source: AmountParseError,
    },
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    payment: PaymentId,
    amount: String,
    currency: String,
    #[serde(default)]
    system: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    authorization_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    payment: PaymentId,
    r#type: &'a str,
    outcome: &'a str,
    reference: &'a str,
    response_code: &'a str,
    reason_code: &'a str,
    detail: &'a str,
}

fn operation_type(name: &str) -> Option<TransactionType> {
    Some(match name {
        "approve" => TransactionType::Approve,
        "approve_and_deposit" => TransactionType::ApproveAndDeposit,
        "deposit" => TransactionType::Deposit,
        "credit" => TransactionType::Credit,
        "reverse_approval" => TransactionType::ReverseApproval,
        "re_approve" => TransactionType::ReApprove,
        _ => return None,
    })
}

/// Read operations from a csv file. Rows without a `system` go to the
/// Express Checkout plugin.
pub fn read_operations(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Operation, CsvError>>, CsvError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(CsvError::Open)?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            let kind = operation_type(&row.r#type).ok_or_else(|| CsvError::UnrecognizedType {
                line,
                op_type: row.r#type.clone(),
            })?;
            let amount = row
                .amount
                .parse()
                .map_err(|source| CsvError::InvalidAmount { line, source })?;

            Ok(Operation {
                kind,
                payment: row.payment,
                amount,
                currency: row.currency,
                system: row
                    .system
                    .unwrap_or_else(|| PAYMENT_SYSTEM_NAME.to_string()),
                token: row.token,
                authorization_id: row.authorization_id,
            })
        }))
}

/// Write reports to `writer` in csv format
pub fn write_reports<'a>(
    reports: impl IntoIterator<Item = &'a Report>,
    writer: impl io::Write,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);

    for report in reports {
        let row = OutputRow {
            payment: report.payment,
            r#type: report.kind.as_str(),
            outcome: report.outcome_name(),
            reference: report.reference.as_deref().unwrap_or_default(),
            response_code: report.response_code.as_deref().unwrap_or_default(),
            reason_code: report.reason_code.as_deref().unwrap_or_default(),
            detail: report.detail(),
        };
        writer.serialize(&row)?;
    }

    writer.flush()?;
    Ok(())
}
