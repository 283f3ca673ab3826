// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Upload Ingestion
//!
//! Turns a raw upload into a [`StoredFile`]:
//!
//! 1. Decode the bytes as UTF-8
//! 2. Reject content that is empty after trimming
//! 3. Read the header line and count data rows
//! 4. Persist through the file repository under a collision-free name
//!
//! Parsing finishes before anything is written, so a rejected upload never
//! leaves a row behind. Content is kept verbatim; no quoting rules, type
//! inference or validation beyond the header are applied.

use crate::error::AccessError;
use crate::storage::{FileConfig, FileRepository, NewStoredFile, StoredFile};

/// Header and row count of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCsv {
    pub content: String,
    pub columns: Vec<String>,
    pub total_rows: u64,
}

/// Decode and inspect raw upload bytes.
pub fn parse_csv(raw: &[u8]) -> Result<ParsedCsv, AccessError> {
    let content = std::str::from_utf8(raw)
        .map_err(|_| AccessError::MalformedInput("file is not valid UTF-8 text".to_string()))?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AccessError::MalformedInput("empty CSV file".to_string()));
    }

    let mut lines = trimmed.split('\n');
    let header = lines.next().unwrap_or_default();
    let columns = header.split(',').map(header_field).collect();
    let total_rows = lines.count() as u64;

    Ok(ParsedCsv {
        content: content.to_string(),
        columns,
        total_rows,
    })
}

/// Trim whitespace, then one layer of enclosing quotes.
///
/// A quote on only one side is part of the name.
fn header_field(raw: &str) -> String {
    let field = raw.trim();
    field
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(field)
        .to_string()
}

/// Storage name for an upload: `{uuid}_{filename}`.
pub fn storage_name(filename: &str) -> String {
    format!("{}_{}", uuid::Uuid::new_v4(), filename)
}

/// Parse an upload and store it for `owner_id`.
pub fn ingest(
    files: &FileRepository<'_>,
    owner_id: &str,
    raw: &[u8],
    filename: &str,
    config: FileConfig,
) -> Result<StoredFile, AccessError> {
    let parsed = parse_csv(raw)?;

    let stored = files.create(
        owner_id,
        NewStoredFile {
            storage_name: storage_name(filename),
            original_name: filename.to_string(),
            content: parsed.content,
            size_bytes: raw.len() as u64,
            columns: parsed.columns,
            total_rows: parsed.total_rows,
            config,
        },
    )?;

    Ok(stored)
}
