//! Google Sheets v4 REST backend.
//!
//! Reads use `UNFORMATTED_VALUE` so amounts come back as numbers, writes use `RAW` so the
//! service never reinterprets ids or dates. A batch is sent as a single `values:batchUpdate`
//! call, which the service applies all-or-nothing.

use super::token::TokenProvider;
use super::{Sheet, SheetBatch, SheetOp, check_row_index};
use crate::errors::{Error, Result};
use crate::records::cells;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google reports an unknown tab as an unparsable range.
const MISSING_RANGE_MARKER: &str = "Unable to parse range";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeWrite {
    range: String,
    major_dimension: &'static str,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: Option<GridProperties>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: Option<usize>,
}

impl SheetProperties {
    fn row_count(&self) -> usize {
        self.grid_properties
            .as_ref()
            .and_then(|grid| grid.row_count)
            .unwrap_or(0)
    }
}

/// Client for one spreadsheet.
#[derive(Debug)]
pub struct GoogleSheet {
    client: reqwest::Client,
    base_url: String,
    tokens: TokenProvider,
}

impl GoogleSheet {
    /// Client for `spreadsheet_id` on the public endpoint.
    pub fn new(spreadsheet_id: &str, tokens: TokenProvider) -> Result<Self> {
        Self::with_endpoint(DEFAULT_BASE_URL, spreadsheet_id, tokens)
    }

    /// Client against a custom endpoint, e.g. a local emulator.
    pub fn with_endpoint(endpoint: &str, spreadsheet_id: &str, tokens: TokenProvider) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::remote(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: format!("{}/{spreadsheet_id}", endpoint.trim_end_matches('/')),
            tokens,
        })
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/values/{}{suffix}",
            self.base_url,
            urlencoding::encode(range)
        )
    }

    /// Sends a request, retrying once with a re-read token on 401/403.
    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        for attempt in 0..2 {
            let token = if attempt == 0 {
                self.tokens.access_token().await?
            } else {
                self.tokens.refresh().await?
            };

            let mut request = self.client.request(method.clone(), url).bearer_auth(token);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request
                .send()
                .await
                .map_err(|e| Error::remote(format!("{method} {url}: {e}")))?;

            let status = response.status();
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) && attempt == 0 {
                warn!("Sheets API answered {status}, refreshing access token");
                continue;
            }
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                return Err(Error::remote(format!(
                    "{status}: access token rejected after refresh"
                )));
            }

            let text = response
                .text()
                .await
                .map_err(|e| Error::remote(format!("{method} {url}: reading body: {e}")))?;
            if !status.is_success() {
                tracing::error!("Sheets API request failed with {status}: {text}");
                return Err(Error::remote(format!("{status}: {text}")));
            }
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text).map_err(Into::into);
        }
        Err(Error::TokenExpired)
    }

    async fn sheet_properties(&self) -> Result<Vec<SheetProperties>> {
        let url = format!("{}?fields=sheets.properties", self.base_url);
        let meta: SpreadsheetMeta = serde_json::from_value(self.send(Method::GET, &url, None).await?)?;
        Ok(meta.sheets.into_iter().map(|sheet| sheet.properties).collect())
    }

    async fn properties_of(&self, sheet: &str) -> Result<SheetProperties> {
        self.sheet_properties()
            .await?
            .into_iter()
            .find(|props| props.title == sheet)
            .ok_or_else(|| Error::SheetNotFound {
                name: sheet.to_string(),
            })
    }

    async fn structural_update(&self, requests: Vec<Value>) -> Result<()> {
        let url = format!("{}:batchUpdate", self.base_url);
        self.send(Method::POST, &url, Some(&json!({ "requests": requests })))
            .await?;
        Ok(())
    }

    async fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range, "?valueRenderOption=UNFORMATTED_VALUE");
        let value = self
            .send(Method::GET, &url, None)
            .await
            .map_err(|e| missing_sheet(e, sheet))?;
        let range: ValueRange = serde_json::from_value(value)?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    /// Rows in use, counted on the id column.
    async fn used_rows(&self, sheet: &str) -> Result<usize> {
        let range = format!("{}!A:A", quote_sheet(sheet));
        Ok(self.read_range(sheet, &range).await?.len())
    }
}

fn missing_sheet(error: Error, sheet: &str) -> Error {
    match error {
        Error::RemoteWrite { message } if message.contains(MISSING_RANGE_MARKER) => {
            Error::SheetNotFound {
                name: sheet.to_string(),
            }
        }
        other => other,
    }
}

/// Quotes a tab title for A1 notation.
fn quote_sheet(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// Column letters for a 1-based column number: 1 is A, 27 is AA.
fn column_letter(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 range covering `count` rows of `width` columns starting at `start_row`.
fn block_range(sheet: &str, start_row: usize, count: usize, width: usize) -> String {
    format!(
        "{}!A{start_row}:{}{}",
        quote_sheet(sheet),
        column_letter(width.max(1)),
        start_row + count.saturating_sub(1)
    )
}

fn row_range(sheet: &str, row: usize, width: usize) -> String {
    block_range(sheet, row, 1, width)
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => String::from(if *b { "TRUE" } else { "FALSE" }),
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), cells::format_amount),
        other => other.to_string(),
    }
}

fn widest(rows: &[Vec<String>]) -> usize {
    rows.iter().map(Vec::len).max().unwrap_or(1)
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    #[instrument(skip(self))]
    async fn get_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let mut rows = self.read_range(sheet, &quote_sheet(sheet)).await?;
        if !rows.is_empty() {
            rows.remove(0);
        }
        debug!("Read {} rows from {sheet}", rows.len());
        Ok(rows)
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let range = format!("{}!A1", quote_sheet(sheet));
        let url = self.values_url(
            &range,
            ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
        );
        self.send(Method::POST, &url, Some(&json!({ "values": rows })))
            .await
            .map_err(|e| missing_sheet(e, sheet))?;
        Ok(())
    }

    async fn update_row(&self, sheet: &str, row_index: usize, row: &[String]) -> Result<()> {
        check_row_index(row_index)?;
        let range = row_range(sheet, row_index, row.len());
        let url = self.values_url(&range, "?valueInputOption=RAW");
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": [row] });
        self.send(Method::PUT, &url, Some(&body))
            .await
            .map_err(|e| missing_sheet(e, sheet))?;
        Ok(())
    }

    async fn delete_row(&self, sheet: &str, row_index: usize) -> Result<()> {
        check_row_index(row_index)?;
        let props = self.properties_of(sheet).await?;
        self.structural_update(vec![json!({
            "deleteDimension": {
                "range": {
                    "sheetId": props.sheet_id,
                    "dimension": "ROWS",
                    "startIndex": row_index - 1,
                    "endIndex": row_index,
                }
            }
        })])
        .await
    }

    async fn ensure_sheet(&self, sheet: &str, headers: &[&str]) -> Result<()> {
        let exists = self
            .sheet_properties()
            .await?
            .iter()
            .any(|props| props.title == sheet);
        if !exists {
            info!("Creating sheet {sheet}");
            self.structural_update(vec![json!({
                "addSheet": { "properties": { "title": sheet } }
            })])
            .await?;
        }

        let header_range = format!("{}!1:1", quote_sheet(sheet));
        let has_header = self
            .read_range(sheet, &header_range)
            .await?
            .first()
            .is_some_and(|row| row.iter().any(|cell| !cell.is_empty()));
        if !has_header {
            let header: Vec<String> = headers.iter().map(ToString::to_string).collect();
            self.update_row(sheet, 1, &header).await?;
        }
        Ok(())
    }

    async fn commit(&self, batch: &SheetBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut next_row: HashMap<&str, usize> = HashMap::new();
        let mut data = Vec::new();
        for op in batch.ops() {
            match op {
                SheetOp::Update { sheet, row, cells } => {
                    check_row_index(*row)?;
                    data.push(ValueRangeWrite {
                        range: row_range(sheet, *row, cells.len()),
                        major_dimension: "ROWS",
                        values: vec![cells.clone()],
                    });
                }
                SheetOp::Append { sheet, rows } => {
                    let start = match next_row.get(sheet.as_str()) {
                        Some(row) => *row,
                        None => self.used_rows(sheet).await? + 1,
                    };
                    next_row.insert(sheet.as_str(), start + rows.len());
                    data.push(ValueRangeWrite {
                        range: block_range(sheet, start, rows.len(), widest(rows)),
                        major_dimension: "ROWS",
                        values: rows.clone(),
                    });
                }
            }
        }

        // Appended blocks may run past the grid; grow it before writing.
        if !next_row.is_empty() {
            let mut grow = Vec::new();
            for props in self.sheet_properties().await? {
                if let Some(next) = next_row.get(props.title.as_str()) {
                    let needed = next - 1;
                    if needed > props.row_count() {
                        grow.push(json!({
                            "appendDimension": {
                                "sheetId": props.sheet_id,
                                "dimension": "ROWS",
                                "length": needed - props.row_count(),
                            }
                        }));
                    }
                }
            }
            if !grow.is_empty() {
                self.structural_update(grow).await?;
            }
        }

        let url = format!("{}/values:batchUpdate", self.base_url);
        let body = json!({ "valueInputOption": "RAW", "data": data });
        self.send(Method::POST, &url, Some(&body)).await?;
        debug!("Committed {} ranges in one batch", data.len());
        Ok(())
    }
}
