use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{sleep, Instant};
use tracing::info;

use crate::engine::Resolver;
use crate::errors::{AppError, AppResult};
use crate::query::{normalize, QueryShape, ResolutionQuery};
use crate::resolution::{ResolutionResult, ResolutionSource, ResolutionStatus};

pub const OUTPUT_COLUMNS: [&str; 7] = [
    "Latitude",
    "Longitude",
    "Address",
    "Resolved Name",
    "API Source",
    "Status",
    "Place ID",
];

const PREVIEW_ROWS: usize = 3;

#[derive(Debug, Clone)]
pub struct InputRow {
    pub record: StringRecord,
    pub query: ResolutionQuery,
}

/// A CSV whose first column is the venue name and second the city.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub headers: StringRecord,
    pub rows: Vec<InputRow>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BatchSummary {
    pub rows: usize,
    pub success: usize,
    pub low_quality_kept: usize,
    pub skipped_empty: usize,
    pub failed: usize,
    pub unprocessed: usize,
}

impl BatchSummary {
    fn with_total(rows: usize) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    fn record(&mut self, result: &ResolutionResult) {
        if result.is_success() {
            self.success += 1;
        } else if matches!(result.status(), ResolutionStatus::SkippedEmpty) {
            self.skipped_empty += 1;
        } else {
            self.failed += 1;
        }
        if result.source() == ResolutionSource::PlacesTextSearchLowQuality {
            self.low_quality_kept += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub total_rows: usize,
    pub processed: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One entry per processed row, in input order.
    pub results: Vec<ResolutionResult>,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub headers: Vec<String>,
    pub rows: usize,
    pub preview: Vec<Vec<String>>,
    pub non_empty_rows: usize,
}

pub fn read_input(path: &Path) -> AppResult<BatchInput> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(AppError::Config(format!(
            "{} must have at least 2 columns (venue name, city)",
            path.display()
        )));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let query = ResolutionQuery::new(record.get(0), record.get(1));
        rows.push(InputRow { record, query });
    }
    Ok(BatchInput { headers, rows })
}

pub fn inspect_input(path: &Path) -> AppResult<InspectReport> {
    let input = read_input(path)?;
    let non_empty_rows = input
        .rows
        .iter()
        .filter(|row| row.record.iter().any(|cell| !cell.trim().is_empty()))
        .count();
    Ok(InspectReport {
        headers: input.headers.iter().map(str::to_string).collect(),
        rows: input.rows.len(),
        preview: input
            .rows
            .iter()
            .take(PREVIEW_ROWS)
            .map(|row| row.record.iter().map(str::to_string).collect())
            .collect(),
        non_empty_rows,
    })
}

/// `venues.csv` -> `venues_geocoded.csv` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "venues".into());
    input.with_file_name(format!("{stem}_geocoded.csv"))
}

/// Writes the input columns followed by `OUTPUT_COLUMNS`. Rows without a
/// result (cancelled runs) get blank output cells.
pub fn write_output(
    path: &Path,
    input: &BatchInput,
    results: &[ResolutionResult],
) -> AppResult<()> {
    let mut writer = WriterBuilder::new().flexible(true).from_path(path)?;

    let mut header = input.headers.iter().map(str::to_string).collect::<Vec<_>>();
    header.extend(OUTPUT_COLUMNS.iter().map(|c| c.to_string()));
    writer.write_record(&header)?;

    for (index, row) in input.rows.iter().enumerate() {
        let mut fields = row.record.iter().map(str::to_string).collect::<Vec<_>>();
        if fields.len() < input.headers.len() {
            fields.resize(input.headers.len(), String::new());
        }
        match results.get(index) {
            Some(result) => fields.extend(output_cells(result)),
            None => fields.extend(std::iter::repeat(String::new()).take(OUTPUT_COLUMNS.len())),
        }
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

fn output_cells(result: &ResolutionResult) -> [String; 7] {
    let optional = |value: Option<String>| value.unwrap_or_default();
    [
        optional(result.latitude().map(|v| v.to_string())),
        optional(result.longitude().map(|v| v.to_string())),
        optional(result.formatted_address().map(str::to_string)),
        optional(result.resolved_name().map(str::to_string)),
        result.source().as_tag().to_string(),
        result.status().to_string(),
        optional(result.place_id().map(str::to_string)),
    ]
}

pub struct BatchRunner {
    resolver: Resolver,
    pacer: Pacer,
}

impl BatchRunner {
    pub fn new(resolver: Resolver, delay: Duration) -> Self {
        Self {
            resolver,
            pacer: Pacer::new(delay),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub async fn run(
        &self,
        input: &BatchInput,
        observer: Option<Arc<dyn Fn(BatchProgress) + Send + Sync>>,
        cancel_flag: Option<Arc<AtomicBool>>,
    ) -> BatchReport {
        let total_rows = input.rows.len();
        let mut summary = BatchSummary::with_total(total_rows);
        let mut results = Vec::with_capacity(total_rows);
        info!(total_rows, "processing batch");

        for (index, row) in input.rows.iter().enumerate() {
            if let Some(flag) = &cancel_flag {
                if flag.load(Ordering::SeqCst) {
                    break;
                }
            }

            let result = match normalize(&row.query) {
                QueryShape::Skip => {
                    info!("[{}/{}] skip empty", index + 1, total_rows);
                    ResolutionResult::skipped_empty()
                }
                QueryShape::Lookup(query) => {
                    self.pacer.wait().await;
                    let result = self.resolver.resolve(&row.query).await;
                    info!(
                        "[{}/{}] {} -> {} ({})",
                        index + 1,
                        total_rows,
                        query.text,
                        result.status(),
                        result.source()
                    );
                    result
                }
            };

            summary.record(&result);
            results.push(result);
            if let Some(callback) = &observer {
                callback(BatchProgress {
                    total_rows,
                    processed: results.len(),
                    resolved: summary.success,
                });
            }
        }

        summary.unprocessed = total_rows - results.len();
        info!(
            rows = summary.rows,
            success = summary.success,
            low_quality_kept = summary.low_quality_kept,
            skipped_empty = summary.skipped_empty,
            failed = summary.failed,
            unprocessed = summary.unprocessed,
            "batch finished"
        );
        BatchReport { results, summary }
    }
}

/// Keeps successive resolutions at least `interval` apart.
struct Pacer {
    interval: Duration,
    last_tick: AsyncMutex<Option<Instant>>,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: AsyncMutex::new(None),
        }
    }

    async fn wait(&self) {
        let mut guard = self.last_tick.lock().await;
        if let Some(prev) = *guard {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }
        *guard = Some(Instant::now());
    }
}
