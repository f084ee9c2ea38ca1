//! Concurrent batch-processing pipeline.
//!
//! A [`BatchPipeline`] owns an ordered list of documents and an ordered list
//! of operations, and applies every operation to every document on a bounded
//! worker pool. Results are reported over two observation channels: a
//! progress stream and an error stream. A failure on one document's operation
//! is recorded on the error stream and never stops the processing of other
//! documents; the pipeline itself only fails terminally when it cannot start
//! at all.
//!
//! Each worker owns one document for the duration of its operations —
//! documents are never shared for concurrent write. Within a document,
//! operations apply in registration order; across documents, completion
//! order is unspecified.

use crate::common::xml::escape_xml;
use crate::docx::{Document, DocumentValidator, DocxError, has_blocking_errors};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use thiserror::Error;

/// The kind of a batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationKind {
    /// Extract the plain text of the document
    ExtractText,
    /// Extract every table as tab-separated rows
    ExtractTables,
    /// Run the document validator
    Validate,
    /// Convert the document to another format (`target_format` parameter)
    ConvertFormat,
}

impl OperationKind {
    /// The name used on the progress and error streams.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::ExtractText => "ExtractText",
            OperationKind::ExtractTables => "ExtractTables",
            OperationKind::Validate => "Validate",
            OperationKind::ConvertFormat => "ConvertFormat",
        }
    }
}

/// A single batch operation with loosely-typed parameters.
#[derive(Debug, Clone)]
pub struct BatchOperation {
    pub kind: OperationKind,
    pub parameters: serde_json::Map<String, Value>,
}

impl BatchOperation {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            parameters: serde_json::Map::new(),
        }
    }

    /// Attach a parameter.
    pub fn with_parameter(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    fn str_parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    fn bool_parameter(&self, key: &str) -> bool {
        self.parameters
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// A structured progress report.
///
/// `processed` counts documents whose operations have all been attempted; it
/// is monotonically non-decreasing across the stream.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub total: usize,
    pub processed: usize,
    pub percentage: f64,
    pub current_document: String,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// A per-(document, operation) error report.
#[derive(Debug, Clone, Serialize)]
pub struct BatchError {
    pub document_id: String,
    pub operation: String,
    pub error: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Worker count; at most this many documents are processed concurrently
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

/// Terminal pipeline errors: conditions that prevent the batch from starting.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no documents to process")]
    NoDocuments,

    #[error("no operations to perform")]
    NoOperations,

    #[error("batch has already been processed")]
    AlreadyProcessed,

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Best-effort cancellation handle.
///
/// Cancelling stops the dispatch of new (document, operation) units;
/// in-flight units run to completion, and already-recorded progress and
/// error entries are retained.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Aggregate outcome of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total_documents: usize,
    pub total_operations: usize,
    pub processed: usize,
    pub cancelled: bool,
}

/// Progress counter and sender, guarded together so reported counts are
/// monotonically non-decreasing.
struct ProgressState {
    processed: usize,
    tx: Sender<ProgressReport>,
}

/// The batch pipeline.
///
/// # Examples
///
/// ```no_run
/// use longan::batch::{BatchPipeline, BatchOperation, OperationKind};
/// use longan::docx::Document;
///
/// let mut pipeline = BatchPipeline::with_concurrency(4);
/// pipeline.add_document(Document::open("a.docx")?);
/// pipeline.add_operation(BatchOperation::new(OperationKind::ExtractText));
///
/// let progress = pipeline.progress_stream().unwrap();
/// pipeline.process_batch()?;
/// for report in progress {
///     println!("{:.0}% ({})", report.percentage, report.current_document);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct BatchPipeline {
    documents: Vec<Document>,
    operations: Vec<BatchOperation>,
    config: BatchConfig,
    progress_tx: Option<Sender<ProgressReport>>,
    progress_rx: Option<Receiver<ProgressReport>>,
    error_tx: Option<Sender<BatchError>>,
    error_rx: Option<Receiver<BatchError>>,
    cancelled: Arc<AtomicBool>,
}

impl BatchPipeline {
    /// Create a pipeline with the given configuration.
    pub fn new(config: BatchConfig) -> Self {
        let (progress_tx, progress_rx) = channel();
        let (error_tx, error_rx) = channel();
        Self {
            documents: Vec::new(),
            operations: Vec::new(),
            config: BatchConfig {
                concurrency: config.concurrency.max(1),
            },
            progress_tx: Some(progress_tx),
            progress_rx: Some(progress_rx),
            error_tx: Some(error_tx),
            error_rx: Some(error_rx),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a pipeline with the given worker count.
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self::new(BatchConfig { concurrency })
    }

    /// Append a document to the batch. Documents are identified on the
    /// streams as `doc_<index>` in registration order.
    pub fn add_document(&mut self, document: Document) {
        self.documents.push(document);
    }

    /// Append an operation. Operations apply to every document in the order
    /// they were registered.
    pub fn add_operation(&mut self, operation: BatchOperation) {
        self.operations.push(operation);
    }

    /// The documents held by the pipeline.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Consume the pipeline and return its documents (mutated in place by
    /// operations such as validation with auto-fix).
    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }

    /// Take the progress stream. Yields `None` after the first call.
    pub fn progress_stream(&mut self) -> Option<Receiver<ProgressReport>> {
        self.progress_rx.take()
    }

    /// Take the error stream. Yields `None` after the first call.
    pub fn error_stream(&mut self) -> Option<Receiver<BatchError>> {
        self.error_rx.take()
    }

    /// A handle for best-effort cancellation of the running batch.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    /// Apply every operation to every document.
    ///
    /// Fails terminally only when the batch cannot start (empty document or
    /// operation list, pool construction failure). Per-unit failures are
    /// reported on the error stream and do not affect other documents.
    pub fn process_batch(&mut self) -> Result<BatchSummary, PipelineError> {
        if self.documents.is_empty() {
            return Err(PipelineError::NoDocuments);
        }
        if self.operations.is_empty() {
            return Err(PipelineError::NoOperations);
        }
        let progress_tx = self.progress_tx.take().ok_or(PipelineError::AlreadyProcessed)?;
        let error_tx = self.error_tx.take().ok_or(PipelineError::AlreadyProcessed)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency)
            .build()
            .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;

        let total = self.documents.len();
        let operations = &self.operations;
        let cancelled = &self.cancelled;
        let progress = Mutex::new(ProgressState {
            processed: 0,
            tx: progress_tx,
        });

        log::debug!(
            "processing batch: {} documents x {} operations on {} workers",
            total,
            operations.len(),
            self.config.concurrency
        );

        pool.install(|| {
            self.documents
                .par_iter_mut()
                .enumerate()
                .for_each_with(error_tx, |error_tx, (index, document)| {
                    let document_id = format!("doc_{}", index);

                    for (op_index, operation) in operations.iter().enumerate() {
                        if cancelled.load(Ordering::Relaxed) {
                            return;
                        }
                        let is_last = op_index == operations.len() - 1;

                        match execute_operation(&document_id, document, operation) {
                            Ok(()) => {
                                let mut state = progress.lock();
                                if is_last {
                                    state.processed += 1;
                                }
                                let report = ProgressReport {
                                    total,
                                    processed: state.processed,
                                    percentage: state.processed as f64 / total as f64 * 100.0,
                                    current_document: document_id.clone(),
                                    operation: operation.kind.as_str().to_string(),
                                    timestamp: chrono::Utc::now(),
                                };
                                // A disconnected receiver just drops the report
                                let _ = state.tx.send(report);
                            }
                            Err(err) => {
                                if is_last {
                                    progress.lock().processed += 1;
                                }
                                let _ = error_tx.send(BatchError {
                                    document_id: document_id.clone(),
                                    operation: operation.kind.as_str().to_string(),
                                    error: err.to_string(),
                                    timestamp: chrono::Utc::now(),
                                });
                            }
                        }
                    }
                });
        });

        let processed = progress.lock().processed;
        let was_cancelled = self.cancelled.load(Ordering::Relaxed);

        Ok(BatchSummary {
            total_documents: total,
            total_operations: self.operations.len(),
            processed,
            cancelled: was_cancelled,
        })
    }
}

impl Default for BatchPipeline {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}

/// Execute one (document, operation) unit.
fn execute_operation(
    document_id: &str,
    document: &mut Document,
    operation: &BatchOperation,
) -> crate::docx::Result<()> {
    match operation.kind {
        OperationKind::ExtractText => {
            let text = document.text().to_string();
            write_output(operation, document_id, "txt", &text)
        }
        OperationKind::ExtractTables => {
            let dump = tables_as_tsv(document);
            write_output(operation, document_id, "tsv", &dump)
        }
        OperationKind::Validate => {
            let validator = if operation.bool_parameter("auto_fix") {
                DocumentValidator::with_auto_fix()
            } else {
                DocumentValidator::new()
            };
            let results = validator.validate(document);
            if has_blocking_errors(&results) {
                let messages: Vec<_> = results
                    .iter()
                    .filter(|r| r.error.is_some() && !r.fixed)
                    .map(|r| format!("{}: {}", r.rule_id, r.message))
                    .collect();
                Err(DocxError::Validation(messages.join("; ")))
            } else {
                Ok(())
            }
        }
        OperationKind::ConvertFormat => {
            let target = operation.str_parameter("target_format").ok_or_else(|| {
                DocxError::InvalidFormat("target_format parameter required".to_string())
            })?;
            let converted = match target {
                "txt" => document.text().to_string(),
                "html" => document_as_html(document),
                other => {
                    return Err(DocxError::InvalidFormat(format!(
                        "unsupported target format: {}",
                        other
                    )));
                }
            };
            write_output(operation, document_id, target, &converted)
        }
    }
}

/// Write an operation artifact when an `output_dir` parameter is present.
/// The file handle is scoped to the write; nothing stays open on error.
fn write_output(
    operation: &BatchOperation,
    document_id: &str,
    extension: &str,
    content: &str,
) -> crate::docx::Result<()> {
    if let Some(dir) = operation.str_parameter("output_dir") {
        let path = Path::new(dir).join(format!("{}.{}", document_id, extension));
        std::fs::write(&path, content)
            .map_err(crate::opc::PackageError::Io)
            .map_err(DocxError::Package)?;
        log::debug!("wrote {} artifact to {}", document_id, path.display());
    }
    Ok(())
}

/// Render every table as tab-separated rows, tables separated by blank lines.
fn tables_as_tsv(document: &Document) -> String {
    let mut out = String::new();
    for (i, table) in document.tables().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for row in &table.rows {
            let cells: Vec<_> = row.cells.iter().map(|c| c.text.as_str()).collect();
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
    }
    out
}

/// Render the document as minimal HTML: one `<p>` per paragraph, one
/// `<table>` per table.
fn document_as_html(document: &Document) -> String {
    let mut out = String::from("<html><body>");
    for para in document.paragraphs() {
        out.push_str("<p>");
        out.push_str(&escape_xml(&para.text));
        out.push_str("</p>");
    }
    for table in document.tables() {
        out.push_str("<table>");
        for row in &table.rows {
            out.push_str("<tr>");
            for cell in &row.cells {
                out.push_str("<td>");
                out.push_str(&escape_xml(&cell.text));
                out.push_str("</td>");
            }
            out.push_str("</tr>");
        }
        out.push_str("</table>");
    }
    out.push_str("</body></html>");
    out
}
