//! End-to-end driver: load, optionally mask, deduplicate, write.
//!
//! Retained documents are written first; the manifest is written last so a
//! missing manifest marks an interrupted run.

use crate::exact::{deduplicate_exact_lines, LineDedupConfig};
use crate::io::{load_documents, write_documents, write_jsonl, Corpus, Document, InputFormat, SkippedInput};
use crate::pii::{mask_pii, PiiCounts};
use crate::{DedupConfig, Deduplicator};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sieve_core::{Result, SieveError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Which deduplication passes a run performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
    /// Exact line dedup only.
    Exact,
    /// MinHash + LSH document dedup only.
    #[default]
    Fuzzy,
    /// Exact line dedup, then fuzzy dedup on its output.
    ///
    /// Documents the exact pass leaves empty have no shingles, so the fuzzy
    /// pass collapses all of them into one cluster and keeps only the one
    /// with the lowest id.
    Both,
}

impl DedupMode {
    /// Whether the exact line pass runs.
    #[must_use]
    pub fn runs_exact(self) -> bool {
        matches!(self, Self::Exact | Self::Both)
    }

    /// Whether the fuzzy document pass runs.
    #[must_use]
    pub fn runs_fuzzy(self) -> bool {
        matches!(self, Self::Fuzzy | Self::Both)
    }
}

impl fmt::Display for DedupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Both => "both",
        };
        f.write_str(name)
    }
}

/// Everything a run needs apart from its inputs and output location.
///
/// Loadable from TOML:
///
/// ```toml
/// mode = "both"
/// mask_pii = true
///
/// [fuzzy]
/// num_hashes = 256
/// num_bands = 32
///
/// [lines]
/// normalization = "trim-lowercase"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Passes to run.
    pub mode: DedupMode,
    /// MinHash / LSH settings for the fuzzy pass.
    pub fuzzy: DedupConfig,
    /// Normalization and limits for the exact line pass.
    pub lines: LineDedupConfig,
    /// Mask emails, phone numbers and IPs before deduplication.
    pub mask_pii: bool,
    /// How every input file is parsed.
    pub input_format: InputFormat,
    /// JSONL field holding the document text.
    pub text_field: String,
    /// JSONL manifest of removals (fuzzy) and per-document line counts (exact).
    pub manifest: Option<PathBuf>,
    /// Size of a dedicated worker pool; rayon's global pool when unset.
    pub threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: DedupMode::default(),
            fuzzy: DedupConfig::default(),
            lines: LineDedupConfig::default(),
            mask_pii: false,
            input_format: InputFormat::default(),
            text_field: "text".to_string(),
            manifest: None,
            threads: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse a TOML config file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SieveError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Check every setting; the first violation is a [`SieveError::Config`].
    pub fn validate(&self) -> Result<()> {
        self.fuzzy.validate()?;
        if self.text_field.is_empty() {
            return Err(SieveError::Config("text_field must not be empty".to_string()));
        }
        if self.threads == Some(0) {
            return Err(SieveError::Config("threads must be > 0".to_string()));
        }
        Ok(())
    }
}

/// One manifest record.
///
/// Serialized without a tag: removals carry `representative`, line records
/// carry `lines_in`/`lines_out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    /// A document removed by fuzzy dedup.
    Duplicate {
        id: String,
        representative: String,
        cluster_size: usize,
    },
    /// Line counts of a document after exact dedup.
    Lines {
        id: String,
        lines_in: usize,
        lines_out: usize,
    },
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Passes that ran.
    pub mode: DedupMode,
    /// Documents loaded successfully.
    pub documents_in: usize,
    /// Documents written (or that would be, with no output location).
    pub documents_out: usize,
    /// Inputs excluded because they could not be read.
    pub skipped: Vec<SkippedInput>,
    /// Fuzzy clusters with two or more members.
    pub duplicate_clusters: usize,
    /// Documents dropped by the fuzzy pass.
    pub duplicates_removed: usize,
    /// Unique LSH candidate pairs.
    pub candidate_pairs: usize,
    /// Candidate pairs that met the Jaccard threshold.
    pub verified_pairs: usize,
    /// Lines seen by the exact pass.
    pub lines_in: usize,
    /// Lines kept by the exact pass.
    pub lines_out: usize,
    /// Masking counts, when masking ran.
    pub pii: Option<PiiCounts>,
    /// Wall-clock time of the whole run.
    pub elapsed_secs: f64,
}

/// A configured deduplication run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    dedup: Deduplicator,
}

impl Pipeline {
    /// Validate the configuration; nothing is read yet.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let dedup = Deduplicator::new(config.fuzzy.clone())?;
        Ok(Self { config, dedup })
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run over `inputs`, writing retained documents to `output_dir`.
    ///
    /// With no output directory the run only computes the report (and the
    /// manifest, if configured).
    pub fn run(&self, inputs: &[PathBuf], output_dir: Option<&Path>) -> Result<RunReport> {
        match self.config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| SieveError::Config(format!("cannot build thread pool: {e}")))?;
                pool.install(|| self.execute(inputs, output_dir))
            }
            None => self.execute(inputs, output_dir),
        }
    }

    fn execute(&self, inputs: &[PathBuf], output_dir: Option<&Path>) -> Result<RunReport> {
        let start = Instant::now();
        let Corpus {
            mut documents,
            skipped,
        } = load_documents(inputs, self.config.input_format, &self.config.text_field);

        info!(
            mode = %self.config.mode,
            documents = documents.len(),
            skipped = skipped.len(),
            "Loaded corpus"
        );

        let mut report = RunReport {
            mode: self.config.mode,
            documents_in: documents.len(),
            skipped,
            ..RunReport::default()
        };

        if self.config.mask_pii {
            let counts = documents
                .par_iter_mut()
                .map(|doc| {
                    let (masked, counts) = mask_pii(&doc.text);
                    doc.text = masked;
                    counts
                })
                .reduce(PiiCounts::default, |mut a, b| {
                    a += b;
                    a
                });
            info!(masked = counts.total(), "Masked PII");
            report.pii = Some(counts);
        }

        let mut manifest = Vec::new();

        if self.config.mode.runs_exact() {
            let filtered = deduplicate_exact_lines(&documents, &self.config.lines)?;
            documents = Vec::with_capacity(filtered.len());
            for (doc, stats) in filtered {
                report.lines_in += stats.lines_in;
                report.lines_out += stats.lines_out;
                manifest.push(ManifestEntry::Lines {
                    id: doc.id.clone(),
                    lines_in: stats.lines_in,
                    lines_out: stats.lines_out,
                });
                documents.push(doc);
            }
            info!(
                lines_in = report.lines_in,
                lines_out = report.lines_out,
                "Exact line dedup finished"
            );
        }

        let retained: Vec<&Document> = if self.config.mode.runs_fuzzy() {
            let result = self.dedup.deduplicate_documents(&documents)?;
            report.duplicate_clusters = result.stats.cluster_count;
            report.duplicates_removed = result.stats.duplicate_count;
            report.candidate_pairs = result.stats.candidate_pairs;
            report.verified_pairs = result.stats.verified_pairs;

            for &(removed, representative) in &result.removed {
                manifest.push(ManifestEntry::Duplicate {
                    id: documents[removed].id.clone(),
                    representative: documents[representative].id.clone(),
                    cluster_size: result.clusters.get(&representative).map_or(1, Vec::len),
                });
            }
            result.keep_indices.iter().map(|&i| &documents[i]).collect()
        } else {
            documents.iter().collect()
        };
        report.documents_out = retained.len();

        if let Some(dir) = output_dir {
            let written = write_documents(dir, retained)?;
            info!(written = written.len(), output = %dir.display(), "Wrote documents");
        }

        if let Some(path) = &self.config.manifest {
            write_jsonl(path, &manifest)?;
        }

        report.elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            documents_in = report.documents_in,
            documents_out = report.documents_out,
            skipped = report.skipped.len(),
            elapsed_secs = report.elapsed_secs,
            "Run complete"
        );

        Ok(report)
    }
}

/// Exact line dedup over `input_files`, one output file per document.
pub fn run_exact_line_deduplication(input_files: &[PathBuf], output_dir: &Path) -> Result<RunReport> {
    let config = PipelineConfig {
        mode: DedupMode::Exact,
        ..PipelineConfig::default()
    };
    Pipeline::new(config)?.run(input_files, Some(output_dir))
}

/// Fuzzy document dedup over `input_files` with explicit MinHash/LSH tunables.
pub fn run_minhash_deduplication(
    input_files: &[PathBuf],
    num_hashes: usize,
    num_bands: usize,
    ngrams: usize,
    jaccard_threshold: f64,
    output_dir: &Path,
) -> Result<RunReport> {
    let config = PipelineConfig {
        mode: DedupMode::Fuzzy,
        fuzzy: DedupConfig {
            num_hashes,
            num_bands,
            ngrams,
            jaccard_threshold,
            ..DedupConfig::default()
        },
        ..PipelineConfig::default()
    };
    Pipeline::new(config)?.run(input_files, Some(output_dir))
}
