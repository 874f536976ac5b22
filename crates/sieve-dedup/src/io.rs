//! File I/O for plain-text and JSONL corpora.
//!
//! Plain-text inputs are one document per file, identified by file name
//! (or by full path when two inputs share a name).
//! JSONL inputs hold one document per line; the identifier comes from an
//! `id` field when present. Unreadable inputs are skipped and reported, never
//! fatal.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sieve_core::{Result, SieveError};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Document representation for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable document identifier.
    pub id: String,
    /// Document text content.
    pub text: String,
    /// File name used when the document is written out.
    pub output_name: String,
}

impl Document {
    /// Create a new document whose output name is derived from its id.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        let output_name = sanitize_file_name(&id);
        Self {
            id,
            text: text.into(),
            output_name,
        }
    }

    /// Same identity, different content.
    #[must_use]
    pub fn with_text(&self, text: String) -> Self {
        Self {
            id: self.id.clone(),
            text,
            output_name: self.output_name.clone(),
        }
    }

    /// Override the file name used when writing.
    #[must_use]
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }
}

/// An input excluded from the run, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedInput {
    /// Offending file (with `:line` suffix for JSONL records).
    pub path: String,
    /// Why it was skipped.
    pub reason: String,
}

impl SkippedInput {
    fn new(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
        }
    }
}

impl From<SieveError> for SkippedInput {
    fn from(err: SieveError) -> Self {
        match err {
            SieveError::Input { path, message } => Self::new(path, message),
            other => Self::new("<unknown>", other.to_string()),
        }
    }
}

/// Input file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// One UTF-8 document per file.
    #[default]
    Text,
    /// JSON Lines, one document per line.
    Jsonl,
}

impl InputFormat {
    /// Detect format from file extension (`.jsonl`/`.ndjson` are JSONL).
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl" | "ndjson") => Self::Jsonl,
            _ => Self::Text,
        }
    }
}

/// Documents loaded for a run plus everything that was skipped.
#[derive(Debug, Default)]
pub struct Corpus {
    /// Loaded documents in input order.
    pub documents: Vec<Document>,
    /// Inputs excluded from the run.
    pub skipped: Vec<SkippedInput>,
}

/// Replace characters that are unsafe in file names.
#[must_use]
pub fn sanitize_file_name(id: &str) -> String {
    let name: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        format!("_{name}")
    } else {
        name
    }
}

/// Expand directories into their regular files (sorted, non-recursive).
///
/// Plain paths are passed through unchanged; read failures surface later as
/// skipped inputs.
pub fn expand_inputs(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<SkippedInput>) {
    let mut files = Vec::new();
    let mut skipped = Vec::new();

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        match fs::read_dir(path) {
            Ok(entries) => {
                let mut dir_files: Vec<PathBuf> = entries
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|p| p.is_file())
                    .collect();
                dir_files.sort();
                files.extend(dir_files);
            }
            Err(e) => skipped.push(SkippedInput::new(path, e.to_string())),
        }
    }

    (files, skipped)
}

/// Read one plain-text document; the id is the file name.
pub fn read_text_document(path: &Path) -> Result<Document> {
    let bytes = fs::read(path).map_err(|e| SieveError::input(path, e.to_string()))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| SieveError::input(path, format!("invalid UTF-8: {e}")))?;

    let id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| SieveError::input(path, "path has no file name"))?;

    Ok(Document::new(id, text))
}

/// Read documents from a JSONL file.
///
/// Each line should be a JSON object with the specified text field. The
/// document id is the `id` field (string or number) if present, otherwise
/// `<file stem>-<line number>`. Bad lines are skipped individually.
pub fn read_jsonl_documents(path: &Path, text_field: &str) -> Result<Corpus> {
    let file = File::open(path).map_err(|e| SieveError::input(path, e.to_string()))?;
    let reader = BufReader::new(file);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut corpus = Corpus::default();

    for (line_num, line) in reader.lines().enumerate() {
        let location = format!("{}:{}", path.display(), line_num + 1);
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                corpus.skipped.push(SkippedInput::new(&location, e.to_string()));
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let json: serde_json::Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                corpus.skipped.push(SkippedInput::new(&location, e.to_string()));
                continue;
            }
        };

        let Some(text) = json.get(text_field).and_then(|v| v.as_str()) else {
            corpus.skipped.push(SkippedInput::new(
                &location,
                format!("field '{text_field}' not found or not a string"),
            ));
            continue;
        };

        let id = match json.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => format!("{stem}-{}", line_num + 1),
        };

        let mut doc = Document::new(id, text);
        doc.output_name.push_str(".txt");
        corpus.documents.push(doc);
    }

    Ok(corpus)
}

/// Claim a label not yet in `taken`: `preferred`, else `fallback`, else
/// `fallback#2`, `fallback#3`, ...
fn claim_unique(taken: &mut HashSet<String>, preferred: &str, fallback: &str) -> String {
    if taken.insert(preferred.to_string()) {
        return preferred.to_string();
    }
    if taken.insert(fallback.to_string()) {
        return fallback.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{fallback}#{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Claim a file name not yet in `taken`, suffixing the stem (`page-2.txt`).
fn claim_file_name(taken: &mut HashSet<String>, name: &str) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let mut n = 2;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Load every input, skipping (and recording) the ones that fail.
///
/// Files are read in parallel; document order follows input order. Ids are
/// unique within the corpus: a plain-text document whose file name is
/// already taken is identified by its full path instead, and a repeated
/// JSONL id gets a `#N` suffix.
pub fn load_documents(paths: &[PathBuf], format: InputFormat, text_field: &str) -> Corpus {
    let (files, mut skipped) = expand_inputs(paths);

    let per_file: Vec<Result<Corpus>> = files
        .par_iter()
        .map(|path| match format {
            InputFormat::Text => read_text_document(path).map(|doc| Corpus {
                documents: vec![doc],
                skipped: Vec::new(),
            }),
            InputFormat::Jsonl => read_jsonl_documents(path, text_field),
        })
        .collect();

    let mut documents = Vec::new();
    let mut seen_ids = HashSet::new();

    for (path, result) in files.iter().zip(per_file) {
        match result {
            Ok(corpus) => {
                skipped.extend(corpus.skipped);
                for mut doc in corpus.documents {
                    let fallback = match format {
                        InputFormat::Text => path.display().to_string(),
                        InputFormat::Jsonl => doc.id.clone(),
                    };
                    let id = claim_unique(&mut seen_ids, &doc.id, &fallback);
                    if id != doc.id {
                        debug!(from = %doc.id, to = %id, "Renamed clashing document id");
                        doc.id = id;
                    }
                    documents.push(doc);
                }
            }
            Err(e) => skipped.push(e.into()),
        }
    }

    for skip in &skipped {
        warn!(path = %skip.path, reason = %skip.reason, "Skipping input");
    }
    debug!(
        documents = documents.len(),
        skipped = skipped.len(),
        "Loaded corpus"
    );

    Corpus { documents, skipped }
}

/// Write documents to `dir` in parallel, creating it if needed.
///
/// Each document goes to `dir/<output_name>`; when an earlier document in
/// `docs` already claimed that name the stem gets a numeric suffix. Returns
/// the written paths in `docs` order.
pub fn write_documents<'a, I>(dir: &Path, docs: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = &'a Document>,
{
    fs::create_dir_all(dir)?;

    let mut taken = HashSet::new();
    let planned: Vec<(&Document, PathBuf)> = docs
        .into_iter()
        .map(|doc| {
            let name = claim_file_name(&mut taken, &doc.output_name);
            if name != doc.output_name {
                debug!(id = %doc.id, name = %name, "Output name taken, using suffix");
            }
            (doc, dir.join(name))
        })
        .collect();

    planned
        .par_iter()
        .map(|(doc, path)| fs::write(path, doc.text.as_bytes()))
        .collect::<std::io::Result<()>>()?;

    Ok(planned.into_iter().map(|(_, path)| path).collect())
}

/// Write serializable records to a JSONL file.
pub fn write_jsonl<P: AsRef<Path>, T: Serialize>(path: P, records: &[T]) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}
