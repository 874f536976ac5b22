//! Exact line-level deduplication.
//!
//! Two-phase batch computation:
//! 1. [`LineIndex::build`] counts every normalized line hash across the whole
//!    document set (per-document counts merged in parallel).
//! 2. [`LineIndex::filter`] rewrites each document keeping only lines whose
//!    hash occurred exactly once corpus-wide.
//!
//! Phase 2 only reads the finished index, so the index is an immutable
//! artifact handed from one phase to the next.

use crate::io::Document;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sieve_core::hashing::hash64;
use sieve_core::{Result, SieveError};
use std::collections::HashMap;
use tracing::{debug, info};

/// How a line is normalized before hashing.
///
/// The line terminator (`\n` or `\r\n`) is always excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineNormalization {
    /// Raw line content, byte-exact.
    Exact,
    /// Strip leading and trailing whitespace; case-sensitive.
    #[default]
    Trim,
    /// Strip surrounding whitespace and lowercase.
    TrimLowercase,
}

impl LineNormalization {
    /// Hash of `line` (terminator already removed) under this policy.
    #[must_use]
    pub fn hash_line(self, line: &str) -> u64 {
        match self {
            Self::Exact => hash64(line.as_bytes()),
            Self::Trim => hash64(line.trim().as_bytes()),
            Self::TrimLowercase => hash64(line.trim().to_lowercase().as_bytes()),
        }
    }
}

/// Configuration for exact line deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineDedupConfig {
    /// Line normalization policy.
    pub normalization: LineNormalization,
    /// Fail instead of growing the index past this many distinct lines.
    pub max_distinct_lines: Option<usize>,
}

/// Per-document outcome of exact line deduplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineStats {
    /// Lines before filtering.
    pub lines_in: usize,
    /// Lines kept.
    pub lines_out: usize,
}

/// Corpus-wide line hash -> occurrence count map.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    counts: HashMap<u64, u32>,
    normalization: LineNormalization,
}

/// Split text into lines, each keeping its terminator.
fn raw_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive('\n')
}

/// A raw line with its `\n` / `\r\n` terminator removed.
fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

impl LineIndex {
    /// Phase 1: count normalized line hashes over every document.
    ///
    /// Errors with [`SieveError::ResourceExhausted`] when the number of
    /// distinct lines exceeds `config.max_distinct_lines`.
    pub fn build(documents: &[Document], config: &LineDedupConfig) -> Result<Self> {
        let normalization = config.normalization;

        let counts = documents
            .par_iter()
            .map(|doc| {
                let mut local: HashMap<u64, u32> = HashMap::new();
                for line in raw_lines(&doc.text) {
                    let hash = normalization.hash_line(strip_terminator(line));
                    *local.entry(hash).or_insert(0) += 1;
                }
                local
            })
            .reduce(HashMap::new, merge_counts);

        if let Some(limit) = config.max_distinct_lines {
            if counts.len() > limit {
                return Err(SieveError::ResourceExhausted(format!(
                    "{} distinct lines exceed the limit of {limit}; retry with smaller batches",
                    counts.len()
                )));
            }
        }

        info!(
            documents = documents.len(),
            distinct_lines = counts.len(),
            "Built line index"
        );

        Ok(Self {
            counts,
            normalization,
        })
    }

    /// Occurrences of `line` (terminator excluded) across the corpus.
    #[must_use]
    pub fn count(&self, line: &str) -> u32 {
        self.counts
            .get(&self.normalization.hash_line(line))
            .copied()
            .unwrap_or(0)
    }

    /// Number of distinct normalized lines.
    #[must_use]
    pub fn distinct_lines(&self) -> usize {
        self.counts.len()
    }

    /// Phase 2: keep only lines that occur exactly once corpus-wide.
    ///
    /// Surviving lines keep their original bytes and terminators, in order.
    #[must_use]
    pub fn filter(&self, document: &Document) -> (Document, LineStats) {
        let mut stats = LineStats::default();
        let mut text = String::with_capacity(document.text.len());

        for line in raw_lines(&document.text) {
            stats.lines_in += 1;
            if self.count(strip_terminator(line)) == 1 {
                stats.lines_out += 1;
                text.push_str(line);
            }
        }

        (document.with_text(text), stats)
    }
}

fn merge_counts(a: HashMap<u64, u32>, b: HashMap<u64, u32>) -> HashMap<u64, u32> {
    let (mut large, small) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    for (hash, count) in small {
        let slot = large.entry(hash).or_insert(0);
        *slot = slot.saturating_add(count);
    }
    large
}

/// Remove every line that appears more than once across `documents`.
///
/// Output has one document per input, in input order; documents left with
/// no lines are returned empty rather than dropped.
pub fn deduplicate_exact_lines(
    documents: &[Document],
    config: &LineDedupConfig,
) -> Result<Vec<(Document, LineStats)>> {
    let index = LineIndex::build(documents, config)?;

    let filtered: Vec<(Document, LineStats)> =
        documents.par_iter().map(|doc| index.filter(doc)).collect();

    for (doc, stats) in &filtered {
        debug!(
            id = %doc.id,
            lines_in = stats.lines_in,
            lines_out = stats.lines_out,
            "Filtered document"
        );
    }

    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn doc(id: &str, text: &str) -> Document {
        Document::new(id, text)
    }

    fn texts(out: &[(Document, LineStats)]) -> Vec<&str> {
        out.iter().map(|(d, _)| d.text.as_str()).collect()
    }

    #[test]
    fn test_shared_boilerplate_removed_from_both() {
        let docs = vec![
            doc("a", "Welcome to my site\nArticle about rust\n"),
            doc("b", "Welcome to my site\nArticle about cooking\n"),
            doc("c", "Something else entirely\nNothing shared\n"),
        ];

        let out = deduplicate_exact_lines(&docs, &LineDedupConfig::default()).unwrap();

        assert_eq!(
            texts(&out),
            vec![
                "Article about rust\n",
                "Article about cooking\n",
                "Something else entirely\nNothing shared\n",
            ]
        );
        assert_eq!(out[0].1, LineStats { lines_in: 2, lines_out: 1 });
        assert_eq!(out[2].1, LineStats { lines_in: 2, lines_out: 2 });
    }

    #[test]
    fn test_no_repeats_is_noop() {
        let docs = vec![doc("a", "one\ntwo\nthree"), doc("b", "four\nfive\r\nsix\n")];
        let out = deduplicate_exact_lines(&docs, &LineDedupConfig::default()).unwrap();
        assert_eq!(texts(&out), vec!["one\ntwo\nthree", "four\nfive\r\nsix\n"]);
    }

    #[test]
    fn test_repeat_within_one_document_counts() {
        let docs = vec![doc("a", "same\nunique\nsame\n")];
        let out = deduplicate_exact_lines(&docs, &LineDedupConfig::default()).unwrap();
        assert_eq!(texts(&out), vec!["unique\n"]);
    }

    #[test]
    fn test_empty_result_is_kept() {
        let docs = vec![doc("a", "shared\n"), doc("b", "shared\n")];
        let out = deduplicate_exact_lines(&docs, &LineDedupConfig::default()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(texts(&out), vec!["", ""]);
        assert_eq!(out[1].0.id, "b");
    }

    #[test]
    fn test_terminator_does_not_affect_matching() {
        let docs = vec![doc("a", "last line"), doc("b", "last line\r\nother\n")];
        let out = deduplicate_exact_lines(&docs, &LineDedupConfig::default()).unwrap();
        assert_eq!(texts(&out), vec!["", "other\n"]);
    }

    #[test]
    fn test_normalization_policies() {
        let docs = vec![doc("a", "  Hello World \n"), doc("b", "hello world\n")];

        let exact = LineDedupConfig {
            normalization: LineNormalization::Exact,
            ..Default::default()
        };
        let trim = LineDedupConfig::default();
        let folded = LineDedupConfig {
            normalization: LineNormalization::TrimLowercase,
            ..Default::default()
        };

        let out = deduplicate_exact_lines(&docs, &exact).unwrap();
        assert_eq!(texts(&out), vec!["  Hello World \n", "hello world\n"]);

        let out = deduplicate_exact_lines(&docs, &trim).unwrap();
        assert_eq!(texts(&out), vec!["  Hello World \n", "hello world\n"]);

        let out = deduplicate_exact_lines(&docs, &folded).unwrap();
        assert_eq!(texts(&out), vec!["", ""]);
    }

    #[test]
    fn test_distinct_line_limit() {
        let docs = vec![doc("a", "1\n2\n3\n"), doc("b", "4\n5\n")];
        let config = LineDedupConfig {
            max_distinct_lines: Some(4),
            ..Default::default()
        };
        let err = deduplicate_exact_lines(&docs, &config).unwrap_err();
        assert!(matches!(err, SieveError::ResourceExhausted(_)));
    }

    #[test]
    fn test_index_counts() {
        let docs = vec![doc("a", "x\ny\n"), doc("b", "x\n")];
        let index = LineIndex::build(&docs, &LineDedupConfig::default()).unwrap();
        assert_eq!(index.count("x"), 2);
        assert_eq!(index.count("y"), 1);
        assert_eq!(index.count("z"), 0);
        assert_eq!(index.distinct_lines(), 2);
    }

    fn corpus() -> impl Strategy<Value = Vec<Document>> {
        proptest::collection::vec(
            proptest::collection::vec("[abc]{0,3}", 0..6),
            0..5,
        )
        .prop_map(|docs| {
            docs.into_iter()
                .enumerate()
                .map(|(i, lines)| {
                    let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
                    Document::new(format!("doc{i}"), text)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_exact_dedup_idempotent(docs in corpus()) {
            let config = LineDedupConfig::default();
            let once: Vec<Document> = deduplicate_exact_lines(&docs, &config)
                .unwrap()
                .into_iter()
                .map(|(d, _)| d)
                .collect();
            let twice: Vec<Document> = deduplicate_exact_lines(&once, &config)
                .unwrap()
                .into_iter()
                .map(|(d, _)| d)
                .collect();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_unique_lines_untouched(n in 0usize..20) {
            let docs: Vec<Document> = (0..n)
                .map(|i| Document::new(format!("d{i}"), format!("line {i}\nbody {i}\n")))
                .collect();
            let out = deduplicate_exact_lines(&docs, &LineDedupConfig::default()).unwrap();
            for ((filtered, _), original) in out.iter().zip(&docs) {
                prop_assert_eq!(&filtered.text, &original.text);
            }
        }
    }
}
