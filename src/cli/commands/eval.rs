//! Offline evaluation of generated answers against gold answers.
//!
//! Reads JSONL records of `{query, gold_answer, final_response}`, where the
//! answers were already generated elsewhere, and scores each with textual
//! similarity metrics plus a weighted aggregate.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::utils::tokenize;

/// Aggregate weighting: lexical overlap (ROUGE-L) vs unigram F1.
const ROUGE_WEIGHT: f64 = 0.5;
const UNIGRAM_WEIGHT: f64 = 0.5;

#[derive(Debug, Args)]
pub struct EvalArgs {
    #[arg(
        required = true,
        help = "JSONL file with query, gold_answer, and final_response fields"
    )]
    pub input: PathBuf,

    #[arg(long, help = "Write per-record metrics as JSONL to this path")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct EvalRecord {
    query: String,
    gold_answer: String,
    final_response: String,
}

#[derive(Debug, Serialize)]
struct RecordMetrics {
    query: String,
    rouge_l: f64,
    unigram_f1: f64,
    aggregated: f64,
}

pub fn handle_eval(args: EvalArgs) -> Result<()> {
    let records = read_records(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let metrics: Vec<RecordMetrics> = records
        .iter()
        .map(|record| {
            let rouge_l = rouge_l_f1(&record.final_response, &record.gold_answer);
            let unigram = unigram_f1(&record.final_response, &record.gold_answer);
            RecordMetrics {
                query: record.query.clone(),
                rouge_l,
                unigram_f1: unigram,
                aggregated: ROUGE_WEIGHT * rouge_l + UNIGRAM_WEIGHT * unigram,
            }
        })
        .collect();

    for m in &metrics {
        println!(
            "{:>7.3}  {:>7.3}  {:>7.3}  {}",
            m.rouge_l,
            m.unigram_f1,
            m.aggregated,
            style(&m.query).dim()
        );
    }
    let mean = metrics.iter().map(|m| m.aggregated).sum::<f64>() / metrics.len() as f64;
    println!(
        "{} {:.3} over {} records",
        style("mean aggregated:").bold(),
        mean,
        metrics.len()
    );

    if let Some(path) = args.output {
        let mut file = std::fs::File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        for m in &metrics {
            writeln!(file, "{}", serde_json::to_string(m)?)?;
        }
    }

    Ok(())
}

fn read_records(path: &std::path::Path) -> Result<Vec<EvalRecord>, EvalError> {
    let content = std::fs::read_to_string(path)?;
    let mut records = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: EvalRecord = serde_json::from_str(line)
            .map_err(|e| EvalError::JsonParseError(number + 1, e))?;
        records.push(record);
    }
    if records.is_empty() {
        return Err(EvalError::NoRecords);
    }
    Ok(records)
}

/// ROUGE-L F1: longest-common-subsequence overlap between the candidate and
/// reference token sequences.
pub fn rouge_l_f1(candidate: &str, reference: &str) -> f64 {
    let candidate_tokens = tokenize(candidate);
    let reference_tokens = tokenize(reference);
    if candidate_tokens.is_empty() || reference_tokens.is_empty() {
        return 0.0;
    }

    let lcs = lcs_len(&candidate_tokens, &reference_tokens) as f64;
    let precision = lcs / candidate_tokens.len() as f64;
    let recall = lcs / reference_tokens.len() as f64;
    f1(precision, recall)
}

/// Unigram F1: multiset token overlap between candidate and reference.
pub fn unigram_f1(candidate: &str, reference: &str) -> f64 {
    let candidate_tokens = tokenize(candidate);
    let reference_tokens = tokenize(reference);
    if candidate_tokens.is_empty() || reference_tokens.is_empty() {
        return 0.0;
    }

    let mut reference_counts = std::collections::HashMap::new();
    for token in &reference_tokens {
        *reference_counts.entry(token.as_str()).or_insert(0usize) += 1;
    }
    let mut overlap = 0usize;
    for token in &candidate_tokens {
        if let Some(count) = reference_counts.get_mut(token.as_str())
            && *count > 0
        {
            *count -= 1;
            overlap += 1;
        }
    }

    let precision = overlap as f64 / candidate_tokens.len() as f64;
    let recall = overlap as f64 / reference_tokens.len() as f64;
    f1(precision, recall)
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

/// Longest common subsequence length with a rolling DP row.
fn lcs_len(a: &[String], b: &[String]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for token_a in a {
        for (j, token_b) in b.iter().enumerate() {
            current[j + 1] = if token_a == token_b {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
