//! invs embed - Exercise the configured embedding provider
//!
//! Utility command for checking a provider's output and comparing texts.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, OutputFormat, emit_human, emit_json, emit_jsonl, robot_ok};
use crate::error::{InvError, Result};
use crate::search::embeddings::cosine_similarity;

#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Text to embed
    #[arg(required_unless_present = "image")]
    pub text: Option<String>,

    /// Embed an image file instead of text
    #[arg(long, conflicts_with = "text")]
    pub image: Option<PathBuf>,

    /// Show full embedding vector (default: summary only)
    #[arg(long)]
    pub full: bool,

    /// Compare with another text (show similarity)
    #[arg(long, short)]
    pub compare: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub(crate) struct VectorStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub l2_norm: f32,
    pub non_zero: usize,
}

impl VectorStats {
    pub(crate) fn of(vector: &[f32]) -> Self {
        if vector.is_empty() {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                l2_norm: 0.0,
                non_zero: 0,
            };
        }
        let (min, max, sum) = vector
            .iter()
            .fold((f32::MAX, f32::MIN, 0.0f32), |acc, &x| {
                (acc.0.min(x), acc.1.max(x), acc.2 + x)
            });
        Self {
            min,
            max,
            mean: sum / vector.len() as f32,
            l2_norm: vector.iter().map(|x| x * x).sum::<f32>().sqrt(),
            non_zero: vector.iter().filter(|&&x| x.abs() > 1e-10).count(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Comparison<'a> {
    text_b: &'a str,
    cosine_similarity: f32,
}

#[derive(Debug, Serialize)]
struct EmbedReport<'a> {
    backend: &'a str,
    dimensions: usize,
    input: String,
    stats: VectorStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding: Option<&'a [f32]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison: Option<Comparison<'a>>,
}

pub fn run(ctx: &AppContext, args: &EmbedArgs) -> Result<()> {
    let provider = ctx.provider.as_ref().ok_or_else(|| {
        InvError::EmbeddingUnavailable("embedding.backend is `none`".to_string())
    })?;

    let (input, embedding) = match (&args.image, &args.text) {
        (Some(path), _) => (path.display().to_string(), provider.embed_image(path)?),
        (None, Some(text)) => (text.clone(), provider.embed_text(text)?),
        (None, None) => {
            return Err(InvError::ValidationFailed(
                "a text or --image is required".to_string(),
            ));
        }
    };

    let comparison = match &args.compare {
        Some(text_b) => {
            let other = provider.embed_text(text_b)?;
            Some(Comparison {
                text_b,
                cosine_similarity: cosine_similarity(&embedding, &other),
            })
        }
        None => None,
    };

    let report = EmbedReport {
        backend: provider.name(),
        dimensions: provider.dims(),
        input,
        stats: VectorStats::of(&embedding),
        embedding: args.full.then_some(embedding.as_slice()),
        comparison,
    };

    match ctx.output_format {
        OutputFormat::Json => emit_json(&robot_ok(&report)),
        OutputFormat::Jsonl => emit_jsonl(std::slice::from_ref(&report)),
        OutputFormat::Tsv => {
            println!(
                "{}",
                embedding
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\t")
            );
            Ok(())
        }
        format @ (OutputFormat::Human | OutputFormat::Plain) => {
            emit_human(human_layout(&report, format));
            Ok(())
        }
    }
}

fn human_layout(report: &EmbedReport<'_>, format: OutputFormat) -> HumanLayout {
    let mut layout = HumanLayout::for_format(format);
    let stats = &report.stats;
    layout
        .title("Embedding")
        .kv("backend", report.backend)
        .kv("dimensions", &report.dimensions.to_string())
        .kv("input", &report.input)
        .kv("min", &format!("{:.6}", stats.min))
        .kv("max", &format!("{:.6}", stats.max))
        .kv("mean", &format!("{:.6}", stats.mean))
        .kv("l2 norm", &format!("{:.6}", stats.l2_norm))
        .kv("non-zero", &stats.non_zero.to_string());

    if let Some(values) = report.embedding {
        layout.blank();
        for chunk in values.chunks(8) {
            let row: Vec<String> = chunk.iter().map(|v| format!("{v:8.5}")).collect();
            layout.push_line(row.join(" "));
        }
    }

    if let Some(comparison) = &report.comparison {
        let similarity = format!("{:.4}", comparison.cosine_similarity);
        let similarity = if format.use_colors() {
            let color = if comparison.cosine_similarity > 0.8 {
                "green"
            } else if comparison.cosine_similarity > 0.5 {
                "yellow"
            } else {
                "red"
            };
            similarity.color(color).to_string()
        } else {
            similarity
        };
        layout
            .blank()
            .kv("compared with", comparison.text_b)
            .kv("cosine", &similarity);
    }
    layout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_unit_vector() {
        let stats = VectorStats::of(&[0.6, 0.0, -0.8]);
        assert!((stats.l2_norm - 1.0).abs() < 1e-6);
        assert_eq!(stats.non_zero, 2);
        assert!((stats.min + 0.8).abs() < 1e-6);
        assert!((stats.max - 0.6).abs() < 1e-6);
    }

    #[test]
    fn stats_of_empty_vector_are_zero() {
        let stats = VectorStats::of(&[]);
        assert_eq!(stats.non_zero, 0);
        assert!(stats.mean.abs() < f32::EPSILON);
    }

    #[test]
    fn plain_layout_reports_comparison() {
        let report = EmbedReport {
            backend: "hash",
            dimensions: 3,
            input: "chair".to_string(),
            stats: VectorStats::of(&[1.0, 0.0, 0.0]),
            embedding: None,
            comparison: Some(Comparison {
                text_b: "stool",
                cosine_similarity: 0.25,
            }),
        };
        let text = human_layout(&report, OutputFormat::Plain).build();
        assert!(text.contains("hash"));
        assert!(text.contains("0.2500"));
        assert!(!text.contains('\u{1b}'));
    }
}
