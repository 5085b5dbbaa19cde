//! Performance benchmarks for Postcraft.
//!
//! This module contains benchmarks for:
//! - Reply parsing (sections, lists, labeled fields, scores)
//! - Article metrics (word count, keyword density, structure)
//! - Run snapshot serialization
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use postcraft::agents::BlogInputs;
use postcraft::text::{
    analyze_structure, extract_headings, extract_labeled_field, extract_score, extract_section,
    keyword_density, parse_numbered_list, slugify, split_keywords, word_count,
};
use postcraft::workflow::WorkflowRun;

// ============================================================================
// Mock Data Fixtures
// ============================================================================

mod fixtures {
    /// A brainstorm-shaped reply with `headings` numbered candidates.
    pub fn brainstorm_reply(headings: usize) -> String {
        let mut reply = String::from("Here are the options.\n\n**MAIN H2 HEADINGS:**\n");
        for i in 1..=headings {
            reply.push_str(&format!("{i}. **Heading candidate number {i} for the article**\n"));
        }
        reply.push_str("\n**INTRODUCTION OPTIONS:**\n");
        for i in 1..=3 {
            reply.push_str(&format!("{i}. Introduction approach {i}\n"));
        }
        reply.push_str("\n**CONCLUSION OPTIONS:**\n");
        for i in 1..=3 {
            reply.push_str(&format!("{i}. Conclusion approach {i}\n"));
        }
        reply
    }

    /// A review-shaped reply with every section filled.
    pub fn review_reply() -> String {
        let mut reply = String::from("OVERALL SCORE: 7.5/10\n\n");
        for section in [
            "STRENGTHS",
            "CRITICAL ISSUES",
            "IMPROVEMENT OPPORTUNITIES",
            "SEO RECOMMENDATIONS",
            "REVISION PRIORITIES",
        ] {
            reply.push_str(&format!("**{section}:**\n"));
            for i in 1..=5 {
                reply.push_str(&format!("{i}. Observation {i} about the draft's {section}\n"));
            }
            reply.push('\n');
        }
        reply
    }

    /// A markdown article of roughly `words` words across several sections.
    pub fn article(words: usize) -> String {
        let sentence = "Improv teaches listening, trust and quick collaboration on stage. ";
        let per_sentence = 9;
        let sections = 8;
        let sentences_per_section = (words / per_sentence / sections).max(1);

        let mut text = String::from("# Listening on Stage\n\n");
        for s in 1..=sections {
            text.push_str(&format!("## Section {s}\n\n### Practice\n\n"));
            for p in 0..sentences_per_section {
                text.push_str(sentence);
                if p % 4 == 3 {
                    text.push_str("\n\n");
                }
            }
            text.push_str("\n\n");
        }
        text
    }
}

// ============================================================================
// Parsing Benchmarks
// ============================================================================

fn bench_section_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse/brainstorm");

    for headings in [10, 20, 50] {
        let reply = fixtures::brainstorm_reply(headings);

        group.throughput(Throughput::Elements(headings as u64));
        group.bench_with_input(BenchmarkId::new("section_list", headings), &reply, |b, reply| {
            b.iter(|| {
                let section = extract_section(
                    black_box(reply),
                    "MAIN H2 HEADINGS",
                    &["INTRODUCTION OPTIONS", "CONCLUSION OPTIONS"],
                );
                black_box(section.map(|s| parse_numbered_list(&s)))
            });
        });
    }

    group.finish();
}

fn bench_review_parsing(c: &mut Criterion) {
    let reply = fixtures::review_reply();

    c.bench_function("parse/review_score", |b| b.iter(|| extract_score(black_box(&reply))));

    c.bench_function("parse/review_sections", |b| {
        b.iter(|| {
            let priorities = extract_section(black_box(&reply), "REVISION PRIORITIES", &[]);
            black_box(priorities.map(|s| parse_numbered_list(&s)))
        });
    });

    c.bench_function("parse/labeled_field", |b| {
        let text = "TITLE: Listening on Stage\nKEYWORDS: improv, listening\nCONTEXT: adults";
        b.iter(|| extract_labeled_field(black_box(text), "KEYWORDS"));
    });
}

// ============================================================================
// Metrics Benchmarks
// ============================================================================

fn bench_article_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics/article");
    let keywords = split_keywords("improv, listening, trust, collaboration");

    for words in [500, 1500, 5000] {
        let article = fixtures::article(words);

        group.throughput(Throughput::Bytes(article.len() as u64));
        group.bench_with_input(BenchmarkId::new("word_count", words), &article, |b, text| {
            b.iter(|| word_count(black_box(text)));
        });
        group.bench_with_input(BenchmarkId::new("keyword_density", words), &article, |b, text| {
            b.iter(|| keyword_density(black_box(text), &keywords));
        });
        group.bench_with_input(BenchmarkId::new("structure", words), &article, |b, text| {
            b.iter(|| analyze_structure(black_box(text)));
        });
        group.bench_with_input(BenchmarkId::new("headings", words), &article, |b, text| {
            b.iter(|| extract_headings(black_box(text), 2));
        });
    }

    group.finish();
}

fn bench_slugify(c: &mut Criterion) {
    c.bench_function("metrics/slugify", |b| {
        b.iter(|| slugify(black_box("Yes, And: What Improv Teaches Us About Listening!")));
    });
}

// ============================================================================
// Snapshot Benchmarks
// ============================================================================

fn bench_run_snapshot(c: &mut Criterion) {
    let run = WorkflowRun::new(BlogInputs::new("Listening on Stage", "improv", "adults"));
    let snapshot = serde_json::to_value(&run).unwrap_or_default();

    c.bench_function("snapshot/serialize_run", |b| {
        b.iter(|| serde_json::to_value(black_box(&run)));
    });
    c.bench_function("snapshot/deserialize_run", |b| {
        b.iter(|| serde_json::from_value::<WorkflowRun>(black_box(snapshot.clone())));
    });
}

// ============================================================================
// Criterion Groups and Main
// ============================================================================

criterion_group!(parsing_benches, bench_section_parsing, bench_review_parsing,);

criterion_group!(metrics_benches, bench_article_metrics, bench_slugify,);

criterion_group!(snapshot_benches, bench_run_snapshot,);

criterion_main!(parsing_benches, metrics_benches, snapshot_benches,);
