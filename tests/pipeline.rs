//! End-to-end pipeline tests: mine -> score -> build -> match/tag over real
//! files in a temp directory, covering the literal scenarios the stage
//! contracts promise.

use phrasal::artifact::manifest::Manifest;
use phrasal::artifact::payload::PAYLOAD_SIZE;
use phrasal::artifact::vocab::Vocabulary;
use phrasal::artifact::{ArtifactPaths, DEFAULT_SEPARATOR_ID};
use phrasal::build::{self, BuildConfig};
use phrasal::matcher::{MatchPolicy, Matcher, MatcherService};
use phrasal::mine::{self, MineConfig, NgramRecord};
use phrasal::score::{self, ScoreConfig, ScoredPhrase};
use phrasal::tag::{self, TagConfig, TaggedDocument};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    path
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
    BufReader::new(File::open(path).unwrap())
        .lines()
        .map(|l| serde_json::from_str(&l.unwrap()).unwrap())
        .collect()
}

fn build_config() -> BuildConfig {
    BuildConfig {
        version: "pipeline-v1".to_string(),
        tokenizer: "whitespace-v1".to_string(),
        separator_id: DEFAULT_SEPARATOR_ID,
        min_count: None,
        salience_threshold: None,
    }
}

/// S1: the mining frequency floor keeps "rat cdk10" (count 3) and drops
/// "lysis buffer" (count 1).
#[test]
fn mining_frequency_floor() {
    let dir = TempDir::new().unwrap();
    let corpus = write_lines(
        dir.path(),
        "corpus.jsonl",
        &[
            r#"{"tokens": ["rat", "cdk10", "oligo"]}"#,
            r#"{"tokens": ["rat", "cdk10", "protein"]}"#,
            r#"{"tokens": ["lysis", "buffer"]}"#,
            r#"{"tokens": ["rat", "cdk10"]}"#,
        ],
    );
    let output = dir.path().join("candidates.jsonl");
    let config = MineConfig {
        min_n: 2,
        max_n: 3,
        min_count: 2,
    };

    mine::run_mine(&corpus, &config, &output).unwrap();
    let records: Vec<NgramRecord> = read_jsonl(&output);

    let rat_cdk10 = records.iter().find(|r| r.tokens == ["rat", "cdk10"]).unwrap();
    assert_eq!(rat_cdk10.count, 3);
    assert!(!records.iter().any(|r| r.tokens == ["lysis", "buffer"]));
}

/// S2: ratio scoring keeps "lysis buffer" (salience ~408.33) and drops
/// "for the" (salience ~0.068).
#[test]
fn salience_filter() {
    let dir = TempDir::new().unwrap();
    let domain = write_lines(
        dir.path(),
        "domain.jsonl",
        &[
            r#"{"tokens": ["lysis", "buffer"], "count": 2450}"#,
            r#"{"tokens": ["for", "the"], "count": 8500}"#,
        ],
    );
    let background = write_lines(
        dir.path(),
        "background.jsonl",
        &[
            r#"{"tokens": ["lysis", "buffer"], "count": 5}"#,
            r#"{"tokens": ["for", "the"], "count": 125000}"#,
        ],
    );
    let output = dir.path().join("scored.jsonl");
    let config = ScoreConfig {
        min_salience: 2.0,
        min_domain_count: 10,
        ..Default::default()
    };

    score::run_score(&domain, &background, &config, &output).unwrap();
    let phrases: Vec<ScoredPhrase> = read_jsonl(&output);

    assert_eq!(phrases.len(), 1);
    assert_eq!(phrases[0].tokens, ["lysis", "buffer"]);
    assert!((phrases[0].salience - 408.33).abs() < 0.01);
}

/// S3: leftmost_longest picks the trigram over its bigram prefix.
#[test]
fn leftmost_longest_resolution() {
    let dir = TempDir::new().unwrap();
    let phrases = write_lines(
        dir.path(),
        "phrases.jsonl",
        &[
            r#"{"tokens": ["machine", "learning"], "salience": 2.5, "phrase_id": 100, "domain_count": 150, "background_count": 10}"#,
            r#"{"tokens": ["machine", "learning", "algorithms"], "salience": 3.0, "phrase_id": 300, "domain_count": 200, "background_count": 5}"#,
        ],
    );
    let artifacts = dir.path().join("artifacts");
    build::run_build(&phrases, &build_config(), &artifacts).unwrap();

    let matcher = Matcher::load(&ArtifactPaths::in_dir(&artifacts)).unwrap();
    let spans = matcher.match_text_tokens(
        &["machine", "learning", "algorithms"],
        MatchPolicy::LeftmostLongest,
        10,
    );

    assert!(!spans.is_empty());
    assert_eq!(spans[0].start, 0);
    assert_eq!(spans[0].end, 3);
    assert_eq!(spans[0].phrase_id, 300);
    assert_eq!(spans[0].n, 3);
}

/// S4: salience_max keeps only the higher-salience span of two overlapping
/// candidates at the same start.
#[test]
fn salience_max_resolution() {
    let dir = TempDir::new().unwrap();
    let phrases = write_lines(
        dir.path(),
        "phrases.jsonl",
        &[
            r#"{"tokens": ["lysis", "buffer"], "salience": 2.5, "phrase_id": 100, "domain_count": 100, "background_count": 0}"#,
            r#"{"tokens": ["lysis", "buffer", "solution"], "salience": 5.0, "phrase_id": 101, "domain_count": 50, "background_count": 0}"#,
        ],
    );
    let artifacts = dir.path().join("artifacts");
    build::run_build(&phrases, &build_config(), &artifacts).unwrap();

    let matcher = Matcher::load(&ArtifactPaths::in_dir(&artifacts)).unwrap();
    let spans = matcher.match_text_tokens(
        &["lysis", "buffer", "solution"],
        MatchPolicy::SalienceMax,
        10,
    );

    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].phrase_id, 101);
    assert!((spans[0].salience - 5.0).abs() < f32::EPSILON);
}

/// S5: an unknown token encodes to 0 and never participates in a match.
#[test]
fn unknown_token_gap() {
    let dir = TempDir::new().unwrap();
    let phrases = write_lines(
        dir.path(),
        "phrases.jsonl",
        &[
            r#"{"tokens": ["machine", "learning"], "salience": 2.5, "phrase_id": 100, "domain_count": 150, "background_count": 10}"#,
        ],
    );
    let artifacts = dir.path().join("artifacts");
    build::run_build(&phrases, &build_config(), &artifacts).unwrap();

    let matcher = Matcher::load(&ArtifactPaths::in_dir(&artifacts)).unwrap();
    let ids = matcher.encode_tokens(&["machine", "unknown", "learning"]);
    assert_eq!(ids[1], 0);

    let spans = matcher.match_tokens(&ids, MatchPolicy::LeftmostLongest, 10);
    assert!(spans.is_empty());
}

/// S6: tagger statistics over a three-document corpus.
#[test]
fn tagger_end_to_end() {
    let dir = TempDir::new().unwrap();
    let phrases = write_lines(
        dir.path(),
        "phrases.jsonl",
        &[
            r#"{"tokens": ["machine", "learning"], "salience": 2.5, "phrase_id": 100, "domain_count": 150, "background_count": 10}"#,
        ],
    );
    let artifacts = dir.path().join("artifacts");
    build::run_build(&phrases, &build_config(), &artifacts).unwrap();
    let paths = ArtifactPaths::in_dir(&artifacts);

    let corpus = write_lines(
        dir.path(),
        "corpus.jsonl",
        &[
            r#"{"doc_id": "a", "tokens": ["machine", "learning", "rocks"]}"#,
            r#"{"doc_id": "b", "tokens": ["plain", "words"]}"#,
            r#"{"doc_id": "c", "tokens": ["machine", "learning", "beats", "machine", "learning"]}"#,
        ],
    );
    let output = dir.path().join("tagged.jsonl");

    let config = TagConfig {
        automaton_path: paths.automaton.clone(),
        payloads_path: paths.payloads.clone(),
        manifest_path: paths.manifest.clone(),
        vocab_path: paths.vocab.clone(),
        policy: "leftmost_longest".to_string(),
        max_spans: 100,
        label: "PHRASE".to_string(),
    };

    let stats = tag::run_tag(&corpus, &config, &output).unwrap();
    assert_eq!(stats.documents, 3);
    assert_eq!(stats.docs_with_spans, 2);
    assert_eq!(stats.total_spans, 3);
    assert!((stats.avg_spans_per_doc() - 1.0).abs() < f64::EPSILON);

    let tagged: Vec<TaggedDocument> = read_jsonl(&output);
    assert_eq!(tagged[2].spans.len(), 2);
    // Spans never straddle the document: both fit inside its token array.
    for span in &tagged[2].spans {
        assert!(span.end <= tagged[2].tokens.len());
    }
}

/// Full pipeline: a corpus mined, scored against a background, built, and
/// matched, with payload/manifest coherence checked along the way.
#[test]
fn full_pipeline_coherence() {
    let dir = TempDir::new().unwrap();

    let corpus = write_lines(
        dir.path(),
        "corpus.jsonl",
        &[
            r#"{"tokens": ["Lysis", "Buffer", "protocol"]}"#,
            r#"{"tokens": ["lysis", "buffer", "for", "cells"]}"#,
            r#"{"tokens": ["LYSIS", "BUFFER"]}"#,
            r#"{"tokens": ["for", "the", "record"]}"#,
            r#"{"tokens": ["for", "the", "cells"]}"#,
        ],
    );
    let candidates = dir.path().join("candidates.jsonl");
    let mine_config = MineConfig {
        min_n: 2,
        max_n: 3,
        min_count: 2,
    };
    mine::run_mine(&corpus, &mine_config, &candidates).unwrap();

    // Uppercase variants merged into one lowercase entry.
    let mined: Vec<NgramRecord> = read_jsonl(&candidates);
    assert_eq!(
        mined
            .iter()
            .find(|r| r.tokens == ["lysis", "buffer"])
            .unwrap()
            .count,
        3
    );

    let background = write_lines(
        dir.path(),
        "background.jsonl",
        &[r#"{"tokens": ["for", "the"], "count": 90000}"#],
    );
    let scored = dir.path().join("scored.jsonl");
    let score_config = ScoreConfig {
        min_salience: 2.0,
        min_domain_count: 2,
        ..Default::default()
    };
    score::run_score(&candidates, &background, &score_config, &scored).unwrap();

    let scored_phrases: Vec<ScoredPhrase> = read_jsonl(&scored);
    assert!(scored_phrases
        .iter()
        .any(|p| p.tokens == ["lysis", "buffer"]));
    assert!(!scored_phrases.iter().any(|p| p.tokens == ["for", "the"]));

    // Every phrase got a distinct ID starting at the configured base.
    let mut ids: Vec<u32> = scored_phrases.iter().map(|p| p.phrase_id.unwrap()).collect();
    assert!(ids.iter().all(|&id| id >= 1000));
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), scored_phrases.len());

    let artifacts = dir.path().join("artifacts");
    build::run_build(&scored, &build_config(), &artifacts).unwrap();
    let paths = ArtifactPaths::in_dir(&artifacts);

    // Payload/manifest coherence: size = 17 * num_patterns.
    let manifest = Manifest::load(&paths.manifest).unwrap();
    assert_eq!(
        fs::metadata(&paths.payloads).unwrap().len() as usize,
        PAYLOAD_SIZE * manifest.num_patterns
    );

    // Vocabulary covers every phrase token.
    let vocab = Vocabulary::load(&paths.vocab).unwrap();
    for phrase in &scored_phrases {
        for token in &phrase.tokens {
            assert!(vocab.token_id(token).is_some(), "missing token {token}");
        }
    }

    let matcher = Matcher::load(&paths).unwrap();
    let spans = matcher.match_text_tokens(
        &["prepare", "LYSIS", "buffer", "now"],
        MatchPolicy::LeftmostLongest,
        10,
    );
    assert_eq!(spans.len(), 1);
    assert_eq!((spans[0].start, spans[0].end), (1, 3));
}

/// Reload atomicity: a service swapped between two artifact sets always
/// answers from exactly one of them.
#[test]
fn service_reload_switches_artifact_sets() {
    let dir = TempDir::new().unwrap();

    let phrases_a = write_lines(
        dir.path(),
        "a.jsonl",
        &[
            r#"{"tokens": ["machine", "learning"], "salience": 2.5, "phrase_id": 100, "domain_count": 150, "background_count": 10}"#,
        ],
    );
    let phrases_b = write_lines(
        dir.path(),
        "b.jsonl",
        &[
            r#"{"tokens": ["machine", "learning"], "salience": 9.0, "phrase_id": 7000, "domain_count": 150, "background_count": 10}"#,
        ],
    );

    let dir_a = dir.path().join("artifacts-a");
    let dir_b = dir.path().join("artifacts-b");
    build::run_build(&phrases_a, &build_config(), &dir_a).unwrap();
    build::run_build(&phrases_b, &build_config(), &dir_b).unwrap();

    let service = MatcherService::new();
    service.load(&ArtifactPaths::in_dir(&dir_a)).unwrap();

    let before = service
        .match_text_tokens(&["machine", "learning"], MatchPolicy::LeftmostLongest, 10)
        .unwrap();
    assert_eq!(before[0].phrase_id, 100);

    service.load(&ArtifactPaths::in_dir(&dir_b)).unwrap();

    let after = service
        .match_text_tokens(&["machine", "learning"], MatchPolicy::LeftmostLongest, 10)
        .unwrap();
    assert_eq!(after[0].phrase_id, 7000);

    let stats = service.stats().unwrap();
    assert_eq!(stats.num_patterns, 1);
    assert_eq!(stats.hits_total, 2);
}
