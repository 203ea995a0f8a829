//! End-to-end pipeline scenarios with scripted providers.

mod common;

use std::time::Duration;

use textweave::config::PipelineConfig;
use textweave::document::{Document, Section};
use textweave::pipeline::{Pipeline, PipelineError};
use textweave::providers::ProviderError;
use textweave::resilience::ResilienceConfig;

use common::{ScriptedProvider, analysis};

fn fast_resilience() -> ResilienceConfig {
    ResilienceConfig {
        calls_per_second: 100_000.0,
        failure_threshold: 3,
        recovery_timeout: Duration::from_secs(60),
        max_retries: 0,
        backoff_base: Duration::from_millis(1),
    }
}

fn three_section_document() -> Document {
    let sections = vec![
        Section::new("Introduction", "intro ".repeat(600).trim().to_string()),
        Section::new("Findings", "finding ".repeat(450).trim().to_string()),
        Section::new("Conclusion", "wrapup ".repeat(500).trim().to_string()),
    ];
    let text = sections
        .iter()
        .map(|s| s.body.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    Document::builder()
        .title("Annual report")
        .language("en")
        .text(text)
        .sections(sections)
        .build()
}

#[tokio::test]
async fn sectioned_document_analyzes_cleanly() {
    let provider = ScriptedProvider::new("primary", |chunk| {
        let heading = chunk.section_heading.clone().unwrap_or_default();
        Ok(analysis(&format!("summary of {heading}")))
    });

    let pipeline = Pipeline::builder()
        .config(PipelineConfig::default())
        .provider_with_resilience(provider.clone(), fast_resilience())
        .build()
        .unwrap();

    let result = pipeline.analyze(&three_section_document()).await.unwrap();

    // ~12 000 characters across three sections against the default 4 000
    // limit: one chunk per section, all analyzed by the primary.
    assert_eq!(provider.calls(), 3);
    assert!(!result.partial);
    assert!(result.failed_chunks.is_empty());
    assert_eq!(
        result.summary,
        "summary of Introduction summary of Findings summary of Conclusion"
    );
    assert!(result.run_id.is_some());
    assert!(result.analyzed_at.is_some());
    assert_eq!(result.metadata.word_count, 300);
}

#[tokio::test]
async fn failed_chunk_degrades_the_result() {
    let provider = ScriptedProvider::new("picky", |chunk| {
        if chunk.index == 1 {
            Err(ProviderError::InvalidRequest("refused".into()))
        } else {
            Ok(analysis(&format!("part {}", chunk.index)))
        }
    });

    let pipeline = Pipeline::builder()
        .config(PipelineConfig::default())
        .provider_with_resilience(provider, fast_resilience())
        .build()
        .unwrap();

    let result = pipeline.analyze(&three_section_document()).await.unwrap();

    assert!(result.partial);
    assert_eq!(result.failed_chunks, vec![1]);
    assert_eq!(result.summary, "part 0 part 2");
}

#[tokio::test]
async fn fallback_provider_rescues_the_run() {
    let primary = ScriptedProvider::unreachable("primary");
    let fallback = ScriptedProvider::healthy("fallback");

    let pipeline = Pipeline::builder()
        .config(PipelineConfig::default())
        .provider_with_resilience(primary, fast_resilience())
        .provider_with_resilience(fallback.clone(), fast_resilience())
        .build()
        .unwrap();

    let result = pipeline.analyze(&three_section_document()).await.unwrap();

    assert!(!result.partial);
    assert_eq!(fallback.calls(), 3);
}

#[tokio::test]
async fn short_document_is_a_single_chunk() {
    let provider = ScriptedProvider::healthy("primary");
    let pipeline = Pipeline::builder()
        .config(PipelineConfig::default())
        .provider_with_resilience(provider.clone(), fast_resilience())
        .build()
        .unwrap();

    let doc = Document::builder()
        .title("Note")
        .text("Just a short note about nothing in particular.")
        .build();
    let result = pipeline.analyze(&doc).await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert!(!result.partial);
}

#[tokio::test]
async fn empty_document_is_rejected() {
    let pipeline = Pipeline::builder()
        .config(PipelineConfig::default())
        .provider(ScriptedProvider::healthy("primary"))
        .build()
        .unwrap();

    let doc = Document::builder().title("Empty").text("   \n\n  ").build();
    let err = pipeline.analyze(&doc).await.unwrap_err();
    assert!(matches!(err, PipelineError::EmptyDocument));
}

#[test]
fn pipeline_requires_a_provider() {
    let err = Pipeline::builder()
        .config(PipelineConfig::default())
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::Orchestrator(_)));
}
