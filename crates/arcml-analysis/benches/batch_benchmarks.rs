//! Batching overhead benchmarks
//!
//! Measures chunking, truncation and label normalization around a classifier
//! that does no work, so the numbers are the pipeline's own cost.
//!
//! Run with: cargo bench -p arcml-analysis

use arcml_analysis::{BatchSettings, SentimentBatcher};
use arcml_core::{LabelScore, Result, TextItem};
use arcml_models::SequenceClassifier;
use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

struct ConstantClassifier {
    labels: Vec<String>,
}

#[async_trait]
impl SequenceClassifier for ConstantClassifier {
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Vec<LabelScore>>> {
        Ok(texts
            .iter()
            .map(|_| {
                vec![
                    LabelScore::new("LABEL_0", 0.1),
                    LabelScore::new("LABEL_1", 0.2),
                    LabelScore::new("LABEL_2", 0.7),
                ]
            })
            .collect())
    }

    fn name(&self) -> &str {
        "constant"
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

fn benchmark_sentiment_batcher(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let classifier = Arc::new(ConstantClassifier {
        labels: vec!["LABEL_0".into(), "LABEL_1".into(), "LABEL_2".into()],
    });

    let mut group = c.benchmark_group("SentimentBatcher");
    group.sample_size(50);

    for (size, batch) in [(100usize, 1000usize), (1000, 1000), (5000, 1000), (5000, 250)] {
        let batcher = SentimentBatcher::new(
            classifier.clone(),
            BatchSettings {
                max_batch_size: batch,
                max_text_length: 512,
            },
        );
        let items: Vec<TextItem> = (0..size)
            .map(|i| TextItem::new(format!("comment {i}: ").repeat(40)))
            .collect();

        group.bench_with_input(
            BenchmarkId::new(format!("analyze_batch{batch}"), size),
            &items,
            |b, items| {
                b.iter(|| rt.block_on(async { batcher.analyze(black_box(items)).await }));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_sentiment_batcher);
criterion_main!(benches);
