/// Benchmarks for section extraction and indexing throughput
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use section_rag::config::Config;
use section_rag::extractor::Extractor;
use section_rag::{AnalyzeRequest, RagClient};
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Helper to create a mixed tree of stylesheets and components
fn create_test_files(dir: &TempDir, count: usize) -> anyhow::Result<()> {
    let styles = dir.path().join("styles");
    let components = dir.path().join("components");
    std::fs::create_dir_all(&styles)?;
    std::fs::create_dir_all(&components)?;

    for i in 0..count {
        let css = format!(
            r#".card-{i} {{
  padding: {i}px;
  border: 1px solid #ccc;
}}

#header-{i} {{
  height: 64px;
}}

@keyframes fade-{i} {{
  from {{ opacity: 0; }}
  to {{ opacity: 1; }}
}}
"#
        );
        std::fs::write(styles.join(format!("module_{}.css", i)), css)?;

        let jsx = format!(
            r#"import React from 'react';

export const Panel{i} = ({{ title }}) => {{
  return <div className="panel">{{title}}</div>;
}};

export function usePanel{i}(value) {{
  return value * {i};
}}
"#
        );
        std::fs::write(components.join(format!("Panel{}.jsx", i)), jsx)?;
    }

    Ok(())
}

fn benchmark_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");

    for file_count in [10, 50, 100].iter() {
        let tree = TempDir::new().unwrap();
        create_test_files(&tree, *file_count).unwrap();
        let extractor = Extractor::new(Config::default().extraction).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", file_count * 2)),
            file_count,
            |b, _| {
                b.iter(|| extractor.extract_tree(black_box(tree.path())).unwrap());
            },
        );
    }

    group.finish();
}

fn benchmark_indexing(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("indexing");
    group.sample_size(10);

    for file_count in [10, 50].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", file_count * 2)),
            file_count,
            |b, &count| {
                b.iter(|| {
                    rt.block_on(async {
                        let tree = TempDir::new().unwrap();
                        let state = TempDir::new().unwrap();
                        create_test_files(&tree, count).unwrap();

                        let mut config = Config::default();
                        config.vector_db.backend = "memory".to_string();
                        config.embedding.provider = "hashed".to_string();
                        config.locks.lock_dir = state.path().join("locks");

                        let client = RagClient::with_config(config).await.unwrap();
                        client
                            .analyze_repository(AnalyzeRequest {
                                repo: "bench/tree".to_string(),
                                path: tree.path().to_string_lossy().to_string(),
                                force_refresh: false,
                            })
                            .await
                            .unwrap()
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_extraction, benchmark_indexing);
criterion_main!(benches);
