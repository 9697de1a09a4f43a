//! Benchmarks do leitor de conteúdo e do planejador.
//!
//! Testa performance de:
//! - Extração do conteúdo principal de HTML
//! - Portão de qualidade
//! - Parsing da saída do planejador
//! - Portão de segurança de URLs
//!
//! Executar: `cargo bench --bench fetcher_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jandive::fetcher::{check_quality, extract_main_text, is_safe_url};
use jandive::tools::ParsedQueries;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HELPERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn create_test_page(paragraphs: usize) -> String {
    let body: String = (0..paragraphs)
        .map(|i| {
            format!(
                "<p>Paragraph {} explains how the async runtime schedules tasks across worker threads.</p>",
                i
            )
        })
        .collect();
    format!(
        "<html><head><style>p {{ color: red; }}</style><script>track()</script></head>\
         <body><header>Site</header><nav><a href=\"/\">Home</a></nav>\
         <main><article>{}</article></main>\
         <aside>Related</aside><footer>Footer</footer></body></html>",
        body
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK: Extração de Conteúdo
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn bench_extract_main_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_main_text");

    for paragraphs in [10, 100, 1000] {
        let page = create_test_page(paragraphs);
        group.throughput(Throughput::Bytes(page.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(paragraphs), &page, |bencher, page| {
            bencher.iter(|| black_box(extract_main_text(page)))
        });
    }

    // Página sem contêiner semântico (cai no body)
    let bare = format!("<html><body>{}</body></html>", "<div>text block</div>".repeat(200));
    group.bench_function("body_fallback", |bencher| {
        bencher.iter(|| black_box(extract_main_text(&bare)))
    });

    group.finish();
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK: Portão de Qualidade
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn bench_check_quality(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_quality");

    let clean = "Tokio provides a multi-threaded scheduler for asynchronous tasks. ".repeat(30);
    let boilerplate = format!("{} Read our cookie policy.", clean);

    group.bench_function("clean_2k", |bencher| {
        bencher.iter(|| black_box(check_quality(&clean, 100)))
    });
    group.bench_function("boilerplate_2k", |bencher| {
        bencher.iter(|| black_box(check_quality(&boilerplate, 100)))
    });

    group.finish();
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK: Saída do Planejador
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn bench_planner_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("planner_parsing");

    let inputs = [
        ("json", r#"["rust async runtime", "tokio scheduler design", "work stealing"]"#),
        ("quoted", r#"Here you go: "rust async runtime", "tokio scheduler design""#),
        ("delimited", "rust async runtime; tokio scheduler design\nwork stealing"),
    ];

    for (name, raw) in inputs {
        group.bench_function(name, |bencher| {
            bencher.iter(|| black_box(ParsedQueries::parse(raw).into_candidates()))
        });
    }

    group.finish();
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK: Portão de Segurança
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn bench_is_safe_url(c: &mut Criterion) {
    let urls = vec![
        "https://doc.rust-lang.org/book/",
        "http://192.168.1.1/admin",
        "http://localhost:8080/api",
        "ftp://files.example.com/",
        "http://[::1]/",
        "not a url",
    ];

    c.bench_function("is_safe_url_batch", |bencher| {
        bencher.iter(|| {
            let results: Vec<_> = urls.iter().map(|url| is_safe_url(url)).collect();
            black_box(results)
        })
    });
}

criterion_group!(
    benches,
    bench_extract_main_text,
    bench_check_quality,
    bench_planner_parsing,
    bench_is_safe_url,
);

criterion_main!(benches);
