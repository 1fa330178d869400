//! Benchmarks for diagram detection and placeholder substitution.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pagemaid::diagram::{detect, replace_all};
use pagemaid::dom::Document;

fn chapter_html(sections: usize) -> String {
    let mut html = String::from("<html><body>");
    for i in 0..sections {
        html.push_str(&format!("<h2>Section {i}</h2><p>Body text for section {i}.</p>"));
        html.push_str(
            "<div class=\"language-mermaid highlighter-rouge\"><div class=\"highlight\">\
             <pre class=\"highlight\"><code>flowchart LR\nA--&gt;B\n</code></pre></div></div>",
        );
        html.push_str("<pre><code>sequenceDiagram\nA-&gt;&gt;B: hi</code></pre>");
        html.push_str("<pre><code class=\"language-rust\">fn main() {}</code></pre>");
    }
    html.push_str("</body></html>");
    html
}

fn bench_parse_page(c: &mut Criterion) {
    let html = chapter_html(50);
    c.bench_function("parse_page", |b| {
        b.iter(|| Document::parse(black_box(&html)).unwrap())
    });
}

fn bench_detect(c: &mut Criterion) {
    let doc = Document::parse(&chapter_html(50)).unwrap();
    c.bench_function("detect", |b| b.iter(|| detect(black_box(&doc))));
}

fn bench_detect_and_replace(c: &mut Criterion) {
    let doc = Document::parse(&chapter_html(50)).unwrap();
    c.bench_function("detect_and_replace", |b| {
        b.iter(|| {
            let mut doc = doc.clone();
            let blocks = detect(&doc);
            replace_all(&mut doc, &blocks).len()
        })
    });
}

criterion_group!(
    benches,
    bench_parse_page,
    bench_detect,
    bench_detect_and_replace
);
criterion_main!(benches);
