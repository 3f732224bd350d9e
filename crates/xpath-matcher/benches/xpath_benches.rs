use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use xpath_matcher::model::simple::{SimpleNode, attr, doc, elem, text};
use xpath_matcher::{XPathCache, compile, compile_uncached, matches};

const EXPRESSIONS: &[&str] = &[
    "/html/body/section/div",
    "//div[@class='content']/p",
    "//section[@id]/div[position() < 5]",
    "/html/body/section/div/p/../span",
    "//p[contains(text(), 'Content')]",
    "count(//span) > 3",
    "(//div)[2]",
];

fn create_document() -> SimpleNode {
    let mut body = elem("body");
    for i in 0..50 {
        let mut section = elem("section").attr(attr("id", &format!("section-{i}")));
        for j in 0..10 {
            section = section.child(
                elem("div")
                    .attr(attr("class", "content"))
                    .child(elem("p").child(text(&format!("Content paragraph {j} in section {i}"))))
                    .child(elem("span").attr(attr("class", "highlight"))),
            );
        }
        body = body.child(section);
    }
    doc().child(elem("html").child(elem("head")).child(body)).build()
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compiler");
    for expr in EXPRESSIONS {
        group.bench_with_input(BenchmarkId::new("compile_uncached", expr), expr, |b, expr| {
            b.iter(|| compile_uncached(black_box(expr)).is_ok());
        });
    }
    group.finish();

    let mut group = c.benchmark_group("cache");
    let cache = XPathCache::default();
    for expr in EXPRESSIONS {
        let _ = cache.get_or_compile(expr);
        group.bench_with_input(BenchmarkId::new("compile_hit", expr), expr, |b, expr| {
            b.iter(|| cache.get_or_compile(black_box(expr)).is_ok());
        });
    }
    group.finish();
}

fn bench_match(c: &mut Criterion) {
    let document = create_document();
    let cursors: Vec<_> = ["p", "span", "div"]
        .iter()
        .flat_map(|name| document.find_all(name).into_iter().take(20))
        .map(|n| n.cursor())
        .collect();

    let mut group = c.benchmark_group("matcher");
    for expr in EXPRESSIONS {
        let Ok(compiled) = compile(expr) else { continue };
        group.bench_with_input(BenchmarkId::new("matches", expr), &compiled, |b, compiled| {
            b.iter(|| cursors.iter().filter(|cur| matches(compiled, black_box(cur))).count());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_match);
criterion_main!(benches);
