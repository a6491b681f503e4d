use brief_core::reconcile::reconcile;
use brief_core::score::completion_score;
use brief_core::types::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn funnel(prefix: &str, n: usize) -> Vec<FunnelElement> {
    (0..n)
        .map(|i| FunnelElement::new(format!("{} stage {}", prefix, i), "Client books a discovery call"))
        .collect()
}

fn current_state(stages: usize) -> BriefingState {
    BriefingState {
        utp: Some("Hand-roasted coffee delivered within 24 hours".to_string()),
        product_description: Some("Subscription service for specialty coffee beans roasted to order".to_string()),
        funnel_elements: funnel("Existing", stages),
        ..Default::default()
    }
    .refreshed()
}

fn bench_reconcile_small(c: &mut Criterion) {
    let current = current_state(5);
    let incoming = ExtractionResult {
        utp: Some("Fresh coffee, roasted the day it ships, delivered overnight".to_string()),
        product_description: None,
        funnel_elements: Some(funnel("Existing", 3)),
        succeeded: true,
        failure: None,
    };

    c.bench_function("reconcile 5 stages", |b| {
        b.iter(|| reconcile(black_box(&current), black_box(&incoming)));
    });
}

fn bench_reconcile_wide_funnel(c: &mut Criterion) {
    let current = current_state(200);
    let mut incoming_stages = funnel("Existing", 100);
    incoming_stages.extend(funnel("New", 100));
    let incoming = ExtractionResult {
        utp: None,
        product_description: None,
        funnel_elements: Some(incoming_stages),
        succeeded: true,
        failure: None,
    };

    c.bench_function("reconcile 200 stages + 200 incoming", |b| {
        b.iter(|| reconcile(black_box(&current), black_box(&incoming)));
    });
}

fn bench_completion_score(c: &mut Criterion) {
    let state = current_state(50);
    c.bench_function("completion score 50 stages", |b| {
        b.iter(|| completion_score(black_box(&state)));
    });
}

criterion_group!(
    benches,
    bench_reconcile_small,
    bench_reconcile_wide_funnel,
    bench_completion_score
);
criterion_main!(benches);
