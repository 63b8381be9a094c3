use abdm_integration_core::gateway::backoff::delay_for_attempt;
use abdm_integration_core::records::canonical::{canonicalize, checksum};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::time::Duration;

fn bench_checksum(c: &mut Criterion) {
    let resource = json!({
        "resourceType": "DiagnosticReport",
        "id": "bench-record",
        "status": "final",
        "code": { "coding": [{ "system": "LOINC", "code": "1234-5" }] },
        "subject": { "reference": "Patient/bench-patient" },
        "result": (0..20).map(|i| json!({ "reference": format!("Observation/{i}") })).collect::<Vec<_>>(),
    });

    c.bench_function("canonicalize_fhir_resource", |b| {
        b.iter(|| canonicalize(black_box(&resource)))
    });

    c.bench_function("checksum_fhir_resource", |b| {
        b.iter(|| checksum(black_box(&resource)))
    });
}

fn bench_backoff(c: &mut Criterion) {
    let base = Duration::from_millis(250);
    let cap = Duration::from_secs(8);

    c.bench_function("backoff_delay_for_attempt", |b| {
        b.iter(|| delay_for_attempt(black_box(3), base, black_box(2), cap))
    });
}

criterion_group!(benches, bench_checksum, bench_backoff);
criterion_main!(benches);
