use criterion::{black_box, criterion_group, criterion_main, Criterion};
use eventpump::messaging::{InMemoryTransport, Payload, SequencedPayloads};
use eventpump::producer::{plan, CancellationSignal, CapacityProbe, EventProducer};

const ONE_MIB: usize = 1_048_576;

fn benchmark_plan(c: &mut Criterion) {
    c.bench_function("plan_1m_events", |b| {
        b.iter(|| plan(black_box(1_000_000), black_box(1048)))
    });
}

fn benchmark_probe(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let payload = Payload::sample(1000);

    c.bench_function("probe_1kb_payload", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut transport = InMemoryTransport::new(ONE_MIB);
                CapacityProbe::default()
                    .discover(&mut transport, black_box(&payload))
                    .await
            })
        })
    });
}

fn benchmark_send_session(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let payloads = SequencedPayloads::new(1000);
    let producer = EventProducer::new();

    c.bench_function("send_10k_events", |b| {
        b.iter(|| {
            runtime.block_on(async {
                producer
                    .send_events(
                        InMemoryTransport::new(ONE_MIB),
                        black_box(10_000),
                        &payloads,
                        &CancellationSignal::new(),
                    )
                    .await
            })
        })
    });
}

criterion_group!(benches, benchmark_plan, benchmark_probe, benchmark_send_session);
criterion_main!(benches);
