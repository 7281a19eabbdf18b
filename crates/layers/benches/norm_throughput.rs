use candle_core::{Device, Tensor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use layers::{
    dropout::TrainingMode,
    init::ParamInit,
    norm::{LayerNorm, NormConfig},
    residual::SublayerConnection,
    LayerError,
};

fn bench_norms(c: &mut Criterion) {
    let device = Device::Cpu;
    let batch = 8usize;
    let seq = 32usize;
    let hidden_sizes = &[256usize, 512, 1024];
    let mode = TrainingMode::new(false);

    let mut group = c.benchmark_group("norm/f32");
    for &hidden in hidden_sizes {
        let input = Tensor::randn(0f32, 1.0, (batch, seq, hidden), &device).expect("input");
        let mut init = ParamInit::new(0, &device);
        let layer_norm = LayerNorm::with_init(NormConfig::new(hidden), &init).expect("layer norm");
        let residual = SublayerConnection::new(NormConfig::new(hidden), 0.1, &mut init, &mode)
            .expect("residual");

        group.throughput(Throughput::Elements((batch * seq * hidden) as u64));

        group.bench_with_input(
            BenchmarkId::new("layer_norm", hidden),
            &(layer_norm, input.clone()),
            |b, (norm, input)| {
                b.iter(|| {
                    let out = norm.forward(black_box(input)).expect("forward");
                    black_box(out);
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("sublayer_identity", hidden),
            &(residual, input),
            |b, (residual, input)| {
                b.iter(|| {
                    let out = residual
                        .forward(black_box(input), |normed| Ok::<_, LayerError>(normed.clone()))
                        .expect("forward");
                    black_box(out);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_norms);
criterion_main!(benches);
