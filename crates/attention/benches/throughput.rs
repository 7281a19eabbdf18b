use attention::{subsequent_mask, Config, MultiHeadAttention};
use candle_core::{Device, Tensor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use layers::{ParamInit, TrainingMode};

fn bench_multi_head(c: &mut Criterion) {
    let device = Device::Cpu;
    let batch = 2usize;
    let d_model = 256usize;
    let heads = 8usize;
    let mode = TrainingMode::new(false);

    let mut group = c.benchmark_group("multi_head/f32");
    for &seq_len in &[16usize, 64, 256] {
        let mut init = ParamInit::new(0, &device);
        let mha = MultiHeadAttention::new(Config::new(d_model, heads), &mut init, &mode)
            .expect("attention");
        let input = Tensor::randn(0f32, 1.0, (batch, seq_len, d_model), &device).expect("input");
        let mask = subsequent_mask(&device, seq_len).expect("mask");

        group.throughput(Throughput::Elements((batch * seq_len) as u64));
        group.bench_with_input(
            BenchmarkId::new("causal_self_attention", seq_len),
            &(input, mask),
            |b, (input, mask)| {
                b.iter(|| {
                    let out = mha
                        .forward(black_box(input), input, input, Some(mask))
                        .expect("forward");
                    black_box(out.output);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_multi_head);
criterion_main!(benches);
