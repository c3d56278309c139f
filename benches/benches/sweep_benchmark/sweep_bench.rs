//! Бенчмарки декодирования VRT и сборки спектра.
//!
//! Запуск: cargo bench -p wsa-benchmark

use std::{hint::black_box, io::Cursor, time::Duration};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use wsa_core::{ReadChannel, SpectrumAnalyzer, VrtPacketExt, VrtReader, VrtWriter};
use wsa_sweep::{plan, CaptureEngine};
use wsa_types::{
    IfData, ReceiverContext, RfeMode, SampleData, StreamId, VrtBody, VrtPacket, VrtTimestamp,
    VrtTrailer,
};

// ============================================================================
// Helpers
// ============================================================================

fn noise_i16(n: usize) -> Vec<i16> {
    // детерминированный LCG
    let mut state: u32 = 0x1234_5678;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 16) as i16 / 4
        })
        .collect()
}

fn data_body(spp: usize) -> VrtBody {
    VrtBody::IfData(IfData {
        samples: SampleData::I16(noise_i16(spp)),
        trailer: Some(VrtTrailer::new()),
    })
}

fn encoded_data_packet(spp: usize) -> Vec<u8> {
    let mut writer = VrtWriter::new(Vec::new());
    writer
        .write_packet(
            StreamId::IfDataI16,
            VrtTimestamp::new(1_700_000_000, 0),
            data_body(spp),
        )
        .unwrap();
    writer.into_inner()
}

// ============================================================================
// Декодирование
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("vrt_decode");

    for spp in [256usize, 1024, 8192, 32768] {
        let raw = encoded_data_packet(spp);
        group.throughput(Throughput::Bytes(raw.len() as u64));

        group.bench_with_input(BenchmarkId::new("if_data_i16", spp), &raw, |b, raw| {
            b.iter(|| VrtPacket::decode(black_box(raw)).unwrap())
        });
    }

    group.finish();
}

fn bench_reader_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("vrt_reader");

    let mut writer = VrtWriter::new(Vec::new());
    for step in 0..64u32 {
        writer
            .write_packet(
                StreamId::ReceiverContext,
                VrtTimestamp::new(1_700_000_000 + step, 0),
                VrtBody::Receiver(ReceiverContext {
                    frequency: Some(2.405e9 + step as f64 * 10e6),
                    ..Default::default()
                }),
            )
            .unwrap();
        writer
            .write_packet(
                StreamId::IfDataI16,
                VrtTimestamp::new(1_700_000_000 + step, 0),
                data_body(1024),
            )
            .unwrap();
    }
    let stream = writer.into_inner();
    group.throughput(Throughput::Bytes(stream.len() as u64));

    group.bench_function("sweep_128_packets", |b| {
        b.iter(|| {
            let mut reader = VrtReader::new(
                ReadChannel::new(Cursor::new(black_box(&stream))),
                Duration::from_secs(1),
            );
            reader.by_ref().filter_map(Result::ok).count()
        })
    });

    group.finish();
}

// ============================================================================
// Спектр
// ============================================================================

fn bench_spectrum(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectrum");

    for size in [256usize, 1024, 4096, 32768] {
        let samples = SampleData::I16(noise_i16(size));
        let mut analyzer = SpectrumAnalyzer::new(size).unwrap();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("window_fft", size), &samples, |b, s| {
            b.iter(|| {
                analyzer.process(black_box(s)).unwrap();
                analyzer.bin_power(size / 2)
            })
        });
    }

    group.finish();
}

fn bench_stitch(c: &mut Criterion) {
    let mut group = c.benchmark_group("capture");

    let template = plan(2_400_000_000, 2_500_000_000, 100_000.0, RfeMode::Shn).unwrap();
    let packets: Vec<VrtPacket> = template
        .entries
        .iter()
        .flat_map(|e| e.centers())
        .flat_map(|fc| {
            let raw_ctx = {
                let mut w = VrtWriter::new(Vec::new());
                w.write_packet(
                    StreamId::ReceiverContext,
                    VrtTimestamp::new(1_700_000_000, 0),
                    VrtBody::Receiver(ReceiverContext {
                        frequency: Some(fc as f64),
                        ..Default::default()
                    }),
                )
                .unwrap();
                w.into_inner()
            };
            let ctx = VrtPacket::decode(&raw_ctx).unwrap().0;
            let data = VrtPacket::decode(&encoded_data_packet(1024)).unwrap().0;
            [ctx, data]
        })
        .collect();

    group.bench_function("shn_2400_2500_100k", |b| {
        b.iter(|| {
            let mut cfg = template.clone();
            let mut engine = CaptureEngine::new(&cfg).unwrap();
            for p in &packets {
                engine.handle_packet(black_box(p), &mut cfg).unwrap();
            }
            cfg.unfilled_bins()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_decode,
    bench_reader_stream,
    bench_spectrum,
    bench_stitch
);
criterion_main!(benches);
