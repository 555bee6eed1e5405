use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use goose_guard::decode_basics::decode_ethernet_header;
use goose_guard::decode_goose::{decode_goose_pdu, is_goose_frame};
use goose_guard::encode_goose::{encode_goose, goose_size};
use goose_guard::types::{EthernetHeader, GooseConfig, GooseRuntime, IECData, IECGoosePdu, Timestamp};

/// Create a sample GOOSE config with a realistic dataset size.
/// Typical GOOSE frames contain 50-200 data points; this approaches the
/// Ethernet MTU limit (~1500 bytes).
fn create_sample_config() -> GooseConfig {
    let mut all_data = vec![];

    // 40 circuit breaker positions
    for i in 0..40 {
        all_data.push(IECData::Boolean(i % 2 == 0));
    }

    // 50 disconnector positions
    for i in 0..50 {
        all_data.push(IECData::Boolean(i % 3 == 0));
    }

    // 50 analog values (current/voltage as Int32)
    for i in 0..50 {
        all_data.push(IECData::Int32(10000 + i * 1000));
    }

    // 50 quality/status values
    for i in 0..50 {
        all_data.push(IECData::Int32u(0xC000 + i as u32));
    }

    // 15 bays worth of structured status strings and measurements
    for bay in 1..=15 {
        all_data.push(IECData::VisibleString(format!("BAY_{:02}_CB_STATUS", bay)));
        all_data.push(IECData::Int32(13800 + bay * 10));
        all_data.push(IECData::Int32(450 + bay));
        all_data.push(IECData::Boolean(bay % 2 == 0));
    }

    GooseConfig {
        dst_addr: [0x01, 0x0c, 0xcd, 0x01, 0x00, 0x01],
        appid: [0x10, 0x01],
        tpid: Some([0x81, 0x00]),
        tci: Some([0x00, 0x01]),
        go_cb_ref: "SUBSTATION1/BAY_COMPLETE/LLN0$GO$gcb_full_status".to_string(),
        dat_set: "SUBSTATION1/BAY_COMPLETE/LLN0$DATASET_FULL_STATUS".to_string(),
        go_id: "GOOSE_SUBSTATION_COMPLETE_STATUS".to_string(),
        conf_rev: 128,
        nds_com: false,
        simulation: false,
        time_allowed_to_live_ms: 2000,
        all_data,
    }
}

fn create_sample_runtime() -> GooseRuntime {
    let mut runtime = GooseRuntime::new([0x00, 0x1a, 0xb6, 0x03, 0x2f, 0x1c]);
    runtime.st_num = 1;
    runtime.sq_num = 42;
    runtime.timestamp = Timestamp::from_bytes([0x20, 0x21, 0x06, 0x12, 0x0A, 0x30, 0x00, 0x00]);
    runtime
}

/// Encode a large GOOSE frame dynamically for benchmarking.
fn create_large_goose_packet() -> Vec<u8> {
    let config = create_sample_config();
    let runtime = create_sample_runtime();
    let (frame_len, ..) = goose_size(&config, &runtime);
    let mut buffer = vec![0u8; frame_len as usize];
    let written = encode_goose(&config, &runtime, &mut buffer).expect("encode large GOOSE packet");
    buffer.truncate(written);
    buffer
}

fn benchmark_goose_frame_detection(c: &mut Criterion) {
    let packet = create_large_goose_packet();

    println!("\n=== GOOSE Benchmark Packet Info ===");
    println!("Total packet size: {} bytes", packet.len());
    println!("Ethernet MTU limit: ~1500 bytes");
    println!(
        "Utilization: {:.1}%",
        (packet.len() as f64 / 1500.0) * 100.0
    );
    println!("===================================\n");

    c.bench_function("goose_frame_detection", |b| {
        b.iter(|| is_goose_frame(black_box(&packet)));
    });
}

fn benchmark_goose_pdu_decode(c: &mut Criterion) {
    let packet = create_large_goose_packet();
    let mut header = EthernetHeader::default();
    let pos = decode_ethernet_header(&mut header, &packet);

    c.bench_function("goose_pdu_decode", |b| {
        b.iter(|| {
            let mut pdu = IECGoosePdu::default();
            decode_goose_pdu(black_box(&mut pdu), black_box(&packet), black_box(pos))
        });
    });
}

fn benchmark_full_goose_decode(c: &mut Criterion) {
    let packet = create_large_goose_packet();

    c.bench_function("full_goose_decode", |b| {
        b.iter(|| {
            let mut header = EthernetHeader::default();
            let pos = decode_ethernet_header(black_box(&mut header), black_box(&packet));
            let mut pdu = IECGoosePdu::default();
            decode_goose_pdu(black_box(&mut pdu), black_box(&packet), black_box(pos))
        });
    });
}

fn benchmark_goose_pdu_encode(c: &mut Criterion) {
    let config = create_sample_config();
    let runtime = create_sample_runtime();
    let (frame_len, ..) = goose_size(&config, &runtime);

    c.bench_function("goose_pdu_encode", |b| {
        b.iter(|| {
            let mut buffer = vec![0u8; frame_len as usize];
            encode_goose(black_box(&config), black_box(&runtime), black_box(&mut buffer))
        });
    });
}

fn benchmark_encode_decode_roundtrip(c: &mut Criterion) {
    let config = create_sample_config();
    let runtime = create_sample_runtime();
    let (frame_len, ..) = goose_size(&config, &runtime);

    c.bench_function("goose_encode_decode_roundtrip", |b| {
        b.iter(|| {
            let mut buffer = vec![0u8; frame_len as usize];
            let written = encode_goose(black_box(&config), black_box(&runtime), black_box(&mut buffer))
                .unwrap();
            buffer.truncate(written);

            let mut header = EthernetHeader::default();
            let pos = decode_ethernet_header(black_box(&mut header), black_box(&buffer));
            let mut pdu = IECGoosePdu::default();
            decode_goose_pdu(black_box(&mut pdu), black_box(&buffer), black_box(pos))
        });
    });
}

fn benchmark_goose_with_different_data_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("goose_data_size");

    // Typical GOOSE: 10-200 data points; Ethernet MTU is ~1500 bytes.
    for num_elements in [10, 50, 100, 150, 200].iter() {
        let runtime = create_sample_runtime();
        let mut config = create_sample_config();

        config.all_data = (0..*num_elements)
            .map(|i| match i % 5 {
                0 => IECData::Boolean(i % 2 == 0),
                1 => IECData::Int32(i * 1000),
                2 => IECData::Int32u(0xC000 + i as u32),
                3 => IECData::Float32(i as f32 * 1.5),
                _ => IECData::VisibleString(format!("DATA_{:03}", i)),
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("encode", num_elements),
            num_elements,
            |b, _| {
                b.iter(|| {
                    let (frame_len, ..) = goose_size(&config, &runtime);
                    let mut buffer = vec![0u8; frame_len as usize];
                    encode_goose(black_box(&config), black_box(&runtime), black_box(&mut buffer))
                });
            },
        );
    }

    group.finish();
}

fn benchmark_goose_rates(c: &mut Criterion) {
    let packet = create_large_goose_packet();
    let mut group = c.benchmark_group("goose_packet_rates");

    // GOOSE typical rates (much slower than sampled values).
    for rate_hz in [50, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("decode_rate_Hz", rate_hz),
            rate_hz,
            |b, _| {
                b.iter(|| {
                    let mut header = EthernetHeader::default();
                    let pos = decode_ethernet_header(black_box(&mut header), black_box(&packet));
                    let mut pdu = IECGoosePdu::default();
                    decode_goose_pdu(black_box(&mut pdu), black_box(&packet), black_box(pos))
                });
            },
        );

        group.throughput(criterion::Throughput::Elements(*rate_hz as u64));
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_goose_frame_detection,
    benchmark_goose_pdu_decode,
    benchmark_full_goose_decode,
    benchmark_goose_pdu_encode,
    benchmark_encode_decode_roundtrip,
    benchmark_goose_with_different_data_sizes,
    benchmark_goose_rates
);
criterion_main!(benches);
