//! Performance benchmarks for the wslink hot paths.
//!
//! Run with: `cargo bench`

use std::io;

use bytes::BytesMut;
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use wslink::protocol::assembler::MessageAssembler;
use wslink::protocol::handshake::{HandshakeRequest, HandshakeResponse, compute_accept_key};
use wslink::protocol::mask::{apply_mask, apply_mask_fast};
use wslink::{Config, Connection, Frame, FrameCodec, Message, OpCode, TransportStream};

/// Transport that accepts and drops every write.
struct Sink;

impl TransportStream for Sink {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        black_box(data);
        Ok(())
    }

    fn end(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn server_bytes(frame: &Frame) -> BytesMut {
    let mut buf = BytesMut::with_capacity(frame.wire_size(false));
    frame.write(&mut buf, None);
    buf
}

fn connection() -> Connection<Sink> {
    let request = HandshakeRequest::new("localhost", "/").unwrap();
    let response = HandshakeResponse::for_request(&request);
    Connection::new(Sink, response, request, Config::default())
}

// =============================================================================
// Frame Parsing Benchmarks
// =============================================================================

fn bench_frame_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_parsing");

    for size in [10usize, 1024, 65536] {
        let bytes = server_bytes(&Frame::binary(vec![0xAB; size]));
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("parse_{size}b"), |b| {
            b.iter(|| Frame::parse(black_box(&bytes)))
        });
    }

    group.finish();
}

// =============================================================================
// Masking Benchmarks
// =============================================================================

fn bench_masking(c: &mut Criterion) {
    let mut group = c.benchmark_group("masking");
    let mask = [0x37, 0xfa, 0x21, 0x3d];

    // 64B, 1KB, 64KB, 1MB
    for size in [64usize, 1024, 65536, 1024 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(format!("apply_mask_{size}b"), |b| {
            let mut data = vec![0xAB; size];
            b.iter(|| apply_mask(black_box(&mut data), mask))
        });

        group.bench_function(format!("apply_mask_fast_{size}b"), |b| {
            let mut data = vec![0xAB; size];
            b.iter(|| apply_mask_fast(black_box(&mut data), mask))
        });
    }

    group.finish();
}

// =============================================================================
// Codec Benchmarks
// =============================================================================

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let config = Config::default();

    let text = server_bytes(&Frame::text("hello world".repeat(100)));
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("decode_text_1kb", |b| {
        let mut codec = FrameCodec::client(&config);
        b.iter(|| {
            codec.feed(black_box(&text));
            codec.next_decoded().unwrap()
        })
    });

    // 10 fragments, fed in 512 byte reads
    let mut fragmented = BytesMut::new();
    for i in 0..10 {
        let opcode = if i == 0 {
            OpCode::Binary
        } else {
            OpCode::Continuation
        };
        Frame::new(i == 9, opcode, vec![0xAB; 6554]).write(&mut fragmented, None);
    }
    group.throughput(Throughput::Bytes(fragmented.len() as u64));
    group.bench_function("decode_fragmented_64kb", |b| {
        let mut codec = FrameCodec::client(&config);
        b.iter(|| {
            let mut out = None;
            for chunk in fragmented.chunks(512) {
                codec.feed(chunk);
                while let Some(decoded) = codec.next_decoded().unwrap() {
                    out = Some(decoded);
                }
            }
            black_box(out)
        })
    });

    let frame = Frame::binary(vec![0xAB; 65536]);
    group.throughput(Throughput::Bytes(65536));
    group.bench_function("encode_masked_64kb", |b| {
        let mut codec = FrameCodec::client(&config);
        b.iter(|| codec.encode(black_box(&frame), true))
    });

    group.finish();
}

// =============================================================================
// Handshake Benchmarks
// =============================================================================

fn bench_handshake(c: &mut Criterion) {
    let mut group = c.benchmark_group("handshake");

    let key = "dGhlIHNhbXBsZSBub25jZQ==";
    group.bench_function("compute_accept_key", |b| {
        b.iter(|| compute_accept_key(black_box(key)))
    });

    let request = HandshakeRequest::new("server.example.com", "/chat").unwrap();
    group.bench_function("write_request", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(256);
            request.write(&mut buf).unwrap();
            black_box(buf)
        })
    });

    let accept = request.expected_accept();
    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\
         \r\n"
    );
    group.bench_function("parse_and_verify_response", |b| {
        b.iter(|| {
            let resp = HandshakeResponse::parse(black_box(response.as_bytes())).unwrap();
            resp.verify(&request)
        })
    });

    group.finish();
}

// =============================================================================
// Message Reassembly Benchmarks
// =============================================================================

fn bench_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassembly");
    let limits = Config::default().limits;

    group.throughput(Throughput::Bytes(65536));
    group.bench_function("single_frame_64kb", |b| {
        let frame = Frame::binary(vec![0xAB; 65536]);
        b.iter(|| {
            let mut assembler = MessageAssembler::new(limits.clone());
            assembler.push(frame.clone()).unwrap()
        })
    });

    group.bench_function("10_fragments_64kb", |b| {
        b.iter(|| {
            let mut assembler = MessageAssembler::new(limits.clone());
            for i in 0..9 {
                let opcode = if i == 0 {
                    OpCode::Binary
                } else {
                    OpCode::Continuation
                };
                assembler
                    .push(Frame::new(false, opcode, vec![0xAB; 6554]))
                    .unwrap();
            }
            assembler
                .push(Frame::new(true, OpCode::Continuation, vec![0xAB; 6554]))
                .unwrap()
        })
    });

    group.finish();
}

// =============================================================================
// Connection Benchmarks
// =============================================================================

fn bench_connection(c: &mut Criterion) {
    let mut group = c.benchmark_group("connection");

    let ping = server_bytes(&Frame::ping(&b"keepalive"[..]));
    group.bench_function("ping_pong_roundtrip", |b| {
        let mut conn = connection();
        b.iter(|| conn.on_data(black_box(&ping)))
    });

    let message = server_bytes(&Frame::binary(vec![0xAB; 4096]));
    group.throughput(Throughput::Bytes(4096));
    group.bench_function("dispatch_message_4kb", |b| {
        let mut conn = connection();
        conn.on_message(|msg, _| {
            black_box(msg);
        });
        b.iter(|| conn.on_data(black_box(&message)))
    });

    group.bench_function("send_binary_4kb", |b| {
        let mut conn = connection();
        let payload = vec![0xAB; 4096];
        b.iter(|| conn.send(Message::binary(black_box(payload.clone()))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_parsing,
    bench_masking,
    bench_codec,
    bench_handshake,
    bench_reassembly,
    bench_connection
);

criterion_main!(benches);
