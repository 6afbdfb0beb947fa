//! Benchmarks for the message codec.
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::net::Ipv4Addr;

use fanout::dns::{Flags, Header, Message, Name, Question, ResourceRecord};

fn create_dns_query(query_id: u16, domains: &[&str]) -> Vec<u8> {
    let questions = domains
        .iter()
        .map(|d| Question::new(d.parse().unwrap(), 1, 1))
        .collect();
    Message {
        header: Header::new(query_id, Flags::query()),
        questions,
        answers: Vec::new(),
    }
    .to_bytes()
}

/// Reply whose question and answer names are all pointers after the first.
fn create_compressed_reply(answers: u8) -> Vec<u8> {
    let mut packet = create_dns_query(0x1234, &["www.example.com"]);
    packet[2] = 0x81;
    packet[3] = 0x80;
    packet[7] = answers;
    for i in 0..answers {
        packet.extend_from_slice(&[0xc0, 0x0c]); // Name pointer
        packet.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]); // A IN
        packet.extend_from_slice(&[0x00, 0x00, 0x00, 0x3c]); // TTL: 60
        packet.extend_from_slice(&[0x00, 0x04, 10, 0, 0, i]);
    }
    packet
}

fn bench_decode(c: &mut Criterion) {
    let query = create_dns_query(0x1234, &["example.com"]);
    let multi = create_dns_query(0x1234, &["a.example.com", "b.example.org", "c.example.net"]);
    let reply = create_compressed_reply(8);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function(BenchmarkId::new("parse_query", "one_question"), |b| {
        b.iter(|| Message::parse_query(black_box(&query)))
    });
    group.bench_function(BenchmarkId::new("parse_query", "three_questions"), |b| {
        b.iter(|| Message::parse_query(black_box(&multi)))
    });
    group.bench_function(BenchmarkId::new("parse", "compressed_reply"), |b| {
        b.iter(|| Message::parse(black_box(&reply)))
    });

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let name: Name = "www.example.com".parse().unwrap();
    let response = Message {
        header: Header::new(0x1234, Flags::response(0, true, 0)),
        questions: vec![Question::new(name.clone(), 1, 1)],
        answers: (0..8)
            .map(|i| ResourceRecord::a(name.clone(), Ipv4Addr::new(10, 0, 0, i), 60))
            .collect(),
    };

    c.bench_function("encode_response", |b| {
        b.iter(|| black_box(&response).to_bytes())
    });
}

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
