//! Throughput Benchmark for TaskPool
//!
//! This benchmark measures the dispatch path under various workloads:
//! the bare queue, the worker pool, and full round trips over TCP.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use taskpool::dispatch::{PoolConfig, QueueEntry, TaskQueue, WorkerPool};
use taskpool::protocol::{decode_request, Task, TaskKind, TaskRequest};
use taskpool::{Server, ServerConfig, TaskClient};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

/// Benchmark push/pop on an uncontended queue
fn bench_queue(c: &mut Criterion) {
    let rt = runtime();
    let queue = TaskQueue::new();

    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_try_pop", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let _receiver = queue.submit(Task::new(i.to_string(), TaskKind::Uppercase, "x"));
            black_box(queue.try_pop());
            i += 1;
        });
    });

    group.bench_function("push_pop_async", |b| {
        b.to_async(&rt).iter(|| async {
            let (entry, _receiver) = QueueEntry::task(Task::new("t", TaskKind::Reverse, "abc"));
            queue.push(entry);
            black_box(queue.pop(Duration::from_millis(10)).await);
        });
    });

    group.finish();
}

/// Benchmark request decoding
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("with_id", |b| {
        let line = br#"{"tarea_id":"abc-123","tipo":"contar","contenido":"the quick brown fox"}"#;
        b.iter(|| black_box(decode_request(line)));
    });

    group.bench_function("generated_id", |b| {
        let line = br#"{"tipo":"3","contenido":"the quick brown fox"}"#;
        b.iter(|| black_box(decode_request(line)));
    });

    group.finish();
}

/// Benchmark a batch of tasks through a worker pool, without the network
fn bench_pool(c: &mut Criterion) {
    let rt = runtime();

    let mut group = c.benchmark_group("pool");
    group.measurement_time(Duration::from_secs(10));

    for workers in [1usize, 4, 16] {
        let queue = Arc::new(TaskQueue::new());
        let _pool = rt.block_on(async {
            WorkerPool::start(
                Arc::clone(&queue),
                PoolConfig {
                    workers,
                    ..Default::default()
                },
            )
        });

        group.throughput(Throughput::Elements(256));
        group.bench_function(format!("256_tasks_{}_workers", workers), |b| {
            b.to_async(&rt).iter(|| async {
                let receivers: Vec<_> = (0..256)
                    .map(|i| {
                        queue.submit(Task::new(
                            i.to_string(),
                            TaskKind::WordCount,
                            "one two three four",
                        ))
                    })
                    .collect();
                for receiver in receivers {
                    black_box(receiver.await.unwrap());
                }
            });
        });
    }

    group.finish();
}

/// Benchmark full request/response round trips over TCP
fn bench_round_trip(c: &mut Criterion) {
    let rt = runtime();

    let addr = rt.block_on(async {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Default::default()
        };
        let server = Server::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run_until(std::future::pending()));
        addr
    });

    let mut group = c.benchmark_group("round_trip");
    group.throughput(Throughput::Elements(1));

    let client = rt.block_on(async { tokio::sync::Mutex::new(TaskClient::connect(addr).await.unwrap()) });
    let request = TaskRequest::new("reverse", "hello world");

    group.bench_function("single_connection", |b| {
        b.to_async(&rt).iter(|| async {
            let mut client = client.lock().await;
            black_box(client.submit(&request).await.unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_queue, bench_decode, bench_pool, bench_round_trip);

criterion_main!(benches);
