//! Benchmarks for the render and sync paths
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;
use tokio::sync::mpsc;
use widget_relay::render::{distribute_widths, ColumnPolicy, ForwardMsg, Node, RenderInstruction};
use widget_relay::sync::{ChannelSink, WidgetStateManager};
use widget_relay::widgets::{Source, WidgetValue};
use widget_relay::{App, Config};

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let policy = ColumnPolicy::default();

    for columns in [2, 12, 48] {
        let weights: Vec<f64> = (1..=columns).map(f64::from).collect();
        group.bench_function(format!("distribute_{}", columns), |b| {
            b.iter(|| distribute_widths(black_box(&weights), black_box(1200), &policy))
        });
    }

    group.finish();
}

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush");

    for size in [10, 100, 1000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("flush_{}", size), |b| {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let mut widgets = WidgetStateManager::new(ChannelSink::new(tx));
            for i in 0..size {
                widgets.set_value(format!("w{}", i), WidgetValue::Int(i), Source::programmatic());
            }

            b.iter(|| {
                widgets.set_value("w0", WidgetValue::Int(black_box(1)), Source::ui());
                while rx.try_recv().is_ok() {}
            });
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    let leaves: Vec<Node> = (0..100)
        .map(|i| Node::element(json!({"type": "slider", "id": format!("s{}", i), "min": 0, "max": 10, "default": [5]})))
        .collect();

    group.throughput(Throughput::Elements(leaves.len() as u64));
    group.bench_function("run_100_sliders", |b| {
        let (back_tx, _back_rx) = mpsc::unbounded_channel();
        let (frame_tx, _frame_rx) = mpsc::unbounded_channel();
        let mut app = App::new(&Config::default(), ChannelSink::new(back_tx), frame_tx);
        let mut run = 0u64;

        b.iter(|| {
            run += 1;
            let run_id = format!("r{}", run);
            app.handle_forward_msg(ForwardMsg::ScriptStarted { run_id: run_id.clone() });
            for (index, leaf) in leaves.iter().enumerate() {
                app.handle_forward_msg(ForwardMsg::Delta(RenderInstruction {
                    run_id: run_id.clone(),
                    path: vec![index],
                    node: leaf.clone(),
                }));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_layout, bench_flush, bench_dispatch);
criterion_main!(benches);
