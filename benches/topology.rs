use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use vlan_topology::ir::Position;
use vlan_topology::{TopologyEditor, parse_script, resync};

/// A chain of switches joined on their uplinks, with every access port
/// holding a terminal.
fn rack_script(switches: usize) -> String {
    let mut out = String::new();
    for _ in 0..switches {
        out.push_str("switch\n");
    }
    for i in 1..switches {
        out.push_str(&format!(
            "cable sw-{} 17 sw-{} 18 direction=a-to-b\n",
            i,
            i + 1
        ));
    }
    for i in 1..=switches {
        for port in 1..=16 {
            let direction = ["both", "a-to-b", "b-to-a"][port % 3];
            out.push_str(&format!("attach sw-{i} {port} direction={direction}\n"));
        }
    }
    out
}

fn build_editor(switches: usize) -> TopologyEditor {
    let script = parse_script(&rack_script(switches)).expect("script parse failed");
    let mut editor = TopologyEditor::default();
    for line in &script {
        editor.apply(&line.intent).expect("intent rejected");
    }
    editor
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_script");
    for switches in [4usize, 16, 64] {
        let input = rack_script(switches);
        group.bench_with_input(BenchmarkId::from_parameter(switches), &input, |b, data| {
            b.iter(|| {
                let lines = parse_script(black_box(data)).expect("parse failed");
                black_box(lines.len());
            });
        });
    }
    group.finish();
}

fn bench_resync(c: &mut Criterion) {
    let mut group = c.benchmark_group("resync");
    for switches in [4usize, 16, 64] {
        let editor = build_editor(switches);
        group.bench_with_input(
            BenchmarkId::from_parameter(switches),
            editor.topology(),
            |b, topology| {
                b.iter(|| {
                    let mut draft = topology.clone();
                    black_box(resync(black_box(&mut draft)));
                });
            },
        );
    }
    group.finish();
}

fn bench_drop(c: &mut Criterion) {
    let mut group = c.benchmark_group("drop_terminal");
    for switches in [4usize, 16, 64] {
        let mut editor = build_editor(switches);
        let term = editor.add_free_terminal();
        group.bench_function(BenchmarkId::from_parameter(switches), |b| {
            b.iter(|| {
                let decision = editor
                    .drop_terminal(&term, black_box(Position::new(400.0, 400.0)))
                    .expect("drop failed");
                black_box(decision);
                editor.undo();
            });
        });
    }
    group.finish();
}

fn bench_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("undo_redo");
    for switches in [4usize, 16] {
        let mut editor = build_editor(switches);
        group.bench_function(BenchmarkId::from_parameter(switches), |b| {
            b.iter(|| {
                black_box(editor.undo());
                black_box(editor.redo());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_resync, bench_drop, bench_history);
criterion_main!(benches);
