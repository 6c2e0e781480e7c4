use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rekeg::cellar::{Keg, compare_versions};
use rekeg::closure::build_closure;
use rekeg::dependents;
use rekeg::formula::{BottleRef, Formula, Formulary, Registry};
use std::path::PathBuf;

/// A layered graph: every formula depends on the whole layer below it
fn layered_formulary(layers: usize, width: usize) -> Formulary {
    let mut formulary = Formulary::new();
    for layer in 0..layers {
        for i in 0..width {
            let name = format!("f{layer}_{i}");
            let deps: Vec<String> = if layer == 0 {
                vec![]
            } else {
                (0..width).map(|j| format!("f{}_{j}", layer - 1)).collect()
            };
            formulary.insert(
                Formula::new(&name)
                    .with_dependencies(deps)
                    .outdated(true)
                    .with_bottle(BottleRef::new(&name, "1.1", 0, "all", None))
                    .with_keg(Keg::new(&name, "1.0", PathBuf::from(format!("/tmp/{name}")))),
            );
        }
    }
    formulary
}

fn bench_build_closure(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_closure");

    for (layers, width) in [(4, 4), (8, 8), (16, 16)] {
        let formulary = layered_formulary(layers, width);
        let top = format!("f{}_0", layers - 1);
        let Some(target) = formulary.get(&top) else {
            continue;
        };
        let targets = vec![target];

        group.bench_with_input(
            BenchmarkId::new("with_dependents", layers * width),
            &targets,
            |b, targets| b.iter(|| build_closure(&formulary, black_box(targets), true).len()),
        );
        group.bench_with_input(
            BenchmarkId::new("targets_only", layers * width),
            &targets,
            |b, targets| b.iter(|| build_closure(&formulary, black_box(targets), false).len()),
        );
    }

    group.finish();
}

fn bench_dependent_plan(c: &mut Criterion) {
    let formulary = layered_formulary(8, 8);
    c.bench_function("dependent plan", |b| {
        b.iter(|| dependents::plan(&formulary, black_box(&["f0_0"])).upgrade.len())
    });
}

fn bench_compare_versions(c: &mut Criterion) {
    let pairs = [
        ("1.2.3", "1.2.4"),
        ("3.3.2_1", "3.3.2"),
        ("2024.10.01", "2024.9.30"),
        ("1.0", "1.0.0"),
    ];

    c.bench_function("compare_versions", |b| {
        b.iter(|| {
            for (a, v) in &pairs {
                let _ = compare_versions(black_box(a), black_box(v));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_build_closure,
    bench_dependent_plan,
    bench_compare_versions
);
criterion_main!(benches);
