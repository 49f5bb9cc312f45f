//! Benchmark for whole-pipeline source-to-srcML throughput.

use criterion::{Criterion, Throughput};
use srcml_core::srcml::detect::LanguageRegistry;
use srcml_core::srcml::{Options, translate_unit};

struct Fixture {
    name: String,
    source: String,
    language: srcml_core::srcml::Language,
}

fn scan_fixtures() -> Vec<Fixture> {
    let dir = "tests/fixtures/srcml";
    let registry = LanguageRegistry::new();

    std::fs::read_dir(dir)
        .expect("failed to read fixtures directory")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            let language = registry.language_for_filename(&name)?;
            let source = std::fs::read_to_string(&path).expect("failed to read fixture file");
            Some(Fixture { name, source, language })
        })
        .collect()
}

fn bench_translate_unit(c: &mut Criterion) {
    let fixtures = scan_fixtures();
    let mut group = c.benchmark_group("translate_unit");

    for fixture in &fixtures {
        group.throughput(Throughput::Bytes(fixture.source.len() as u64));
        group.bench_function(&fixture.name, |b| {
            b.iter(|| translate_unit(std::hint::black_box(&fixture.source), std::hint::black_box(fixture.language), std::hint::black_box(&Options::default())));
        });
    }

    group.finish();
}

fn main() {
    let mut criterion = Criterion::default();
    bench_translate_unit(&mut criterion);
}
