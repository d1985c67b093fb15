use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio_core::{Document, DocumentKey, DocumentObject, Version, VersionPolicy};

fn bench_full_name_parse(c: &mut Criterion) {
    let full = DocumentKey::new("Dotted.Space.Name", "WebHome").full_name();

    c.bench_function("full_name_parse", |b| {
        b.iter(|| {
            black_box(DocumentKey::from_full_name(black_box(&full), "fr").unwrap());
        })
    });
}

fn bench_merge_objects(c: &mut Criterion) {
    let mut target = Document::new(DocumentKey::new("Main", "Page"));
    target.version = Version::INITIAL;
    target.mark_persisted("memory");
    for i in 0..100 {
        target.objects.push(DocumentObject::new("Class", i).with_property("v", "old"));
    }
    let mut incoming = Document::new(DocumentKey::new("Main", "Page"));
    for i in 50..150 {
        incoming.objects.push(DocumentObject::new("Class", i).with_property("v", "new"));
    }

    c.bench_function("merge_100_objects", |b| {
        b.iter(|| {
            let mut t = target.clone();
            t.merge_from(black_box(&incoming));
            black_box(t);
        })
    });
}

fn bench_version_policy(c: &mut Criterion) {
    let policy = VersionPolicy::default();

    c.bench_function("version_next", |b| {
        b.iter(|| black_box(policy.next(black_box(Version::new(3, 7)), black_box(false))))
    });
}

criterion_group!(benches, bench_full_name_parse, bench_merge_objects, bench_version_policy);
criterion_main!(benches);
