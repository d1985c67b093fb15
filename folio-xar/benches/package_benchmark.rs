use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio_core::DocumentKey;
use folio_store::Wiki;
use folio_xar::{decode_document, encode_document, Charset, ExportOptions, Exporter, Importer, InstallContext};

fn seeded_wiki(count: usize) -> (Wiki, Vec<DocumentKey>) {
    let wiki = Wiki::in_memory();
    let content = "lorem ipsum ".repeat(100);
    let keys: Vec<DocumentKey> = (0..count)
        .map(|i| DocumentKey::new("Bench", format!("Page{i}")))
        .collect();
    for key in &keys {
        let mut doc = wiki.load(key).unwrap();
        doc.content = content.clone();
        wiki.save(&mut doc, "seed").unwrap();
    }
    (wiki, keys)
}

fn bench_entry_codec(c: &mut Criterion) {
    let (wiki, keys) = seeded_wiki(1);
    let doc = wiki.load(&keys[0]).unwrap();
    let latin = Charset::iso_8859_1();
    let bytes = encode_document(&doc, &latin).unwrap();

    c.bench_function("entry_encode_latin1_1KB", |b| {
        b.iter(|| black_box(encode_document(&doc, &latin).unwrap()))
    });
    c.bench_function("entry_decode_latin1_1KB", |b| {
        b.iter(|| black_box(decode_document(&bytes).unwrap()))
    });
}

fn bench_export_import_100(c: &mut Criterion) {
    let (wiki, keys) = seeded_wiki(100);
    let options = ExportOptions::default();
    let archive = Exporter::new(&wiki).export_archive(&keys, &options).unwrap();

    c.bench_function("export_100_docs", |b| {
        b.iter(|| black_box(Exporter::new(&wiki).export_archive(&keys, &options).unwrap()))
    });
    c.bench_function("import_100_docs", |b| {
        b.iter(|| black_box(Importer::new().import_archive(&archive).unwrap()))
    });
    c.bench_function("import_install_100_docs", |b| {
        b.iter(|| {
            let target = Wiki::in_memory();
            let package = Importer::new().import_archive(&archive).unwrap();
            black_box(package.install(&target, &InstallContext::new("Bench")))
        })
    });
}

criterion_group!(benches, bench_entry_codec, bench_export_import_100);
criterion_main!(benches);
