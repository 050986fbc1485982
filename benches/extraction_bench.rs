use base64::Engine as _;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sound_archiver::SoundExtractor;

fn listing_page(sounds: usize) -> String {
    let mut html = String::from("<html><body><div id=\"content\">");
    for i in 1..=sounds {
        let src = base64::engine::general_purpose::STANDARD.encode(format!("/sons/oss117/clip{}.mp3", i));
        html.push_str(&format!(
            r#"<div class="art-post">
                 <blockquote class="art-postheader">{:03} Réplique numéro {}</blockquote>
                 <div class="art-article"><p>Extrait</p><audio controls src="/{}"></audio></div>
               </div>"#,
            i, i, src
        ));
    }
    html.push_str("</div></body></html>");
    html
}

fn bench_extraction(c: &mut Criterion) {
    let extractor = SoundExtractor::new("https://zonesons.com").unwrap();

    let small = listing_page(10);
    c.bench_function("extract_page_10_sounds", |b| {
        b.iter(|| black_box(extractor.extract(black_box(&small))))
    });

    let large = listing_page(200);
    c.bench_function("extract_page_200_sounds", |b| {
        b.iter(|| black_box(extractor.extract(black_box(&large))))
    });

    c.bench_function("decode_source", |b| {
        let src = "/L3NvbnMvb3NzMTE3L2NsaXAxLm1wMw==";
        b.iter(|| black_box(extractor.decode_source(black_box(src))))
    });
}

criterion_group!(benches, bench_extraction);
criterion_main!(benches);
