use kit_readiness::{normalize, rank_kits, Kit};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const ACCESSORIES: &[&str] = &[
    "Leitor RFID",
    "ID Condutor RFID",
    "Sirene",
    "Buzzer",
    "Relé de bloqueio",
    "Botão de pânico",
    "Câmera DVR",
    "Sensor de porta",
    "Teclado",
    "Fita isolante",
];

fn catalog(size: usize) -> Vec<Kit> {
    (0..size)
        .map(|i| {
            let equipment = if i % 2 == 0 { "Teltonika FMC650" } else { "Suntech ST310U" };
            let mut kit = Kit::new(format!("kit-{}", i), format!("Kit {}", i)).with_equipment(equipment);
            for j in 0..6 {
                kit = kit.with_accessory(format!("{} ({}x)", ACCESSORIES[(i + j) % ACCESSORIES.len()], j + 1));
            }
            kit
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("matching.normalize", |b| {
        b.iter(|| {
            for name in ACCESSORIES {
                black_box(normalize(black_box(name)));
            }
        });
    });
}

fn bench_rank_kits(c: &mut Criterion) {
    let kits = catalog(500);
    let vehicle = ["RFID (2x)", "Sirene", "Bloqueio", "Câmera"];

    c.bench_function("ranking.rank_kits.500", |b| {
        b.iter(|| rank_kits(black_box(&vehicle), black_box(&kits), Some("telemetria_can")));
    });
}

criterion_group!(benches, bench_normalize, bench_rank_kits);
criterion_main!(benches);
