use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use shopfront_cart::{CartLineItem, CartManager, FeePolicy, VariantSelection, compute_totals};
use shopfront_catalog::{Product, VariantOptions};
use shopfront_core::{Money, ProductId};
use shopfront_storage::PersistedStore;

fn product(i: usize) -> Product {
    Product {
        id: ProductId::new(format!("P{i}")),
        name: format!("Product {i}"),
        brand: "Acme".into(),
        category: "cloth".into(),
        mrp: Money::from_paise(99_900 + i as i64),
        sale_price: Money::from_paise(74_950 + i as i64),
        variants: VariantOptions::default(),
        images: Vec::new(),
        delivery_days: 4,
    }
}

fn lines(n: usize) -> Vec<CartLineItem> {
    (0..n)
        .map(|i| CartLineItem::from_product(&product(i), VariantSelection::size("M"), (i % 5 + 1) as u32))
        .collect()
}

fn bench_compute_totals(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_totals");
    let fees = FeePolicy::new(Money::rupees(40), Money::rupees(9));

    for size in [1usize, 10, 100, 1_000] {
        let cart = lines(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &cart, |b, cart| {
            b.iter(|| compute_totals(black_box(cart), black_box(&fees)));
        });
    }

    group.finish();
}

fn bench_manager_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("cart_manager");

    group.bench_function("add_then_totals_20_lines", |b| {
        b.iter(|| {
            let cart = CartManager::new(PersistedStore::in_memory(), FeePolicy::FREE);
            for i in 0..20 {
                let _ = cart.add_item(&product(i), VariantSelection::none(), 1);
            }
            black_box(cart.totals())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_compute_totals, bench_manager_round_trip);
criterion_main!(benches);
