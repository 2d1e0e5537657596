use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput, BenchmarkId};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use uuid::Uuid;

use marketmaster::domain::models::types::{CartLine, CartRequest, Product};
use marketmaster::store::{MarketStore, MemoryStore};
use marketmaster::{EventBus, PlacementEngine};

fn create_test_product(name: &str, price: Decimal, stock: u32) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: String::new(),
        price,
        stock,
        active: true,
        created_at: Utc::now(),
    }
}

async fn setup_engine(catalog_size: usize) -> (PlacementEngine, Arc<MemoryStore>, Vec<Uuid>) {
    let store = Arc::new(MemoryStore::new());
    let mut product_ids = Vec::with_capacity(catalog_size);

    for i in 0..catalog_size {
        // Effectively unlimited stock so placements never run dry mid-run
        let product = create_test_product(&format!("product-{i}"), dec!(9.99), u32::MAX);
        product_ids.push(product.id);
        store.insert_product(product).await.unwrap();
    }

    let engine = PlacementEngine::new(
        Arc::clone(&store) as Arc<dyn MarketStore>,
        EventBus::new(1024),
    );
    (engine, store, product_ids)
}

fn bench_place_order(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("place_order");
    group.measurement_time(Duration::from_secs(5));

    for size in [100usize, 1000].iter() {
        group.throughput(Throughput::Elements(1));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let (engine, _store, product_ids) = rt.block_on(setup_engine(size));
            let user_id = Uuid::new_v4();
            let mut next = 0usize;

            b.iter(|| {
                let product_id = product_ids[next % product_ids.len()];
                next += 1;

                let cart = CartRequest {
                    items: vec![CartLine {
                        product_id,
                        quantity: 1,
                    }],
                };

                let placed = rt.block_on(engine.place_order(user_id, cart)).unwrap();
                black_box(placed);
            });
        });
    }

    group.finish();
}

fn bench_multi_line_carts(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("multi_line_carts");
    group.measurement_time(Duration::from_secs(5));

    for lines in [1usize, 5, 20].iter() {
        group.throughput(Throughput::Elements(*lines as u64));

        group.bench_with_input(BenchmarkId::from_parameter(lines), lines, |b, &lines| {
            let (engine, _store, product_ids) = rt.block_on(setup_engine(1000));
            let user_id = Uuid::new_v4();
            let mut next = 0usize;

            b.iter(|| {
                let items: Vec<CartLine> = (0..lines)
                    .map(|_| {
                        let product_id = product_ids[next % product_ids.len()];
                        next += 1;
                        CartLine {
                            product_id,
                            quantity: 1,
                        }
                    })
                    .collect();

                let placed = rt
                    .block_on(engine.place_order(user_id, CartRequest { items }))
                    .unwrap();
                black_box(placed);
            });
        });
    }

    group.finish();
}

fn bench_catalog_reads(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("catalog_reads");
    group.measurement_time(Duration::from_secs(10));

    for size in [100usize, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let (_engine, store, _product_ids) = rt.block_on(setup_engine(size));

            b.iter(|| {
                let products = rt.block_on(store.active_products()).unwrap();
                black_box(products.len());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_place_order,
    bench_multi_line_carts,
    bench_catalog_reads
);
criterion_main!(benches);
