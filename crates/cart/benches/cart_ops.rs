use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use duka_cart::{Cart, Product};
use duka_core::{Amount, ProductId};

fn catalog(size: usize) -> Vec<Product> {
    (0..size)
        .map(|n| {
            Product::new(
                ProductId::parse(format!("p{n}")).unwrap(),
                format!("Product {n}"),
                Amount::new(100 + n as u64),
            )
        })
        .collect()
}

fn filled_cart(products: &[Product]) -> Cart {
    let mut cart = Cart::new();
    for p in products {
        cart.add_product(p);
        cart.add_product(p);
    }
    cart
}

fn bench_add_product(c: &mut Criterion) {
    let mut group = c.benchmark_group("cart_add_product");

    for size in [10usize, 100, 1000].iter() {
        let products = catalog(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &products, |b, products| {
            b.iter(|| {
                let mut cart = Cart::new();
                for p in products {
                    cart.add_product(black_box(p));
                }
                black_box(cart)
            });
        });
    }

    group.finish();
}

fn bench_total(c: &mut Criterion) {
    let mut group = c.benchmark_group("cart_total");

    for size in [10usize, 100, 1000].iter() {
        let cart = filled_cart(&catalog(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &cart, |b, cart| {
            b.iter(|| black_box(cart.total()));
        });
    }

    group.finish();
}

fn bench_stored_form(c: &mut Criterion) {
    let mut group = c.benchmark_group("cart_stored_form");
    let cart = filled_cart(&catalog(100));
    let json = serde_json::to_string(&cart).unwrap();

    group.bench_function("serialize_100_lines", |b| {
        b.iter(|| serde_json::to_string(black_box(&cart)).unwrap());
    });
    group.bench_function("deserialize_100_lines", |b| {
        b.iter(|| serde_json::from_str::<Cart>(black_box(&json)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_add_product, bench_total, bench_stored_form);
criterion_main!(benches);
