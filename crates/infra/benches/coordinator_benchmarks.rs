use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::sync::Arc;

use ordermgmt_core::{CustomerId, Money, ProductId};
use ordermgmt_events::{EventBus, InMemoryEventBus};
use ordermgmt_infra::{
    InMemoryStore, OrderCoordinator, OrderLine, ProductStore, ScriptedPayment, ScriptedShipping,
};
use ordermgmt_products::Product;

type Coordinator = OrderCoordinator<
    Arc<InMemoryStore>,
    Arc<InMemoryEventBus<ordermgmt_events::EventEnvelope<ordermgmt_orders::OrderEvent>>>,
>;

fn setup(product_count: usize, stock: u32) -> (Coordinator, Vec<ProductId>) {
    let store = Arc::new(InMemoryStore::new());
    let price = Money::euro(rust_decimal::Decimal::new(1999, 2)).unwrap();

    let ids = (0..product_count)
        .map(|i| {
            let product =
                Product::new(ProductId::new(), format!("Product {i}"), "", price, stock).unwrap();
            store.save_product(product).unwrap().id_typed()
        })
        .collect();

    let coordinator = OrderCoordinator::new(
        store,
        Arc::new(ScriptedPayment::approve_all()),
        Arc::new(ScriptedShipping::new()),
        Arc::new(InMemoryEventBus::new()),
    );
    (coordinator, ids)
}

fn lines(ids: &[ProductId]) -> Vec<OrderLine> {
    ids.iter().map(|id| OrderLine::new(*id, 1)).collect()
}

fn bench_create_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_order");

    for line_count in [1usize, 5, 20] {
        group.throughput(Throughput::Elements(line_count as u64));
        group.bench_with_input(
            BenchmarkId::new("lines", line_count),
            &line_count,
            |b, &line_count| {
                let (coordinator, ids) = setup(line_count, u32::MAX);
                let lines = lines(&ids);
                b.iter(|| {
                    let order = coordinator
                        .create_order(CustomerId::new(), black_box(&lines))
                        .unwrap();
                    black_box(order);
                });
            },
        );
    }

    group.finish();
}

fn bench_confirm_cancel_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("confirm_cancel_round_trip");

    for line_count in [1usize, 5, 20] {
        group.bench_with_input(
            BenchmarkId::new("lines", line_count),
            &line_count,
            |b, &line_count| {
                let (coordinator, ids) = setup(line_count, u32::MAX / 2);
                let lines = lines(&ids);
                b.iter(|| {
                    let id = coordinator
                        .create_order(CustomerId::new(), &lines)
                        .unwrap()
                        .order_id()
                        .unwrap();
                    coordinator.confirm_order(black_box(id)).unwrap();
                    black_box(coordinator.cancel_order(id).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_publish_with_subscriber(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    group.sample_size(200);

    group.bench_function("lifecycle_with_one_subscriber", |b| {
        let (coordinator, ids) = setup(1, u32::MAX / 2);
        let subscription = coordinator.bus().subscribe();
        let lines = lines(&ids);
        b.iter(|| {
            let id = coordinator
                .create_order(CustomerId::new(), &lines)
                .unwrap()
                .order_id()
                .unwrap();
            coordinator.confirm_order(id).unwrap();
            coordinator.process_payment(id).unwrap();
            coordinator.ship_order(id).unwrap();
            while subscription.try_recv().is_ok() {}
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_create_order,
    bench_confirm_cancel_round_trip,
    bench_publish_with_subscriber
);
criterion_main!(benches);
