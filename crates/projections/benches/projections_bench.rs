use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{OrderService, PayOrder, PlaceOrder, UseCase};
use event_store::InMemoryEventStore;
use projections::{InMemoryRepository, OrderSummary, OrderSummaryProjection, ProjectionProcessor};

/// Populate a store with N orders, each placed and paid (two events).
async fn populate_store(store: &InMemoryEventStore, n: usize) {
    let service = OrderService::new(store.clone());
    for _ in 0..n {
        let command = PlaceOrder::for_customer("customer-bench", 2000);
        let order_id = command.order_id.clone();
        service.execute(command).await.unwrap();
        service
            .execute(PayOrder::new(order_id, "txn-bench"))
            .await
            .unwrap();
    }
}

fn bench_catch_up(c: &mut Criterion, orders: usize) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    rt.block_on(populate_store(&store, orders));

    c.bench_function(&format!("projections/catch_up_{}_events", orders * 2), |b| {
        b.iter(|| {
            rt.block_on(async {
                let repo: InMemoryRepository<OrderSummary, AggregateId> =
                    InMemoryRepository::new();
                let processor = ProjectionProcessor::new(store.clone())
                    .with_projection(Box::new(OrderSummaryProjection::new(repo)));
                processor.run_catch_up().await.unwrap();
            });
        });
    });
}

fn bench_catch_up_100_orders(c: &mut Criterion) {
    bench_catch_up(c, 100);
}

fn bench_catch_up_1000_orders(c: &mut Criterion) {
    bench_catch_up(c, 1000);
}

criterion_group!(benches, bench_catch_up_100_orders, bench_catch_up_1000_orders);
criterion_main!(benches);
