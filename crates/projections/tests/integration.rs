//! Integration tests: OrderService use cases → ProjectionProcessor → OrderSummary read model.

use common::AggregateId;
use domain::{CancelOrder, OrderService, OrderStatus, PayOrder, PlaceOrder, UseCase};
use event_store::{EventStore, InMemoryEventStore};
use futures_util::StreamExt;
use projections::{
    InMemoryRepository, OrderSummary, OrderSummaryProjection, ProjectionProcessor, Repository,
};

type Repo = InMemoryRepository<OrderSummary, AggregateId>;

/// Helper to set up service, processor, and the summary repository.
fn setup() -> (
    OrderService<InMemoryEventStore>,
    ProjectionProcessor<InMemoryEventStore>,
    Repo,
) {
    let store = InMemoryEventStore::new();
    let service = OrderService::new(store.clone());
    let repo = Repo::new();

    let processor = ProjectionProcessor::new(store)
        .with_projection(Box::new(OrderSummaryProjection::new(repo.clone())));

    (service, processor, repo)
}

async fn place(service: &OrderService<InMemoryEventStore>, customer: &str, total: i64) -> AggregateId {
    let command = PlaceOrder::for_customer(customer, total);
    let order_id = command.order_id.clone();
    service.execute(command).await.unwrap();
    order_id
}

#[tokio::test]
async fn test_lifecycle_reaches_the_read_model() {
    let (service, processor, repo) = setup();

    let paid = place(&service, "alice", 1500).await;
    let open = place(&service, "bob", 800).await;
    let cancelled = place(&service, "carol", 300).await;

    service
        .execute(PayOrder::new(paid.clone(), "txn-1"))
        .await
        .unwrap();
    service
        .execute(CancelOrder::new(cancelled.clone(), "duplicate"))
        .await
        .unwrap();

    assert_eq!(processor.run_catch_up().await.unwrap(), 5);

    let paid_summary = repo.find_by_id(&paid).await.unwrap().unwrap();
    assert_eq!(paid_summary.status, OrderStatus::Paid);
    assert_eq!(paid_summary.customer_id, "alice");

    let open_summary = repo.find_by_id(&open).await.unwrap().unwrap();
    assert_eq!(open_summary.status, OrderStatus::Placed);
    assert_eq!(open_summary.total_cents, 800);

    assert!(repo.find_by_id(&cancelled).await.unwrap().is_none());
    assert_eq!(repo.find_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_incremental_catch_up_only_sees_new_events() {
    let (service, processor, repo) = setup();

    let order_id = place(&service, "alice", 1000).await;
    assert_eq!(processor.run_catch_up().await.unwrap(), 1);

    service
        .execute(PayOrder::new(order_id.clone(), "txn-1"))
        .await
        .unwrap();
    assert_eq!(processor.run_catch_up().await.unwrap(), 1);

    let summary = repo.find_by_id(&order_id).await.unwrap().unwrap();
    assert_eq!(summary.status, OrderStatus::Paid);
    assert_eq!(summary.version, 2);
}

#[tokio::test]
async fn test_process_event_as_it_is_recorded() {
    let store = InMemoryEventStore::new();
    let service = OrderService::new(store.clone());
    let repo = Repo::new();
    let processor = ProjectionProcessor::new(store.clone())
        .with_projection(Box::new(OrderSummaryProjection::new(repo.clone())));

    let order_id = place(&service, "alice", 1000).await;

    let mut all = store.stream_all_events().await.unwrap();
    while let Some(event) = all.next().await {
        processor.process_event(&event.unwrap()).await.unwrap();
    }

    assert!(repo.find_by_id(&order_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_rebuild_produces_the_same_read_model() {
    let (service, processor, repo) = setup();

    for n in 0..5 {
        let order_id = place(&service, &format!("customer-{n}"), 100 * (n + 1)).await;
        if n % 2 == 0 {
            service
                .execute(PayOrder::new(order_id, format!("txn-{n}")))
                .await
                .unwrap();
        }
    }

    processor.run_catch_up().await.unwrap();
    let before = repo.find_all().await.unwrap();

    processor.rebuild_all().await.unwrap();
    let after = repo.find_all().await.unwrap();

    assert_eq!(before, after);
    assert_eq!(after.len(), 5);
}
