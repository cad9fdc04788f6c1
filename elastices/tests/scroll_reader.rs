mod common;

use std::collections::HashSet;
use std::time::Duration;

use futures::TryStreamExt;
use proptest::prelude::*;
use serde_json::Value;

use common::{client_for, connected_client, test_config, FakeEngine};
use elastices::{ClientError, SearchError};

async fn drain_batches(reader: &mut elastices::ScrollReader) -> Vec<Vec<String>> {
    let mut batches = Vec::new();
    loop {
        let batch = reader.next_batch().await.unwrap();
        if batch.end_of_stream {
            assert!(batch.documents.is_empty());
            return batches;
        }
        assert!(!batch.documents.is_empty());
        batches.push(
            batch
                .documents
                .into_iter()
                .map(|d| d.id.unwrap_or_default())
                .collect(),
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_batches_cover_index_exactly_once() {
    for (count, batch_size) in [(10usize, 3usize), (9, 3), (1, 5), (7, 1), (25, 25)] {
        let engine = FakeEngine::new();
        engine.seed("people", count).await;
        let client = connected_client(&engine, test_config()).await;

        let mut reader = client
            .query("people", Value::Null, Some(batch_size), None)
            .await
            .unwrap();
        let batches = drain_batches(&mut reader).await;

        assert_eq!(batches.len(), count.div_ceil(batch_size));
        let ids: Vec<String> = batches.into_iter().flatten().collect();
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(ids.len(), count);
        assert_eq!(unique.len(), count);
        let expected: HashSet<String> = (0..count).map(|n| n.to_string()).collect();
        assert_eq!(ids.into_iter().collect::<HashSet<_>>(), expected);

        assert!(reader.is_finished());
        assert_eq!(engine.open_scroll_count().await, 0);
    }
}

/// Scroll an index of `count` documents with `batch_size`, returning the batch
/// ids and the number of cursors still open afterwards.
fn scroll_index(count: usize, batch_size: usize) -> (Vec<Vec<String>>, usize) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async {
        let engine = FakeEngine::new();
        engine.seed("people", count).await;
        let client = connected_client(&engine, test_config()).await;

        let mut reader = client
            .query("people", Value::Null, Some(batch_size), None)
            .await
            .unwrap();
        let batches = drain_batches(&mut reader).await;
        drop(reader);
        (batches, engine.open_scroll_count().await)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_batches_partition_the_index(count in 0usize..60, batch_size in 1usize..20) {
        let (batches, open_cursors) = scroll_index(count, batch_size);

        prop_assert_eq!(batches.len(), count.div_ceil(batch_size));
        prop_assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= batch_size));

        let ids: Vec<String> = batches.into_iter().flatten().collect();
        let unique: HashSet<String> = ids.iter().cloned().collect();
        let expected: HashSet<String> = (0..count).map(|n| n.to_string()).collect();
        prop_assert_eq!(ids.len(), count);
        prop_assert_eq!(unique, expected);
        prop_assert_eq!(open_cursors, 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_end_of_stream_is_sticky() {
    let engine = FakeEngine::new();
    engine.seed("people", 2).await;
    let client = connected_client(&engine, test_config()).await;

    let mut reader = client
        .query("people", Value::Null, Some(5), None)
        .await
        .unwrap();
    assert_eq!(reader.next_batch().await.unwrap().documents.len(), 2);
    assert!(reader.next_batch().await.unwrap().end_of_stream);

    let calls = engine.call_count();
    assert!(reader.next_batch().await.unwrap().end_of_stream);
    assert_eq!(engine.call_count(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_empty_index_releases_cursor_immediately() {
    let engine = FakeEngine::new();
    engine.create("empty").await;
    let client = connected_client(&engine, test_config()).await;

    let mut reader = client.query("empty", Value::Null, None, None).await.unwrap();

    assert!(reader.is_finished());
    assert!(reader.next_batch().await.unwrap().end_of_stream);
    assert_eq!(engine.cleared_tokens().await.len(), 1);
    assert_eq!(engine.open_scroll_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_retries_same_token() {
    let engine = FakeEngine::new();
    engine.seed("people", 6).await;
    let client = connected_client(&engine, test_config()).await;

    let mut reader = client
        .query("people", Value::Null, Some(2), None)
        .await
        .unwrap();
    reader.next_batch().await.unwrap();
    let token = reader.scroll_id().unwrap().to_string();

    engine.fail_next("next_scroll", 2).await;
    let batches = drain_batches(&mut reader).await;

    let ids: Vec<String> = batches.into_iter().flatten().collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 4);

    let tokens = engine.next_scroll_tokens().await;
    assert_eq!(&tokens[..3], &[token.clone(), token.clone(), token]);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_failure_surfaces_scroll_failure() {
    let engine = FakeEngine::new();
    engine.seed("people", 6).await;
    let client = connected_client(&engine, test_config()).await;

    let mut reader = client
        .query("people", Value::Null, Some(2), None)
        .await
        .unwrap();
    reader.next_batch().await.unwrap();

    engine.fail_next("next_scroll", 10).await;
    match reader.next_batch().await {
        Err(ClientError::ScrollFailure { attempts, source }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(source, SearchError::ConnectionError(_)));
        }
        other => panic!("expected scroll failure, got {:?}", other),
    }

    assert!(reader.is_finished());
    assert_eq!(engine.open_scroll_count().await, 0);
    assert!(reader.next_batch().await.unwrap().end_of_stream);
}

#[tokio::test(start_paused = true)]
async fn test_expired_cursor_is_not_retried() {
    let engine = FakeEngine::new();
    engine.seed("people", 6).await;
    let client = connected_client(&engine, test_config()).await;

    let mut reader = client
        .query("people", Value::Null, Some(2), None)
        .await
        .unwrap();
    reader.next_batch().await.unwrap();

    engine.expire_scrolls().await;
    let result = reader.next_batch().await;

    assert!(matches!(result, Err(ClientError::CursorExpired(_))));
    assert_eq!(engine.calls_to("next_scroll").await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_retries_transient_failures() {
    let engine = FakeEngine::new();
    engine.seed("people", 3).await;
    engine.fail_next("open_scroll", 1).await;
    let client = connected_client(&engine, test_config()).await;

    let reader = client.query("people", Value::Null, None, None).await.unwrap();
    let docs = reader.collect_all().await.unwrap();

    assert_eq!(docs.len(), 3);
    assert_eq!(engine.calls_to("open_scroll").await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_index() {
    let engine = FakeEngine::new();
    let client = connected_client(&engine, test_config()).await;

    let result = client.query("nope", Value::Null, None, None).await;

    assert!(matches!(result, Err(ClientError::IndexNotFound(_))));
}

#[tokio::test(start_paused = true)]
async fn test_close_releases_cursor() {
    let engine = FakeEngine::new();
    engine.seed("people", 10).await;
    let client = connected_client(&engine, test_config()).await;

    let mut reader = client
        .query("people", Value::Null, Some(3), None)
        .await
        .unwrap();
    reader.next_batch().await.unwrap();
    reader.next_batch().await.unwrap();
    let token = reader.scroll_id().unwrap().to_string();

    reader.close().await;

    assert_eq!(engine.cleared_tokens().await, vec![token]);
    assert_eq!(engine.open_scroll_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_drop_releases_cursor() {
    let engine = FakeEngine::new();
    engine.seed("people", 10).await;
    let client = connected_client(&engine, test_config()).await;

    let mut reader = client
        .query("people", Value::Null, Some(3), None)
        .await
        .unwrap();
    reader.next_batch().await.unwrap();
    let token = reader.scroll_id().unwrap().to_string();

    drop(reader);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(engine.cleared_tokens().await, vec![token]);
    assert_eq!(engine.open_scroll_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_stream_yields_every_document() {
    let engine = FakeEngine::new();
    engine.seed("people", 11).await;
    let client = connected_client(&engine, test_config()).await;

    let reader = client
        .query("people", Value::Null, Some(4), None)
        .await
        .unwrap();
    let docs: Vec<_> = reader.into_stream().try_collect().await.unwrap();

    assert_eq!(docs.len(), 11);
    assert_eq!(engine.open_scroll_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_stream_early_releases_cursor() {
    let engine = FakeEngine::new();
    engine.seed("people", 11).await;
    let client = connected_client(&engine, test_config()).await;

    let reader = client
        .query("people", Value::Null, Some(4), None)
        .await
        .unwrap();
    let mut stream = Box::pin(reader.into_stream());
    assert!(stream.try_next().await.unwrap().is_some());

    drop(stream);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(engine.open_scroll_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_invalidates_open_readers() {
    let engine = FakeEngine::new();
    engine.seed("people", 10).await;
    let mut client = client_for(&engine, test_config());
    client.connect().await.unwrap();

    let mut reader = client
        .query("people", Value::Null, Some(3), None)
        .await
        .unwrap();
    reader.next_batch().await.unwrap();

    client.connect().await.unwrap();
    let before = engine.calls_to("next_scroll").await;

    assert!(matches!(
        reader.next_batch().await,
        Err(ClientError::NotConnected(_))
    ));
    assert_eq!(engine.calls_to("next_scroll").await, before);
    assert_eq!(engine.open_scroll_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_doc_type_is_sent_as_routing() {
    let engine = FakeEngine::new();
    engine.seed("people", 1).await;
    let client = connected_client(&engine, test_config().with_doc_type("person")).await;

    client
        .query("people", Value::Null, None, None)
        .await
        .unwrap()
        .close()
        .await;

    assert_eq!(
        engine.scroll_routing().await,
        vec![Some("person".to_string())]
    );
}
