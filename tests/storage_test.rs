//! SQLite insight store tests.

use chrono::{Duration, Utc};
use tempfile::TempDir;

use news_xai::config::DatabaseConfig;
use news_xai::metrics::PerformanceMetrics;
use news_xai::storage::{InsightStore, NewInsight, SqliteStorage};

async fn create_test_storage() -> (SqliteStorage, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        path: dir.path().join("insights.db"),
        max_connections: 2,
    };
    let storage = SqliteStorage::new(&config).await.unwrap();
    (storage, dir)
}

fn insight(user_id: i64, label: &str, confidence: f64, minutes_ago: i64) -> NewInsight {
    let mut insight = NewInsight::new(format!("article by {user_id}"), label, confidence)
        .with_user(user_id)
        .with_metrics(PerformanceMetrics {
            processing_time_ms: 10.0,
            cpu_usage_percent: 2.0,
        });
    insight.created_at = Utc::now() - Duration::minutes(minutes_ago);
    insight
}

#[tokio::test]
async fn test_save_and_get() {
    let (storage, _dir) = create_test_storage().await;

    let new = NewInsight::new("Earth is flat", "fake", 92.0)
        .with_user(5)
        .with_narrative(
            Some("- claim".to_string()),
            Some("Contradicts evidence.".to_string()),
            Some("Gemini verdict: FAKE".to_string()),
        )
        .with_verification(true, "ML_GEMINI");
    let id = storage.save_insight(&new).await.unwrap();

    let stored = storage.get_insight(id).await.unwrap().unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.user_id, Some(5));
    assert_eq!(stored.article_text, "Earth is flat");
    assert_eq!(stored.prediction_label, "fake");
    assert_eq!(stored.confidence_score, 92.0);
    assert_eq!(stored.summary.as_deref(), Some("- claim"));
    assert!(stored.verification_triggered);
    assert_eq!(stored.decision_source, "ML_GEMINI");
}

#[tokio::test]
async fn test_missing_insight_is_none() {
    let (storage, _dir) = create_test_storage().await;
    assert!(storage.get_insight(999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_probability_confidence_stored_as_percentage() {
    let (storage, _dir) = create_test_storage().await;

    let id = storage
        .save_insight(&NewInsight::from_probability("text", "real", 0.5).with_user(1))
        .await
        .unwrap();
    let stored = storage.get_insight(id).await.unwrap().unwrap();
    assert_eq!(stored.confidence_score, 50.0);
    assert_eq!(stored.decision_source, "ML_ONLY");
    assert!(!stored.verification_triggered);
}

#[tokio::test]
async fn test_small_percentage_stored_unchanged() {
    let (storage, _dir) = create_test_storage().await;

    let id = storage
        .save_insight(&NewInsight::new("text", "fake", 0.8).with_user(1))
        .await
        .unwrap();
    let stored = storage.get_insight(id).await.unwrap().unwrap();
    assert!((stored.confidence_score - 0.8).abs() < 1e-9);
    assert_eq!(stored.comparison_status, None);
}

#[tokio::test]
async fn test_user_insights_newest_first_and_limited() {
    let (storage, _dir) = create_test_storage().await;

    storage.save_insight(&insight(7, "fake", 90.0, 30)).await.unwrap();
    let middle = storage.save_insight(&insight(7, "real", 80.0, 20)).await.unwrap();
    let newest = storage.save_insight(&insight(7, "fake", 70.0, 10)).await.unwrap();
    storage.save_insight(&insight(8, "real", 60.0, 0)).await.unwrap();

    let insights = storage.user_insights(7, 2).await.unwrap();
    let ids: Vec<i64> = insights.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![newest, middle]);
    assert!(insights.iter().all(|i| i.user_id == Some(7)));

    assert_eq!(storage.user_insights(7, 50).await.unwrap().len(), 3);
    assert!(storage.user_insights(99, 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_all_insights_previews_text() {
    let (storage, _dir) = create_test_storage().await;

    let long_text = "word ".repeat(60);
    storage
        .save_insight(&NewInsight::new(long_text.clone(), "fake", 88.0).with_user(1))
        .await
        .unwrap();
    storage
        .save_insight(&NewInsight::new("short", "real", 77.0).with_user(2))
        .await
        .unwrap();

    let all = storage.all_insights(100).await.unwrap();
    assert_eq!(all.len(), 2);

    let long = all.iter().find(|i| i.user_id == Some(1)).unwrap();
    assert_eq!(long.article_text.chars().count(), 103);
    assert!(long.article_text.ends_with("..."));

    let short = all.iter().find(|i| i.user_id == Some(2)).unwrap();
    assert_eq!(short.article_text, "short");

    // Full text is still there for the owner.
    let owned = storage.user_insights(1, 50).await.unwrap();
    assert_eq!(owned[0].article_text, long_text);
}

#[tokio::test]
async fn test_analytics_empty_store() {
    let (storage, _dir) = create_test_storage().await;

    let analytics = storage.analytics().await.unwrap();
    assert_eq!(analytics.total_classifications, 0);
    assert_eq!(analytics.avg_confidence, 0.0);
    assert_eq!(analytics.fake_count, 0);
    assert_eq!(analytics.fake_ratio, 0.0);
}

#[tokio::test]
async fn test_analytics_aggregates() {
    let (storage, _dir) = create_test_storage().await;

    storage
        .save_insight(&insight(1, "fake", 90.0, 3).with_verification(true, "ML_GEMINI"))
        .await
        .unwrap();
    storage.save_insight(&insight(1, "real", 60.0, 2)).await.unwrap();
    storage.save_insight(&insight(2, "real", 30.0, 1)).await.unwrap();

    let analytics = storage.analytics().await.unwrap();
    assert_eq!(analytics.total_classifications, 3);
    assert!((analytics.avg_confidence - 60.0).abs() < 1e-9);
    assert!((analytics.avg_processing_time_ms - 10.0).abs() < 1e-9);
    assert!((analytics.avg_cpu_usage_percent - 2.0).abs() < 1e-9);
    assert_eq!(analytics.fake_count, 1);
    assert_eq!(analytics.real_count, 2);
    assert_eq!(analytics.verification_count, 1);
    assert_eq!(analytics.fake_ratio, 33.33);
}

#[tokio::test]
async fn test_storage_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        path: dir.path().join("nested").join("insights.db"),
        max_connections: 1,
    };

    let id = {
        let storage = SqliteStorage::new(&config).await.unwrap();
        let id = storage
            .save_insight(&NewInsight::new("text", "fake", 90.0).with_user(3))
            .await
            .unwrap();
        storage.pool().close().await;
        id
    };

    let reopened = SqliteStorage::new(&config).await.unwrap();
    let stored = reopened.get_insight(id).await.unwrap().unwrap();
    assert_eq!(stored.user_id, Some(3));
    assert!((stored.confidence_score - 90.0).abs() < 1e-9);
}
