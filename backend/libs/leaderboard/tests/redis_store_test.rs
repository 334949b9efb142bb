//! Runs against a live Redis. Start one and run with
//! `LEADERBOARD_REDIS_URL=redis://localhost:6379 cargo test -- --ignored`.

use leaderboard::{Entry, Leaderboard, LeaderboardConfig, RedisScoreStore, ScoreStore};
use serial_test::serial;
use std::sync::Arc;

const LB_NAME: &str = "leaderboard_it";

async fn connect() -> (Arc<RedisScoreStore>, Leaderboard) {
    let config = LeaderboardConfig::from_env()
        .expect("valid LEADERBOARD_* configuration")
        .with_key_prefix("it");
    let store = Arc::new(
        RedisScoreStore::connect(&config.redis_url)
            .await
            .expect("Redis must be running for ignored tests"),
    );
    let lb = Leaderboard::with_config(store.clone(), LB_NAME, &config);
    lb.delete_leaderboard().await.expect("clean leaderboard");
    (store, lb)
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_redis_competition_ranking() {
    let (_, lb) = connect().await;
    lb.rank_members(&[
        Entry::new("member_1", 50),
        Entry::new("member_2", 50),
        Entry::new("member_3", 30),
        Entry::new("member_4", 30),
        Entry::new("member_5", 10),
    ])
    .await
    .unwrap();

    let ranks: Vec<u64> = lb
        .members(1, 0)
        .await
        .unwrap()
        .iter()
        .map(|m| m.rank)
        .collect();
    assert_eq!(ranks, vec![1, 1, 3, 3, 5]);

    lb.delete_leaderboard().await.unwrap();
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_redis_rank_member_ex_and_batch() {
    let (_, lb) = connect().await;

    assert_eq!(lb.rank_member_ex("aaa", 10).await.unwrap(), 1);
    assert_eq!(lb.rank_member_ex("bbb", 20).await.unwrap(), 1);
    assert_eq!(lb.rank_member_ex("aaa", 15).await.unwrap(), 2);

    let ranked = lb.ranked_in_list(&["bbb", "ghost", "aaa"]).await.unwrap();
    assert_eq!(ranked[0].rank(), Some(1));
    assert!(!ranked[1].is_present());
    assert_eq!(ranked[2].score(), Some(15));

    lb.delete_leaderboard().await.unwrap();
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_redis_trim_and_percentile() {
    let (store, lb) = connect().await;
    let entries: Vec<Entry> = (1..=25)
        .map(|i| Entry::new(format!("member_{}", i), i))
        .collect();
    lb.rank_members(&entries).await.unwrap();

    assert_eq!(lb.score_for_percentile(0).await.unwrap(), Some(1));
    assert_eq!(lb.score_for_percentile(100).await.unwrap(), Some(25));
    assert_eq!(store.count_above(lb.collection(), 20).await.unwrap(), 5);

    assert_eq!(lb.remove_members_outside_rank(3).await.unwrap(), 22);
    let top: Vec<String> = lb
        .all_members()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.member)
        .collect();
    assert_eq!(top, vec!["member_25", "member_24", "member_23"]);

    lb.delete_leaderboard().await.unwrap();
    drop(lb);
    if let Ok(store) = Arc::try_unwrap(store) {
        store.close().await;
    }
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_redis_tied_members_order_by_descending_name() {
    let (store, lb) = connect().await;
    lb.rank_members(&[
        Entry::new("alpha", 10),
        Entry::new("bravo", 10),
        Entry::new("charlie", 10),
    ])
    .await
    .unwrap();

    let members = lb.all_members().await.unwrap();
    let names: Vec<&str> = members.iter().map(|m| m.member.as_str()).collect();
    assert_eq!(names, vec!["charlie", "bravo", "alpha"]);
    assert!(members.iter().all(|m| m.rank == 1));

    assert_eq!(
        store.position_of(lb.collection(), "alpha").await.unwrap(),
        Some(2)
    );
    assert_eq!(lb.percentile_for("charlie").await.unwrap(), 67);

    lb.delete_leaderboard().await.unwrap();
}
