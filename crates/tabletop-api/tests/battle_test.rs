//! Integration tests for the Battle bounded context.

mod common;

use axum::http::StatusCode;
use sqlx::PgPool;
use tabletop_api::state::AppState;
use uuid::Uuid;

/// Builds a battle with A(speed 10) and B(speed 20) and drops A to the front.
/// Returns the ids of A and B and the version the battle ends at.
async fn build_scripted_battle(state: &AppState, battle_id: Uuid) -> (Uuid, Uuid, i64) {
    let base = format!("/api/v1/battles/{battle_id}");
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let (status, _) = common::send_json(
        common::build_test_app(state),
        "PUT",
        &format!("{base}/roster"),
        &serde_json::json!({ "characters": [
            { "id": a, "name": "Aria", "speed": 10 },
            { "id": b, "name": "Borin", "speed": 20 }
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for id in [a, b] {
        let (status, _) = common::send_json(
            common::build_test_app(state),
            "POST",
            &format!("{base}/participants"),
            &serde_json::json!({ "character_id": id }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = common::send_json(
        common::build_test_app(state),
        "POST",
        &format!("{base}/drop"),
        &serde_json::json!({ "character_id": a, "target_index": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["event_types"][0], "battle.tile_dropped");

    (a, b, 4)
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_battle_snapshot_round_trip_across_processes(pool: PgPool) {
    let battle_id = Uuid::new_v4();
    let base = format!("/api/v1/battles/{battle_id}");

    // First process builds the battle and writes snapshots in the background.
    let first = common::test_state(pool.clone());
    let (a, b, version) = build_scripted_battle(&first, battle_id).await;
    common::wait_for_snapshot(&pool, battle_id, version).await;

    // Second process starts empty and loads the stored battle.
    let second = common::test_state(pool);
    let (status, json) =
        common::send_empty(common::build_test_app(&second), "POST", &format!("{base}/load")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["event_types"][0], "battle.battle_loaded");

    let (status, timeline) =
        common::get_json(common::build_test_app(&second), &format!("{base}/timeline")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(timeline["load_state"], "loaded");
    assert_eq!(timeline["scripted_count"], 1);
    assert_eq!(timeline["participant_count"], 2);
    assert_eq!(timeline["version"], version + 1);
    let first_tile = &timeline["groups"][0]["tiles"][0];
    assert_eq!(first_tile["character_id"], a.to_string());
    assert_eq!(first_tile["turn_number"], 1);
    assert_eq!(first_tile["is_scripted"], true);
    let second_tile = &timeline["groups"][0]["tiles"][1];
    assert_eq!(second_tile["character_id"], b.to_string());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_load_is_one_shot_until_reset(pool: PgPool) {
    let battle_id = Uuid::new_v4();
    let base = format!("/api/v1/battles/{battle_id}");
    let state = common::test_state(pool);

    let (_, first) =
        common::send_empty(common::build_test_app(&state), "POST", &format!("{base}/load")).await;
    let (_, second) =
        common::send_empty(common::build_test_app(&state), "POST", &format!("{base}/load")).await;
    common::send_empty(common::build_test_app(&state), "POST", &format!("{base}/reset")).await;
    let (_, third) =
        common::send_empty(common::build_test_app(&state), "POST", &format!("{base}/load")).await;

    assert_eq!(first["event_types"][0], "battle.battle_loaded");
    assert!(second["event_types"].as_array().unwrap().is_empty());
    assert_eq!(third["event_types"][0], "battle.battle_loaded");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_load_reads_legacy_packed_scripted_count(pool: PgPool) {
    // Arrange: a record written before scriptedCount had its own field.
    let battle_id = Uuid::new_v4();
    let slow = Uuid::new_v4();
    let fast = Uuid::new_v4();
    let payload = serde_json::json!({
        "participants": [
            { "characterId": slow, "name": "Slow", "speed": 10_001 },
            { "characterId": fast, "name": "Fast", "speed": 40 }
        ]
    });
    sqlx::query(
        "INSERT INTO battle_snapshots (aggregate_id, payload, version) VALUES ($1, $2, $3)",
    )
    .bind(battle_id)
    .bind(&payload)
    .bind(9_i64)
    .execute(&pool)
    .await
    .unwrap();
    let state = common::test_state(pool);
    let base = format!("/api/v1/battles/{battle_id}");

    // Act
    let (status, _) =
        common::send_empty(common::build_test_app(&state), "POST", &format!("{base}/load")).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    let (_, timeline) =
        common::get_json(common::build_test_app(&state), &format!("{base}/timeline")).await;
    assert_eq!(timeline["scripted_count"], 1);
    let tiles = &timeline["groups"][0]["tiles"];
    assert_eq!(tiles[0]["character_id"], slow.to_string());
    assert_eq!(tiles[0]["speed"], 10);
    assert_eq!(tiles[1]["character_id"], fast.to_string());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_rejected_drop_leaves_timeline_unchanged(pool: PgPool) {
    let battle_id = Uuid::new_v4();
    let base = format!("/api/v1/battles/{battle_id}");
    let state = common::test_state(pool);
    let (a, _, _) = build_scripted_battle(&state, battle_id).await;
    let (_, before) =
        common::get_json(common::build_test_app(&state), &format!("{base}/timeline")).await;

    let (status, json) = common::send_json(
        common::build_test_app(&state),
        "POST",
        &format!("{base}/drop"),
        &serde_json::json!({ "character_id": a, "target_index": 0 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["event_types"][0], "battle.tile_drop_rejected");
    let (_, after) =
        common::get_json(common::build_test_app(&state), &format!("{base}/timeline")).await;
    assert_eq!(before["groups"], after["groups"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_commands_before_load_supersede_stored_snapshot(pool: PgPool) {
    // Arrange: an earlier process left a scripted battle in the store.
    let battle_id = Uuid::new_v4();
    let base = format!("/api/v1/battles/{battle_id}");
    let earlier = common::test_state(pool.clone());
    let (_, _, version) = build_scripted_battle(&earlier, battle_id).await;
    common::wait_for_snapshot(&pool, battle_id, version).await;

    // Act: a restarted process resets without loading first.
    let restarted = common::test_state(pool.clone());
    let (status, _) =
        common::send_empty(common::build_test_app(&restarted), "POST", &format!("{base}/reset"))
            .await;
    assert_eq!(status, StatusCode::OK);
    common::wait_for_snapshot(&pool, battle_id, version + 1).await;

    // Assert: the next process loads the reset battle, not the old one.
    let next = common::test_state(pool);
    common::send_empty(common::build_test_app(&next), "POST", &format!("{base}/load")).await;
    let (_, timeline) =
        common::get_json(common::build_test_app(&next), &format!("{base}/timeline")).await;
    assert_eq!(timeline["participant_count"], 0);
    assert_eq!(timeline["scripted_count"], 0);
    assert_eq!(timeline["version"], version + 2);
}
