mod support;

use futures_util::SinkExt;
use sync_protocol::{PositionSample, identity};

#[tokio::test]
async fn when_participant_sends_sample_then_every_connection_receives_table() {
    let mut sender = support::connect().await;
    let mut observer = support::connect().await;
    let id = identity::generate();
    let sample = PositionSample::new(48.0, 48.0, 1);

    support::send_sample(&mut sender, &id, sample).await;

    // The sender gets its own entry back as confirmation.
    let echoed = support::next_table_where(&mut sender, |t| t.contains_key(&id)).await;
    assert_eq!(echoed[&id], sample);

    let observed = support::next_table_where(&mut observer, |t| t.contains_key(&id)).await;
    assert_eq!(observed[&id], sample);
}

#[tokio::test]
async fn two_participants_see_each_other_after_moving() {
    let mut client1 = support::connect().await;
    let mut client2 = support::connect().await;
    let a = identity::generate();
    let b = identity::generate();

    support::send_sample(&mut client1, &a, PositionSample::new(48.0, 48.0, 1)).await;
    let seen_by_2 = support::next_table_where(&mut client2, |t| t.contains_key(&a)).await;
    assert_eq!(seen_by_2[&a], PositionSample::new(48.0, 48.0, 1));

    support::send_sample(&mut client2, &b, PositionSample::new(50.0, 48.0, 1)).await;
    let seen_by_1 =
        support::next_table_where(&mut client1, |t| t.contains_key(&a) && t.contains_key(&b))
            .await;
    assert_eq!(seen_by_1[&a], PositionSample::new(48.0, 48.0, 1));
    assert_eq!(seen_by_1[&b], PositionSample::new(50.0, 48.0, 1));
}

#[tokio::test]
async fn when_sample_repeats_for_an_id_then_latest_wins() {
    let mut client = support::connect().await;
    let id = identity::generate();

    support::send_sample(&mut client, &id, PositionSample::new(1.0, 1.0, 0)).await;
    support::send_sample(&mut client, &id, PositionSample::new(2.0, 1.0, 1)).await;
    support::send_sample(&mut client, &id, PositionSample::new(3.0, 1.0, 2)).await;

    let table = support::next_table_where(&mut client, |t| {
        t.get(&id) == Some(&PositionSample::new(3.0, 1.0, 2))
    })
    .await;
    assert_eq!(table[&id].x, 3.0);
}

#[tokio::test]
async fn when_payload_is_malformed_then_connection_stays_open() {
    let mut client = support::connect().await;
    let id = identity::generate();

    support::send_raw(&mut client, "definitely not json").await;
    support::send_raw(&mut client, r#"{"id":"","x":1,"y":1,"frame":0}"#).await;
    support::send_raw(&mut client, r#"{"id":"someone","x":"far","y":1,"frame":0}"#).await;
    client
        .send(tokio_tungstenite::tungstenite::Message::binary(vec![1u8, 2, 3]))
        .await
        .expect("send binary frame");

    // A valid sample after the garbage is still relayed on the same socket.
    support::send_sample(&mut client, &id, PositionSample::new(7.0, 8.0, 9)).await;
    let table = support::next_table_where(&mut client, |t| t.contains_key(&id)).await;

    assert_eq!(table[&id], PositionSample::new(7.0, 8.0, 9));
    assert!(!table.contains_key("someone"));
}

#[tokio::test]
async fn when_frame_arrives_as_string_then_table_carries_a_number() {
    let mut client = support::connect().await;
    let id = identity::generate();

    support::send_raw(
        &mut client,
        &format!(r#"{{"id":"{id}","x":5,"y":6,"frame":"4"}}"#),
    )
    .await;

    let table = support::next_table_where(&mut client, |t| t.contains_key(&id)).await;
    assert_eq!(table[&id], PositionSample::new(5.0, 6.0, 4));
}

#[tokio::test]
async fn when_participant_disconnects_then_next_table_omits_it() {
    let mut leaving = support::connect().await;
    let mut staying = support::connect().await;
    let x = identity::generate();
    let y = identity::generate();

    support::send_sample(&mut leaving, &x, PositionSample::new(1.0, 2.0, 0)).await;
    support::send_sample(&mut staying, &y, PositionSample::new(3.0, 4.0, 0)).await;
    support::next_table_where(&mut staying, |t| t.contains_key(&x) && t.contains_key(&y)).await;

    leaving.close(None).await.expect("close leaving socket");
    drop(leaving);

    let table = support::next_table_where(&mut staying, |t| !t.contains_key(&x)).await;
    assert!(table.contains_key(&y));
}

#[tokio::test]
async fn when_client_joins_then_it_receives_the_current_table() {
    let mut mover = support::connect().await;
    let id = identity::generate();
    support::send_sample(&mut mover, &id, PositionSample::new(10.0, 20.0, 3)).await;
    support::next_table_where(&mut mover, |t| t.contains_key(&id)).await;

    // The mover stays connected but idle; a late joiner still learns about it.
    let mut joiner = support::connect().await;
    let table = support::next_table_where(&mut joiner, |t| t.contains_key(&id)).await;

    assert_eq!(table[&id], PositionSample::new(10.0, 20.0, 3));
}

#[tokio::test]
async fn health_reports_participants_and_connections() {
    let mut client = support::connect().await;
    let id = identity::generate();
    support::send_sample(&mut client, &id, PositionSample::new(0.0, 0.0, 0)).await;
    support::next_table_where(&mut client, |t| t.contains_key(&id)).await;

    let res = reqwest::get(format!("{}/health", support::http_url()))
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = res.json().await.expect("json body");
    assert!(body["participants"].as_u64().expect("participants") >= 1);
    assert!(body["connections"].as_u64().expect("connections") >= 1);
}
