//! End-to-end scenarios driven directly against a spawned `RoomHandle`,
//! exercising the turn coordinator, vote flows, and the clock without any
//! websocket transport in the loop.
//!
//! The real analysis engine binary is never assumed to be on `PATH`; these
//! tests point `Config::engine` at a tiny shell script that speaks just
//! enough of the line-oriented protocol `room::engine::EngineAdapter`
//! expects (uci/isready handshake, then `bestmove <first searchmove>`).

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use teamchess_room_server::config::Config;
use teamchess_room_server::protocol::{
    ClientMessage, EndReason, PlayerId, PlayerSide, ServerMessage, TeamVoteKind,
};
use teamchess_room_server::room::{Emit, RoomActor, RoomHandle};

fn fake_engine_path() -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!(
        "teamchess-fake-engine-{}-{:?}",
        std::process::id(),
        std::thread::current().id()
    ));
    if !path.exists() {
        let script = r#"#!/bin/sh
while IFS= read -r line; do
  case "$line" in
    uci) echo uciok ;;
    isready) echo readyok ;;
    go\ depth*)
      mv=$(echo "$line" | sed -n 's/.*searchmoves \([^ ]*\).*/\1/p')
      echo "bestmove $mv"
      ;;
    *) ;;
  esac
done
"#;
        let mut file = std::fs::File::create(&path).expect("write fake engine script");
        file.write_all(script.as_bytes()).expect("write script body");
        let mut perms = file.metadata().unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod fake engine script");
    }
    path
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.engine.command = fake_engine_path().to_string_lossy().into_owned();
    config.engine.args = Vec::new();
    config
}

async fn spawn_room() -> RoomHandle {
    RoomActor::spawn(test_config()).await
}

async fn connect(room: &RoomHandle, name: &str) -> PlayerId {
    let emits = room.connect(None, Some(name.to_string())).await.unwrap();
    match emits.first() {
        Some(Emit {
            message: ServerMessage::Session { id, .. },
            ..
        }) => id.clone(),
        _ => panic!("connect did not answer with a Session message"),
    }
}

async fn join(room: &RoomHandle, pid: &PlayerId, side: PlayerSide) {
    room.dispatch(pid.clone(), ClientMessage::JoinSide { side })
        .await
        .unwrap();
}

async fn play(room: &RoomHandle, pid: &PlayerId, lan: &str) -> Vec<Emit> {
    room.dispatch(pid.clone(), ClientMessage::PlayMove(lan.to_string()))
        .await
        .unwrap()
}

fn find_game_over(emits: &[Emit]) -> Option<&ServerMessage> {
    emits
        .iter()
        .map(|emit| &emit.message)
        .find(|message| matches!(message, ServerMessage::GameOver { .. }))
}

#[tokio::test]
async fn fools_mate_finalizes_with_checkmate() {
    let room = spawn_room().await;
    let white = connect(&room, "Alice").await;
    let black = connect(&room, "Bo").await;
    join(&room, &white, PlayerSide::White).await;
    join(&room, &black, PlayerSide::Black).await;

    play(&room, &white, "f2f3").await;
    play(&room, &black, "e7e5").await;
    play(&room, &white, "g2g4").await;
    let emits = play(&room, &black, "d8h4").await;

    let game_over = find_game_over(&emits).expect("checkmate should end the game");
    match game_over {
        ServerMessage::GameOver { reason, winner, .. } => {
            assert_eq!(*reason, EndReason::Checkmate);
            assert_eq!(*winner, Some(PlayerSide::Black));
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn turn_finalizes_without_waiting_on_an_offline_teammate() {
    let room = spawn_room().await;
    let white_a = connect(&room, "Alice").await;
    let white_b = connect(&room, "Ahmed").await;
    let black = connect(&room, "Bo").await;
    join(&room, &white_a, PlayerSide::White).await;
    join(&room, &white_b, PlayerSide::White).await;
    join(&room, &black, PlayerSide::Black).await;

    // Alice's proposal alone is not enough while Ahmed is still online.
    let emits = play(&room, &white_a, "g1f3").await;
    assert!(
        find_game_over(&emits).is_none() && !has_turn_change(&emits),
        "turn should not finalize while an online teammate has not proposed"
    );

    // Ahmed drops without ever proposing; his absence must not block the turn
    // finalizing on Alice's proposal alone (spec §4.6, rules::should_finalize
    // only waits on online teammates).
    let emits = room
        .dispatch(white_b.clone(), ClientMessage::Disconnect)
        .await
        .unwrap();
    assert!(
        has_turn_change(&emits),
        "losing the only other online white player should finalize the pending turn"
    );

    // Play continues normally from there.
    let emits = play(&room, &black, "b8c6").await;
    assert!(has_turn_change(&emits), "black's reply should finalize its own turn");
}

fn has_turn_change(emits: &[Emit]) -> bool {
    emits
        .iter()
        .any(|emit| matches!(emit.message, ServerMessage::TurnChange { .. }))
}

#[tokio::test]
async fn kick_vote_passes_on_majority() {
    let room = spawn_room().await;
    let p1 = connect(&room, "P1").await;
    let p2 = connect(&room, "P2").await;
    let target = connect(&room, "Target").await;

    room.dispatch(
        p1.clone(),
        ClientMessage::StartKickVote {
            target: target.clone(),
        },
    )
    .await
    .unwrap();

    let emits = room
        .dispatch(p2.clone(), ClientMessage::VoteKick { yes: true })
        .await
        .unwrap();

    let kicked = emits.iter().any(|emit| {
        emit.to == teamchess_room_server::room::Recipient::Only(target.clone())
            && matches!(emit.message, ServerMessage::Kicked { .. })
    });
    assert!(kicked, "target should receive a Kicked message once the vote passes");
}

#[tokio::test]
async fn kick_vote_fails_early_once_majority_is_unreachable() {
    let room = spawn_room().await;
    let p1 = connect(&room, "P1").await;
    let p2 = connect(&room, "P2").await;
    let p3 = connect(&room, "P3").await;
    let p4 = connect(&room, "P4").await;
    let target = connect(&room, "Target").await;

    // 5 connected, required = 5/2 + 1 = 3, eligible = {p1, p2, p3, p4}.
    room.dispatch(
        p1.clone(),
        ClientMessage::StartKickVote {
            target: target.clone(),
        },
    )
    .await
    .unwrap();

    room.dispatch(p2.clone(), ClientMessage::VoteKick { yes: false })
        .await
        .unwrap();
    let emits = room
        .dispatch(p3.clone(), ClientMessage::VoteKick { yes: false })
        .await
        .unwrap();

    let failed_chat = emits.iter().any(|emit| {
        matches!(&emit.message, ServerMessage::ChatMessage { message, system, .. } if *system && message.contains("failed"))
    });
    assert!(failed_chat, "vote should fail once two no votes make a majority impossible");

    // The vote is gone: p4 casting a ballot now finds nothing to join.
    let result = room
        .dispatch(p4.clone(), ClientMessage::VoteKick { yes: true })
        .await;
    assert!(matches!(
        result,
        Err(teamchess_room_server::protocol::ErrorCode::VoteIneligibleJoinedLate)
    ));
}

#[tokio::test]
async fn draw_offer_is_accepted_through_the_full_cycle() {
    let room = spawn_room().await;
    let white = connect(&room, "Alice").await;
    let black = connect(&room, "Bo").await;
    join(&room, &white, PlayerSide::White).await;
    join(&room, &black, PlayerSide::Black).await;

    play(&room, &white, "g1f3").await;

    let emits = room
        .dispatch(
            white.clone(),
            ClientMessage::StartTeamVote {
                vote_type: TeamVoteKind::OfferDraw,
            },
        )
        .await
        .unwrap();
    let offer_posted = emits
        .iter()
        .any(|emit| matches!(emit.message, ServerMessage::DrawOfferUpdate { side: Some(PlayerSide::White) }));
    assert!(offer_posted, "solo white team auto-executes its draw offer");

    let emits = room
        .dispatch(black.clone(), ClientMessage::VoteTeam { yes: true })
        .await
        .unwrap();
    let game_over = find_game_over(&emits).expect("unanimous accept-draw should end the game");
    match game_over {
        ServerMessage::GameOver { reason, winner, .. } => {
            assert_eq!(*reason, EndReason::DrawAgreement);
            assert_eq!(*winner, None);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn flagging_ends_the_game_in_a_timeout_loss() {
    let mut config = test_config();
    config.room.default_clock_seconds = 1;
    let room = RoomActor::spawn(config).await;

    let white = connect(&room, "Alice").await;
    let black = connect(&room, "Bo").await;
    join(&room, &white, PlayerSide::White).await;
    join(&room, &black, PlayerSide::Black).await;

    // White's opening move finalizes instantly (solo team); black's 1-second
    // clock then starts running and nothing stops it from reaching zero.
    play(&room, &white, "g1f3").await;

    tokio::time::sleep(Duration::from_millis(1500)).await;

    // A fresh connection mid-game replays current status, including any
    // terminal `GameOver`, as part of its connect handshake (spec §4.6).
    let emits = room.connect(None, Some("Spectator".to_string())).await.unwrap();
    let game_over = find_game_over(&emits).expect("black should have flagged by now");
    match game_over {
        ServerMessage::GameOver { reason, winner, .. } => {
            assert_eq!(*reason, EndReason::Timeout);
            assert_eq!(*winner, Some(PlayerSide::White));
        }
        _ => unreachable!(),
    }
}
