//! The room's single executor (spec §5 "single-threaded cooperative state
//! machine"). `RoomActor::run` owns every piece of mutable room state and
//! processes one [`RoomCommand`] at a time; nothing outside this module ever
//! touches [`RoomState`] or [`Sessions`] directly.
//!
//! Grounded on the actor-less `room_service.rs` command dispatch shape from
//! the wider signaling-server lineage this crate grew out of, rebuilt around
//! an owned `mpsc` loop since this crate's room has no distributed
//! coordinator to delegate to (see DESIGN.md).

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};

use crate::chess::ChessError;
use crate::config::Config;
use crate::protocol::{
    ClientMessage, EndReason, ErrorCode, PlayerId, PlayerSide, ProposalEntry, RoomStatus,
    ServerMessage, TeamVoteKind,
};
use crate::room::clock;
use crate::room::engine::EngineAdapter;
use crate::room::rules;
use crate::room::session::{Session, Sessions};
use crate::room::state::RoomState;
use crate::room::timer::{self, TimerHandle};
use crate::room::votes::kick::{self, KickVote, KickVotePrereqRejection, KickVoteStep};
use crate::room::votes::reset::{self, ResetVote, ResetVotePrereqRejection, ResetVoteStep};
use crate::room::votes::team::{self, TeamVote, TeamVotePrereqRejection, TeamVoteStep};

/// Who an [`Emit`] should be delivered to. Keeping "what changed" (this type)
/// separate from "how to deliver it" lets tests assert on a message log
/// instead of a live transport (spec §9 design note).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    All,
    Team(PlayerSide),
    Only(PlayerId),
}

#[derive(Debug, Clone)]
pub struct Emit {
    pub to: Recipient,
    pub message: ServerMessage,
}

impl Emit {
    pub fn all(message: ServerMessage) -> Self {
        Self {
            to: Recipient::All,
            message,
        }
    }

    pub fn team(side: PlayerSide, message: ServerMessage) -> Self {
        Self {
            to: Recipient::Team(side),
            message,
        }
    }

    pub fn only(pid: PlayerId, message: ServerMessage) -> Self {
        Self {
            to: Recipient::Only(pid),
            message,
        }
    }
}

/// Inbound commands accepted by the actor: the external events of spec §6,
/// plus the internal timer-fired events a [`TimerHandle`] schedules back onto
/// this same channel.
#[derive(Debug)]
pub enum RoomCommand {
    Connect {
        pid: Option<PlayerId>,
        name: Option<String>,
    },
    SetName {
        pid: PlayerId,
        name: String,
    },
    JoinSide {
        pid: PlayerId,
        side: PlayerSide,
    },
    PlayMove {
        pid: PlayerId,
        lan: String,
    },
    ChatMessage {
        pid: PlayerId,
        text: String,
    },
    StartTeamVote {
        pid: PlayerId,
        kind: TeamVoteKind,
    },
    VoteTeam {
        pid: PlayerId,
        yes: bool,
    },
    StartKickVote {
        pid: PlayerId,
        target: PlayerId,
    },
    VoteKick {
        pid: PlayerId,
        yes: bool,
    },
    StartResetVote {
        pid: PlayerId,
    },
    VoteReset {
        pid: PlayerId,
        yes: bool,
    },
    Disconnect {
        pid: PlayerId,
    },
    DisconnectGraceElapsed {
        pid: PlayerId,
    },
    ClockTick,
    TeamVoteDeadline {
        side: PlayerSide,
    },
    KickVoteDeadline,
    ResetVoteDeadline,
}

pub struct RoomEnvelope {
    pub command: RoomCommand,
    pub reply: Option<oneshot::Sender<Result<Vec<Emit>, ErrorCode>>>,
}

/// A cheap-to-clone reference to a running room, handed to the websocket
/// layer (spec §9: "no hidden globals — one instance per room process").
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomEnvelope>,
}

impl RoomHandle {
    async fn call(&self, command: RoomCommand) -> Result<Vec<Emit>, ErrorCode> {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(RoomEnvelope {
                command,
                reply: Some(tx),
            })
            .await
            .is_err()
        {
            return Err(ErrorCode::InternalError);
        }
        rx.await.unwrap_or(Err(ErrorCode::InternalError))
    }

    /// Connect/reconnect. On success the first element of the returned log is
    /// always `ServerMessage::Session{id, ..}` addressed to the resolved pid
    /// — callers read it back to learn which identity was assigned.
    pub async fn connect(
        &self,
        pid: Option<PlayerId>,
        name: Option<String>,
    ) -> Result<Vec<Emit>, ErrorCode> {
        self.call(RoomCommand::Connect { pid, name }).await
    }

    pub async fn dispatch(
        &self,
        pid: PlayerId,
        message: ClientMessage,
    ) -> Result<Vec<Emit>, ErrorCode> {
        let command = match message {
            ClientMessage::SetName(name) => RoomCommand::SetName { pid, name },
            ClientMessage::JoinSide { side } => RoomCommand::JoinSide { pid, side },
            ClientMessage::PlayMove(lan) => RoomCommand::PlayMove { pid, lan },
            ClientMessage::ChatMessage(text) => RoomCommand::ChatMessage { pid, text },
            ClientMessage::StartTeamVote { vote_type } => {
                RoomCommand::StartTeamVote { pid, kind: vote_type }
            }
            ClientMessage::VoteTeam { yes } => RoomCommand::VoteTeam { pid, yes },
            ClientMessage::StartKickVote { target } => {
                RoomCommand::StartKickVote { pid, target }
            }
            ClientMessage::VoteKick { yes } => RoomCommand::VoteKick { pid, yes },
            ClientMessage::StartResetVote => RoomCommand::StartResetVote { pid },
            ClientMessage::VoteReset { yes } => RoomCommand::VoteReset { pid, yes },
            ClientMessage::Disconnect => RoomCommand::Disconnect { pid },
            ClientMessage::Ping => return Ok(vec![Emit::only(pid, ServerMessage::Pong)]),
        };
        self.call(command).await
    }
}

pub struct RoomActor {
    state: RoomState,
    sessions: Sessions,
    engine: Option<EngineAdapter>,
    config: Config,
    self_sender: mpsc::Sender<RoomEnvelope>,
    clock_timer: Option<TimerHandle>,
    disconnect_timers: HashMap<PlayerId, TimerHandle>,
}

fn fire_and_forget(command: RoomCommand) -> RoomEnvelope {
    RoomEnvelope {
        command,
        reply: None,
    }
}

impl RoomActor {
    /// Build and spawn a room, returning a handle to it. The analysis engine
    /// is spawned best-effort: if it fails to start, the room still runs but
    /// every turn finalization will surface `EngineUnavailable`-adjacent
    /// behavior (spec §9 "crash of the engine ... should surface as a
    /// turn-finalization failure that reverts to AwaitingProposals").
    pub async fn spawn(config: Config) -> RoomHandle {
        let engine = match EngineAdapter::spawn(&config.engine).await {
            Ok(engine) => Some(engine),
            Err(err) => {
                tracing::warn!(error = %err, "starting room without a working analysis engine");
                None
            }
        };

        let (tx, rx) = mpsc::channel(256);
        let actor = Self {
            state: RoomState::new(config.room.default_clock_seconds),
            sessions: Sessions::new(),
            engine,
            config,
            self_sender: tx.clone(),
            clock_timer: None,
            disconnect_timers: HashMap::new(),
        };
        tokio::spawn(actor.run(rx));
        RoomHandle { sender: tx }
    }

    async fn run(mut self, mut receiver: mpsc::Receiver<RoomEnvelope>) {
        while let Some(envelope) = receiver.recv().await {
            let result = self.handle(envelope.command).await;
            if let Some(reply) = envelope.reply {
                let _ = reply.send(result);
            }
        }
    }

    async fn handle(&mut self, command: RoomCommand) -> Result<Vec<Emit>, ErrorCode> {
        match command {
            RoomCommand::Connect { pid, name } => self.connect(pid, name).await,
            RoomCommand::SetName { pid, name } => self.set_name(pid, name).await,
            RoomCommand::JoinSide { pid, side } => self.join_side(pid, side).await,
            RoomCommand::PlayMove { pid, lan } => self.submit_proposal(pid, lan).await,
            RoomCommand::ChatMessage { pid, text } => self.chat_message(pid, text).await,
            RoomCommand::StartTeamVote { pid, kind } => self.start_team_vote(pid, kind).await,
            RoomCommand::VoteTeam { pid, yes } => self.vote_team(pid, yes).await,
            RoomCommand::StartKickVote { pid, target } => {
                self.start_kick_vote(pid, target).await
            }
            RoomCommand::VoteKick { pid, yes } => self.vote_kick(pid, yes).await,
            RoomCommand::StartResetVote { pid } => self.start_reset_vote(pid).await,
            RoomCommand::VoteReset { pid, yes } => self.vote_reset(pid, yes).await,
            RoomCommand::Disconnect { pid } => Ok(self.disconnect(pid).await),
            RoomCommand::DisconnectGraceElapsed { pid } => {
                Ok(self.disconnect_grace_elapsed(pid).await)
            }
            RoomCommand::ClockTick => Ok(self.clock_tick().await),
            RoomCommand::TeamVoteDeadline { side } => Ok(self.team_vote_deadline(side).await),
            RoomCommand::KickVoteDeadline => Ok(self.kick_vote_deadline().await),
            RoomCommand::ResetVoteDeadline => Ok(self.reset_vote_deadline().await),
        }
    }

    // ---- timer scheduling -------------------------------------------------

    fn schedule_deadline(&self, after: Duration, command: RoomCommand) -> TimerHandle {
        timer::spawn_deadline(after, self.self_sender.clone(), move || {
            fire_and_forget(command)
        })
    }

    /// Start or stop the per-second clock timer to match `rules::clock_should_run`.
    fn sync_clock(&mut self) {
        let should_run =
            rules::clock_should_run(self.state.status, &self.state.white_ids, &self.state.black_ids);
        match (should_run, self.clock_timer.is_some()) {
            (true, false) => {
                let sender = self.self_sender.clone();
                self.clock_timer = Some(timer::spawn_interval(Duration::from_secs(1), sender, || {
                    fire_and_forget(RoomCommand::ClockTick)
                }));
            }
            (false, true) => {
                if let Some(timer) = self.clock_timer.take() {
                    timer.cancel();
                }
            }
            _ => {}
        }
    }

    // ---- broadcasts shared by several handlers -----------------------------

    fn roster_emit(&self) -> Emit {
        Emit::all(ServerMessage::Players {
            spectators: self.sessions.roster(PlayerSide::Spectator),
            white_players: self.sessions.roster(PlayerSide::White),
            black_players: self.sessions.roster(PlayerSide::Black),
        })
    }

    fn team_vote_active_emit(vote: &TeamVote) -> Emit {
        Emit::team(
            vote.side,
            ServerMessage::TeamVoteUpdate {
                is_active: true,
                vote_type: vote.kind,
                initiator_name: vote.initiator_name.clone(),
                yes_votes: vote.yes_voters.iter().cloned().collect(),
                required_votes: vote.required,
                end_time: vote.deadline,
            },
        )
    }

    fn team_vote_cleared_emit(side: PlayerSide, kind: TeamVoteKind) -> Emit {
        Emit::team(
            side,
            ServerMessage::TeamVoteUpdate {
                is_active: false,
                vote_type: kind,
                initiator_name: String::new(),
                yes_votes: Vec::new(),
                required_votes: 0,
                end_time: Utc::now(),
            },
        )
    }

    fn kick_vote_emits(&self) -> Vec<Emit> {
        self.sessions
            .iter()
            .map(|session| {
                let message = match &self.state.kick_vote {
                    Some(vote) => ServerMessage::KickVoteUpdate {
                        is_active: true,
                        target_id: vote.target.clone(),
                        target_name: vote.target_name.clone(),
                        yes_votes: vote.yes.len(),
                        no_votes: vote.no.len(),
                        required_votes: vote.required,
                        end_time: vote.deadline,
                        my_vote_eligible: vote.eligible_voters.contains(&session.pid),
                        my_current_vote: if vote.yes.contains(&session.pid) {
                            Some(true)
                        } else if vote.no.contains(&session.pid) {
                            Some(false)
                        } else {
                            None
                        },
                        am_target: vote.target == session.pid,
                    },
                    None => ServerMessage::KickVoteUpdate {
                        is_active: false,
                        target_id: session.pid.clone(),
                        target_name: String::new(),
                        yes_votes: 0,
                        no_votes: 0,
                        required_votes: 0,
                        end_time: Utc::now(),
                        my_vote_eligible: false,
                        my_current_vote: None,
                        am_target: false,
                    },
                };
                Emit::only(session.pid.clone(), message)
            })
            .collect()
    }

    fn reset_vote_emits(&self) -> Vec<Emit> {
        self.sessions
            .iter()
            .map(|session| {
                let message = match &self.state.reset_vote {
                    Some(vote) => ServerMessage::ResetVoteUpdate {
                        is_active: true,
                        yes_votes: vote.yes.len(),
                        required_votes: vote.required,
                        end_time: vote.deadline,
                        my_vote_eligible: vote.eligible_voters.contains(&session.pid),
                        my_current_vote: vote.yes.contains(&session.pid).then_some(true),
                    },
                    None => ServerMessage::ResetVoteUpdate {
                        is_active: false,
                        yes_votes: 0,
                        required_votes: 0,
                        end_time: Utc::now(),
                        my_vote_eligible: false,
                        my_current_vote: None,
                    },
                };
                Emit::only(session.pid.clone(), message)
            })
            .collect()
    }

    // ---- connection lifecycle (spec §4.6) ---------------------------------

    async fn connect(
        &mut self,
        pid: Option<PlayerId>,
        name: Option<String>,
    ) -> Result<Vec<Emit>, ErrorCode> {
        if let Some(requested) = &pid {
            if self.state.blacklist.contains(requested) {
                return Err(ErrorCode::Blacklisted);
            }
        }
        let resolved = pid.unwrap_or_else(PlayerId::generate);

        if self.sessions.contains(&resolved) {
            if let Some(timer) = self.disconnect_timers.remove(&resolved) {
                timer.cancel();
            }
            let session = self.sessions.get_mut(&resolved).expect("just checked contains");
            session.connected = true;
            session.disconnect_grace_deadline = None;
            if let Some(normalized) = name.and_then(|raw| self.config.player_name.normalize(&raw)) {
                session.name = normalized;
            }
        } else {
            let display_name = name
                .and_then(|raw| self.config.player_name.normalize(&raw))
                .unwrap_or_else(|| "Player".to_string());
            self.sessions.insert(Session::new(resolved.clone(), display_name));
        }

        let session = self.sessions.get(&resolved).expect("session just inserted");
        let mut emits = vec![
            Emit::only(
                resolved.clone(),
                ServerMessage::Session {
                    id: resolved.clone(),
                    name: session.name.clone(),
                },
            ),
            Emit::only(
                resolved.clone(),
                ServerMessage::GameStatusUpdate {
                    status: self.state.status,
                },
            ),
            Emit::only(
                resolved.clone(),
                ServerMessage::ClockUpdate {
                    white_time: self.state.white_time,
                    black_time: self.state.black_time,
                },
            ),
        ];

        if self.state.status != RoomStatus::Lobby {
            emits.push(Emit::only(
                resolved.clone(),
                ServerMessage::GameStarted {
                    move_number: self.state.move_number,
                    side: self.state.side,
                    proposals: self.proposal_entries(),
                },
            ));
            emits.push(Emit::only(
                resolved.clone(),
                ServerMessage::PositionUpdate {
                    fen: self.state.chess.fen(),
                },
            ));
            if let Some(offer_side) = self.state.draw_offer {
                emits.push(Emit::only(
                    resolved.clone(),
                    ServerMessage::DrawOfferUpdate {
                        side: Some(offer_side),
                    },
                ));
            }
        }
        if self.state.status == RoomStatus::Over {
            if let Some(reason) = self.state.end_reason {
                emits.push(Emit::only(
                    resolved.clone(),
                    ServerMessage::GameOver {
                        reason,
                        winner: self.state.end_winner,
                        pgn: self.state.chess.to_pgn(reason, self.state.end_winner),
                    },
                ));
            }
        }

        emits.push(self.roster_emit());
        Ok(emits)
    }

    fn proposal_entries(&self) -> Vec<ProposalEntry> {
        self.state
            .proposals
            .iter()
            .map(|(pid, proposal)| ProposalEntry {
                id: pid.clone(),
                name: proposal.name.clone(),
                lan: proposal.lan.clone(),
                san: proposal.san.clone(),
            })
            .collect()
    }

    async fn disconnect(&mut self, pid: PlayerId) -> Vec<Emit> {
        let Some(session) = self.sessions.get_mut(&pid) else {
            return Vec::new();
        };
        session.connected = false;
        let grace = Duration::from_secs(self.config.room.reconnect_grace_secs);
        session.disconnect_grace_deadline = Some(Utc::now() + chrono::Duration::seconds(grace.as_secs() as i64));

        let timer = self.schedule_deadline(grace, RoomCommand::DisconnectGraceElapsed { pid: pid.clone() });
        self.disconnect_timers.insert(pid, timer);

        let mut emits = vec![self.roster_emit()];
        emits.extend(self.after_membership_change().await);
        emits
    }

    async fn disconnect_grace_elapsed(&mut self, pid: PlayerId) -> Vec<Emit> {
        self.disconnect_timers.remove(&pid);
        if self.sessions.remove(&pid).is_none() {
            return Vec::new();
        }
        self.state.white_ids.remove(&pid);
        self.state.black_ids.remove(&pid);

        let mut emits = vec![self.roster_emit()];
        emits.extend(self.after_membership_change().await);
        emits
    }

    /// Re-check abandonment then finalization after any change to team
    /// membership or connectivity (spec §4.1 "finalization check", §4.6
    /// "Disconnect").
    async fn after_membership_change(&mut self) -> Vec<Emit> {
        let mut emits = Vec::new();
        if rules::is_abandoned(self.state.status, &self.state.white_ids, &self.state.black_ids) {
            let winner = if self.state.white_ids.is_empty() {
                Some(PlayerSide::Black)
            } else {
                Some(PlayerSide::White)
            };
            emits.extend(self.end_game(EndReason::Abandonment, winner).await);
            self.sync_clock();
            return emits;
        }
        self.sync_clock();
        if self.state.status == RoomStatus::AwaitingProposals {
            let active_online = self.sessions.connected_on_side(self.state.side);
            if rules::should_finalize(self.state.status, &active_online, &self.state.proposals) {
                emits.extend(self.finalize_turn().await);
            }
        }
        emits
    }

    async fn set_name(&mut self, pid: PlayerId, raw: String) -> Result<Vec<Emit>, ErrorCode> {
        let Some(name) = self.config.player_name.normalize(&raw) else {
            return Ok(Vec::new());
        };
        let session = self.sessions.get_mut(&pid).ok_or(ErrorCode::InternalError)?;
        session.name = name;
        Ok(vec![self.roster_emit()])
    }

    async fn join_side(&mut self, pid: PlayerId, side: PlayerSide) -> Result<Vec<Emit>, ErrorCode> {
        {
            let session = self.sessions.get_mut(&pid).ok_or(ErrorCode::InternalError)?;
            session.side = side;
        }
        if self.state.status != RoomStatus::Lobby {
            self.state.white_ids.remove(&pid);
            self.state.black_ids.remove(&pid);
            match side {
                PlayerSide::White => {
                    self.state.white_ids.insert(pid);
                }
                PlayerSide::Black => {
                    self.state.black_ids.insert(pid);
                }
                PlayerSide::Spectator => {}
            }
        }
        let mut emits = vec![self.roster_emit()];
        emits.extend(self.after_membership_change().await);
        Ok(emits)
    }

    async fn chat_message(&mut self, pid: PlayerId, text: String) -> Result<Vec<Emit>, ErrorCode> {
        let session = self.sessions.get(&pid).ok_or(ErrorCode::InternalError)?;
        Ok(vec![Emit::all(ServerMessage::ChatMessage {
            sender: session.name.clone(),
            sender_id: Some(pid),
            message: text,
            system: false,
        })])
    }

    // ---- turn coordinator (spec §4.1) -------------------------------------

    async fn submit_proposal(&mut self, pid: PlayerId, lan: String) -> Result<Vec<Emit>, ErrorCode> {
        let (side, name) = {
            let session = self.sessions.get(&pid).ok_or(ErrorCode::InternalError)?;
            (session.side, session.name.clone())
        };

        let mut emits = Vec::new();
        match self.state.status {
            RoomStatus::Lobby => {
                if side != PlayerSide::White {
                    return Err(ErrorCode::OnlyWhiteCanStart);
                }
                if self.sessions.roster(PlayerSide::Black).is_empty() {
                    return Err(ErrorCode::BothTeamsRequired);
                }
                self.state.white_ids = self
                    .sessions
                    .roster(PlayerSide::White)
                    .into_iter()
                    .map(|entry| entry.id)
                    .collect();
                self.state.black_ids = self
                    .sessions
                    .roster(PlayerSide::Black)
                    .into_iter()
                    .map(|entry| entry.id)
                    .collect();
                self.state.status = RoomStatus::AwaitingProposals;
                emits.push(Emit::all(ServerMessage::GameStatusUpdate {
                    status: self.state.status,
                }));
                emits.push(Emit::all(ServerMessage::GameStarted {
                    move_number: self.state.move_number,
                    side: self.state.side,
                    proposals: Vec::new(),
                }));
                self.sync_clock();
                emits.push(Emit::all(ServerMessage::ClockUpdate {
                    white_time: self.state.white_time,
                    black_time: self.state.black_time,
                }));
            }
            RoomStatus::AwaitingProposals => {
                let active_side = self.state.side;
                if side != active_side {
                    return Err(ErrorCode::NotYourTurn);
                }
                if !self.state.team_ids(active_side).is_some_and(|ids| ids.contains(&pid)) {
                    return Err(ErrorCode::NotYourTurn);
                }
                if self.state.proposals.contains_key(&pid) {
                    return Err(ErrorCode::AlreadyMoved);
                }
            }
            RoomStatus::FinalizingTurn | RoomStatus::Over => {
                return Err(ErrorCode::NotAcceptingProposals);
            }
        }

        let (_, san) = self.state.chess.validate_lan(&lan).map_err(|err| match err {
            ChessError::IllegalFormat => ErrorCode::IllegalFormat,
            ChessError::IllegalMove => ErrorCode::IllegalMove,
        })?;

        self.state.proposals.insert(
            pid.clone(),
            crate::protocol::Proposal {
                lan: lan.clone(),
                san: san.clone(),
                name: name.clone(),
            },
        );
        emits.push(Emit::all(ServerMessage::MoveSubmitted {
            id: pid.clone(),
            name,
            move_number: self.state.move_number,
            side: self.state.side,
            lan,
            san,
        }));

        // Open Question 4 (SPEC_FULL §12.4): a proposal clears an opposing draw offer.
        if let Some(offer_side) = self.state.draw_offer {
            if offer_side != self.state.side {
                self.state.draw_offer = None;
                emits.push(Emit::all(ServerMessage::DrawOfferUpdate { side: None }));
                emits.push(Emit::all(ServerMessage::system_chat(
                    "The pending draw offer was withdrawn.",
                )));
            }
        }

        let active_online = self.sessions.connected_on_side(self.state.side);
        if rules::should_finalize(self.state.status, &active_online, &self.state.proposals) {
            emits.extend(self.finalize_turn().await);
        }

        Ok(emits)
    }

    async fn finalize_turn(&mut self) -> Vec<Emit> {
        self.state.status = RoomStatus::FinalizingTurn;
        self.sync_clock();
        let mut emits = vec![Emit::all(ServerMessage::GameStatusUpdate {
            status: self.state.status,
        })];

        let fen = self.state.chess.fen();
        let candidates: Vec<String> = self.state.proposals.values().map(|p| p.lan.clone()).collect();

        let chosen = match &mut self.engine {
            Some(engine) => engine.choose_best_move(&fen, &candidates).await,
            None => {
                tracing::warn!("no analysis engine available to finalize a turn");
                Err(crate::room::engine::EngineError::Closed)
            }
        };

        let lan = match chosen {
            Ok(lan) => lan,
            Err(err) => {
                tracing::warn!(error = %err, "analysis engine failed during finalization");
                emits.push(Emit::all(ServerMessage::error(ErrorCode::EngineUnavailable)));
                return self.revert_to_awaiting_proposals(emits);
            }
        };

        let (mv, san) = match self.state.chess.validate_lan(&lan) {
            Ok(pair) => pair,
            Err(_) => {
                // Open Question 3 (SPEC_FULL §12.3): engine returned a move the
                // rules library rejects.
                tracing::warn!(%lan, "analysis engine returned an illegal move");
                return self.revert_to_awaiting_proposals(emits);
            }
        };
        if self.state.chess.apply(&mv).is_err() {
            tracing::warn!(%lan, "rules library rejected applying its own validated move");
            return self.revert_to_awaiting_proposals(emits);
        }

        let side = self.state.side;
        let move_number = self.state.move_number;
        let (winner_id, winner_name) = self
            .state
            .proposals
            .iter()
            .find(|(_, proposal)| proposal.lan == lan)
            .map(|(pid, proposal)| (pid.clone(), proposal.name.clone()))
            .unwrap_or_else(|| (PlayerId("unknown".into()), String::new()));

        let remaining_after = self.state.remaining_time(side);
        let increment = clock::low_time_increment(
            remaining_after,
            self.config.room.low_time_increment_threshold_secs,
            self.config.room.low_time_increment_secs,
        );
        self.state.set_remaining_time(side, remaining_after + increment);

        let candidates_entries = self.proposal_entries();
        let fen_after = self.state.chess.fen();

        emits.push(Emit::all(ServerMessage::MoveSelected {
            id: winner_id,
            name: winner_name,
            move_number,
            side,
            lan,
            san,
            fen: fen_after.clone(),
            candidates: candidates_entries,
        }));
        emits.push(Emit::all(ServerMessage::ClockUpdate {
            white_time: self.state.white_time,
            black_time: self.state.black_time,
        }));
        emits.push(Emit::all(ServerMessage::PositionUpdate { fen: fen_after }));

        if let Some((reason, winner)) = self.state.chess.game_over_reason() {
            emits.extend(self.end_game(reason, winner).await);
            return emits;
        }

        self.state.proposals.clear();
        self.state.side = side.opponent().expect("team sides always have an opponent");
        self.state.move_number += 1;
        self.state.status = RoomStatus::AwaitingProposals;
        self.sync_clock();
        emits.push(Emit::all(ServerMessage::TurnChange {
            move_number: self.state.move_number,
            side: self.state.side,
        }));
        emits
    }

    fn revert_to_awaiting_proposals(&mut self, mut emits: Vec<Emit>) -> Vec<Emit> {
        self.state.status = RoomStatus::AwaitingProposals;
        self.sync_clock();
        emits.push(Emit::all(ServerMessage::GameStatusUpdate {
            status: self.state.status,
        }));
        emits
    }

    /// Idempotent (spec §4.1 "end-game"; testable property "calling end-game
    /// twice yields the same terminal state as once").
    async fn end_game(&mut self, reason: EndReason, winner: Option<PlayerSide>) -> Vec<Emit> {
        if self.state.status == RoomStatus::Over {
            return Vec::new();
        }
        self.state.status = RoomStatus::Over;
        self.state.end_reason = Some(reason);
        self.state.end_winner = winner;
        self.state.draw_offer = None;
        self.sync_clock();

        if let Some(vote) = self.state.white_vote.take() {
            if let Some(timer) = &vote.timer {
                timer.cancel();
            }
        }
        if let Some(vote) = self.state.black_vote.take() {
            if let Some(timer) = &vote.timer {
                timer.cancel();
            }
        }

        if let Some(engine) = self.engine.take() {
            engine.quit().await;
        }

        let pgn = self.state.chess.to_pgn(reason, winner);
        vec![Emit::all(ServerMessage::GameOver { reason, winner, pgn })]
    }

    // ---- clock (spec §4.2) -------------------------------------------------

    async fn clock_tick(&mut self) -> Vec<Emit> {
        if self.state.status != RoomStatus::AwaitingProposals {
            return Vec::new();
        }
        let side = self.state.side;
        let new_value = clock::decrement(self.state.remaining_time(side));
        self.state.set_remaining_time(side, new_value);

        let mut emits = vec![Emit::all(ServerMessage::ClockUpdate {
            white_time: self.state.white_time,
            black_time: self.state.black_time,
        })];

        if new_value <= 0 {
            let winner = side.opponent();
            emits.extend(self.end_game(EndReason::Timeout, winner).await);
        }
        emits
    }

    // ---- team votes (spec §4.3) --------------------------------------------

    async fn start_team_vote(
        &mut self,
        pid: PlayerId,
        kind: TeamVoteKind,
    ) -> Result<Vec<Emit>, ErrorCode> {
        let (side, name) = {
            let session = self.sessions.get(&pid).ok_or(ErrorCode::InternalError)?;
            (session.side, session.name.clone())
        };
        if !side.is_team() {
            return Err(ErrorCode::NotYourTurn);
        }

        team::prerequisites(kind, self.state.team_vote(side).is_some(), self.state.draw_offer, side)
            .map_err(|err| match err {
                TeamVotePrereqRejection::AlreadyActive => ErrorCode::VoteAlreadyActive,
                TeamVotePrereqRejection::NoOpposingOffer => ErrorCode::NoOpposingDrawOffer,
                TeamVotePrereqRejection::OfferAlreadyPending => ErrorCode::DrawOfferAlreadyPending,
            })?;

        let connected: HashSet<PlayerId> = self.sessions.connected_on_side(side).into_iter().collect();
        if team::should_auto_execute(connected.len(), false) {
            return Ok(self.execute_team_action(kind, side).await);
        }

        let deadline = Utc::now() + chrono::Duration::seconds(self.config.room.team_vote_duration_secs as i64);
        let mut vote = TeamVote::new(kind, side, Some((&pid, &name)), connected, false, deadline);
        let passed_immediately = vote.is_immediately_passed();
        vote.timer = Some(self.schedule_deadline(
            Duration::from_secs(self.config.room.team_vote_duration_secs),
            RoomCommand::TeamVoteDeadline { side },
        ));

        let mut emits = vec![Self::team_vote_active_emit(&vote)];
        *self.state.team_vote_slot(side) = Some(vote);
        if passed_immediately {
            emits.extend(self.pass_team_vote(side).await);
        }
        Ok(emits)
    }

    async fn vote_team(&mut self, pid: PlayerId, yes: bool) -> Result<Vec<Emit>, ErrorCode> {
        let side = self.sessions.get(&pid).ok_or(ErrorCode::InternalError)?.side;
        let vote = self
            .state
            .team_vote(side)
            .ok_or(ErrorCode::VoteIneligibleJoinedLate)?;
        let step = team::cast_vote(&vote.eligible_voters, &vote.yes_voters, vote.required, &pid, yes);
        match step {
            TeamVoteStep::Ineligible => Err(ErrorCode::VoteIneligibleJoinedLate),
            TeamVoteStep::Failed => Ok(self.fail_team_vote(side).await),
            TeamVoteStep::Passed => Ok(self.pass_team_vote(side).await),
            TeamVoteStep::Continuing(yes_voters) => {
                if let Some(vote) = self.state.team_vote_slot(side).as_mut() {
                    vote.yes_voters = yes_voters;
                }
                Ok(vec![Self::team_vote_active_emit(
                    self.state.team_vote(side).expect("vote still active"),
                )])
            }
        }
    }

    async fn pass_team_vote(&mut self, side: PlayerSide) -> Vec<Emit> {
        let Some(vote) = self.state.team_vote_slot(side).take() else {
            return Vec::new();
        };
        if let Some(timer) = &vote.timer {
            timer.cancel();
        }
        self.execute_team_action(vote.kind, side).await
    }

    /// Run a team vote's passed action. Also used for the auto-execute
    /// shortcut (spec §4.3 "solo team does not need to vote against itself").
    async fn execute_team_action(&mut self, kind: TeamVoteKind, side: PlayerSide) -> Vec<Emit> {
        match kind {
            TeamVoteKind::Resign => {
                self.end_game(
                    EndReason::Resignation,
                    side.opponent(),
                )
                .await
            }
            TeamVoteKind::OfferDraw => {
                self.state.draw_offer = Some(side);
                let mut emits = vec![Emit::all(ServerMessage::DrawOfferUpdate { side: Some(side) })];
                emits.extend(self.auto_start_accept_draw(side.opponent().expect("team side has opponent")));
                emits
            }
            TeamVoteKind::AcceptDraw => self.end_game(EndReason::DrawAgreement, None).await,
        }
    }

    /// Start a system-triggered `accept_draw` vote on `side` (spec §4.3 "On
    /// pass: offer_draw ... auto-start a system-triggered accept_draw vote").
    /// Never auto-executes, per the centralized guard in `votes::team`.
    fn auto_start_accept_draw(&mut self, side: PlayerSide) -> Vec<Emit> {
        let connected: HashSet<PlayerId> = self.sessions.connected_on_side(side).into_iter().collect();
        let deadline = Utc::now() + chrono::Duration::seconds(self.config.room.team_vote_duration_secs as i64);
        let mut vote = TeamVote::new(TeamVoteKind::AcceptDraw, side, None, connected, true, deadline);
        vote.timer = Some(self.schedule_deadline(
            Duration::from_secs(self.config.room.team_vote_duration_secs),
            RoomCommand::TeamVoteDeadline { side },
        ));
        let emit = Self::team_vote_active_emit(&vote);
        *self.state.team_vote_slot(side) = Some(vote);
        vec![emit]
    }

    async fn fail_team_vote(&mut self, side: PlayerSide) -> Vec<Emit> {
        let Some(vote) = self.state.team_vote_slot(side).take() else {
            return Vec::new();
        };
        if let Some(timer) = &vote.timer {
            timer.cancel();
        }
        let mut emits = vec![Self::team_vote_cleared_emit(side, vote.kind)];
        if vote.kind == TeamVoteKind::AcceptDraw {
            self.state.draw_offer = None;
            emits.push(Emit::all(ServerMessage::DrawOfferUpdate { side: None }));
            emits.push(Emit::all(ServerMessage::system_chat("The draw offer was declined.")));
        }
        emits
    }

    async fn team_vote_deadline(&mut self, side: PlayerSide) -> Vec<Emit> {
        if self.state.team_vote(side).is_none() {
            return Vec::new();
        }
        self.fail_team_vote(side).await
    }

    // ---- kick votes (spec §4.4) --------------------------------------------

    async fn start_kick_vote(
        &mut self,
        pid: PlayerId,
        target: PlayerId,
    ) -> Result<Vec<Emit>, ErrorCode> {
        let target_session = self.sessions.get(&target).ok_or(ErrorCode::TargetNotFound)?;
        let target_connected = target_session.connected;
        let target_name = target_session.name.clone();

        kick::prerequisites(self.state.kick_vote.is_some(), &pid, &target, target_connected).map_err(
            |err| match err {
                KickVotePrereqRejection::AlreadyActive => ErrorCode::VoteAlreadyActive,
                KickVotePrereqRejection::CannotTargetSelf => ErrorCode::CannotVoteSelf,
                KickVotePrereqRejection::TargetNotConnected => ErrorCode::TargetNotFound,
            },
        )?;

        let connected: HashSet<PlayerId> = self.sessions.connected_pids().into_iter().collect();
        let deadline = Utc::now() + chrono::Duration::seconds(self.config.room.kick_vote_duration_secs as i64);
        let mut vote = KickVote::new(&pid, target, target_name, &connected, deadline);
        vote.timer = Some(self.schedule_deadline(
            Duration::from_secs(self.config.room.kick_vote_duration_secs),
            RoomCommand::KickVoteDeadline,
        ));
        self.state.kick_vote = Some(vote);
        Ok(self.kick_vote_emits())
    }

    async fn vote_kick(&mut self, pid: PlayerId, yes: bool) -> Result<Vec<Emit>, ErrorCode> {
        let vote = self
            .state
            .kick_vote
            .as_ref()
            .ok_or(ErrorCode::VoteIneligibleJoinedLate)?;
        let step = kick::cast_vote(&vote.eligible_voters, &vote.yes, &vote.no, vote.required, &pid, yes);
        match step {
            KickVoteStep::Ineligible => Err(ErrorCode::VoteIneligibleJoinedLate),
            KickVoteStep::NoOp => Ok(Vec::new()),
            KickVoteStep::EarlyPass => Ok(self.pass_kick_vote().await),
            KickVoteStep::EarlyFail => Ok(self.fail_kick_vote("Kick vote failed.")),
            KickVoteStep::Continuing(yes, no) => {
                if let Some(vote) = self.state.kick_vote.as_mut() {
                    vote.yes = yes;
                    vote.no = no;
                }
                Ok(self.kick_vote_emits())
            }
        }
    }

    async fn pass_kick_vote(&mut self) -> Vec<Emit> {
        let Some(vote) = self.state.kick_vote.take() else {
            return Vec::new();
        };
        if let Some(timer) = &vote.timer {
            timer.cancel();
        }
        let target = vote.target;
        self.state.blacklist.insert(target.clone());
        self.sessions.remove(&target);
        self.state.white_ids.remove(&target);
        self.state.black_ids.remove(&target);

        let mut emits = vec![
            Emit::only(target, ServerMessage::Kicked {
                message: "You have been removed from the room by majority vote.".to_string(),
            }),
            self.roster_emit(),
            Emit::all(ServerMessage::system_chat(format!("{} was kicked.", vote.target_name))),
        ];
        emits.extend(self.kick_vote_emits());
        emits.extend(self.after_membership_change().await);
        emits
    }

    fn fail_kick_vote(&mut self, message: &str) -> Vec<Emit> {
        let Some(vote) = self.state.kick_vote.take() else {
            return Vec::new();
        };
        if let Some(timer) = &vote.timer {
            timer.cancel();
        }
        let mut emits = self.kick_vote_emits();
        emits.push(Emit::all(ServerMessage::system_chat(message)));
        emits
    }

    async fn kick_vote_deadline(&mut self) -> Vec<Emit> {
        if self.state.kick_vote.is_none() {
            return Vec::new();
        }
        self.fail_kick_vote("Kick vote timed out.")
    }

    // ---- reset votes (spec §4.5) -------------------------------------------

    async fn start_reset_vote(&mut self, pid: PlayerId) -> Result<Vec<Emit>, ErrorCode> {
        reset::prerequisites(self.state.reset_vote.is_some()).map_err(|ResetVotePrereqRejection::AlreadyActive| {
            ErrorCode::VoteAlreadyActive
        })?;

        let connected: HashSet<PlayerId> = self.sessions.connected_pids().into_iter().collect();
        let deadline = Utc::now() + chrono::Duration::seconds(self.config.room.reset_vote_duration_secs as i64);
        let vote = ResetVote::new(&pid, connected, deadline);
        if vote.is_immediately_passed() {
            return Ok(self.execute_reset().await);
        }

        let mut vote = vote;
        vote.timer = Some(self.schedule_deadline(
            Duration::from_secs(self.config.room.reset_vote_duration_secs),
            RoomCommand::ResetVoteDeadline,
        ));
        self.state.reset_vote = Some(vote);
        Ok(self.reset_vote_emits())
    }

    async fn vote_reset(&mut self, pid: PlayerId, yes: bool) -> Result<Vec<Emit>, ErrorCode> {
        let vote = self
            .state
            .reset_vote
            .as_ref()
            .ok_or(ErrorCode::VoteIneligibleJoinedLate)?;
        let step = reset::cast_vote(&vote.eligible_voters, &vote.yes, vote.required, &pid, yes);
        match step {
            ResetVoteStep::Ineligible => Err(ErrorCode::VoteIneligibleJoinedLate),
            ResetVoteStep::NoOp => Ok(Vec::new()),
            ResetVoteStep::Failed => Ok(self.fail_reset_vote()),
            ResetVoteStep::Passed => Ok(self.execute_reset().await),
            ResetVoteStep::Continuing(yes) => {
                if let Some(vote) = self.state.reset_vote.as_mut() {
                    vote.yes = yes;
                }
                Ok(self.reset_vote_emits())
            }
        }
    }

    fn fail_reset_vote(&mut self) -> Vec<Emit> {
        let Some(vote) = self.state.reset_vote.take() else {
            return Vec::new();
        };
        if let Some(timer) = &vote.timer {
            timer.cancel();
        }
        let mut emits = self.reset_vote_emits();
        emits.push(Emit::all(ServerMessage::system_chat("Reset vote failed.")));
        emits
    }

    async fn reset_vote_deadline(&mut self) -> Vec<Emit> {
        if self.state.reset_vote.is_none() {
            return Vec::new();
        }
        self.fail_reset_vote()
    }

    /// Reinstantiate the room, preserving only the blacklist (spec §4.5 "On
    /// pass / solo auto-pass"). Respawns the analysis engine.
    async fn execute_reset(&mut self) -> Vec<Emit> {
        if let Some(vote) = self.state.reset_vote.take() {
            if let Some(timer) = &vote.timer {
                timer.cancel();
            }
        }
        self.state.cancel_vote_timers();
        if let Some(timer) = self.clock_timer.take() {
            timer.cancel();
        }
        if let Some(engine) = self.engine.take() {
            engine.quit().await;
        }

        self.state.reset(self.config.room.default_clock_seconds);

        self.engine = match EngineAdapter::spawn(&self.config.engine).await {
            Ok(engine) => Some(engine),
            Err(err) => {
                tracing::warn!(error = %err, "failed to respawn analysis engine after reset");
                None
            }
        };

        let mut emits = vec![
            Emit::all(ServerMessage::GameReset),
            Emit::all(ServerMessage::GameStatusUpdate {
                status: self.state.status,
            }),
            Emit::all(ServerMessage::ClockUpdate {
                white_time: self.state.white_time,
                black_time: self.state.black_time,
            }),
        ];
        emits.extend(self.kick_vote_emits());
        emits.extend(self.reset_vote_emits());
        emits
    }
}
