// Session state machine for a Netcat Poker game.
//
// `Session` is the central data structure that `server.rs` drives. It owns
// the player registry, the round counter and the per-round submission count,
// and it is the only place any of them change. Every method is called from
// the server's single event-loop thread, so there is no internal locking:
// two players finishing their choices "at the same time" still arrive as two
// events, and only the second one observes a full round and resolves it.
//
// Phases:
//
//   Lobby --(seats full)--> InGame(Dealing) --> InGame(AwaitingChoices)
//     --(all chose)--> InGame(Countdown) --(timer)--> InGame(AwaitingChoices)
//     ...                                 --(after last round)--> GameOver
//
// `Phase::allows` is the single table of which operation is legal in which
// phase; each public operation checks it first and is a no-op (or a typed
// rejection, for admission) otherwise.
//
// The between-round countdown is a timer state, not a sleep. `tick(now)` is
// called by the event loop on its receive timeout and advances the countdown,
// so the accept loop and player readers never wait on it.
//
// Outbound messages go through the `Transport` trait (see `transport.rs`).
// Sends are best effort: a failed write is logged, and the broken
// connection surfaces later as a disconnect event.
//
// Disconnect policy: a player who leaves mid-game forfeits. Their seat is
// removed, a choice they already made this round is uncounted, and if
// everyone still seated has chosen, the round resolves without them. If the
// last player leaves, the session ends.

use std::collections::BTreeMap;
use std::time::Instant;

use log::{debug, error, info, warn};
use nc_poker_protocol::{PlayerId, RoundNumber, ServerMessage};
use rand::Rng;

use crate::choice;
use crate::config::GameConfig;
use crate::error::{AdmitError, ConfigError, InvariantViolation, SessionError};
use crate::hand::Hand;
use crate::player::Player;
use crate::resolver;
use crate::transport::Transport;

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Admitting players.
    Lobby,
    /// Game running; rounds cycle through `RoundStage`.
    InGame(RoundStage),
    /// Final results sent and connections closed. Terminal.
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundStage {
    /// Hands issued, first round not yet opened.
    Dealing,
    /// Round open; `submitted` players have locked in a choice.
    AwaitingChoices { submitted: usize },
    /// Round resolved; `remaining` countdown steps until the next round,
    /// the next one due at `next_at`.
    Countdown { remaining: u32, next_at: Instant },
}

/// Session operations, for the legality check in `Phase::allows`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Admit,
    StartGame,
    StartNewRound,
    SubmitChoice,
    ResolveRound,
    AdvanceCountdown,
    Disconnect,
    Shutdown,
}

impl Phase {
    pub fn allows(&self, op: Operation) -> bool {
        use Operation as Op;
        match self {
            Phase::Lobby => matches!(op, Op::Admit | Op::StartGame | Op::Disconnect | Op::Shutdown),
            Phase::InGame(stage) => match op {
                Op::Disconnect | Op::Shutdown => true,
                Op::SubmitChoice | Op::ResolveRound => {
                    matches!(stage, RoundStage::AwaitingChoices { .. })
                }
                Op::StartNewRound => {
                    matches!(stage, RoundStage::Dealing | RoundStage::Countdown { .. })
                }
                Op::AdvanceCountdown => matches!(stage, RoundStage::Countdown { .. }),
                Op::Admit | Op::StartGame => false,
            },
            Phase::GameOver => false,
        }
    }

    /// Choices locked in this round, if a round is open.
    pub fn submitted(&self) -> Option<usize> {
        match self {
            Phase::InGame(RoundStage::AwaitingChoices { submitted }) => Some(*submitted),
            _ => None,
        }
    }
}

/// The single running game: lobby through final results.
pub struct Session<T: Transport, R: Rng> {
    config: GameConfig,
    transport: T,
    rng: R,
    players: BTreeMap<PlayerId, Player>,
    phase: Phase,
    round: RoundNumber,
}

impl<T: Transport, R: Rng> Session<T, R> {
    /// Create a session in the lobby. The config is validated here so that
    /// nothing can fail for configuration reasons once players are seated.
    pub fn new(config: GameConfig, transport: T, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            rng,
            players: BTreeMap::new(),
            phase: Phase::Lobby,
            round: RoundNumber(0),
        })
    }

    /// Seat a new connection in the lobby. Starts the game when the last
    /// seat fills.
    ///
    /// Outside the lobby this fails with `AdmitError::GameAlreadyStarted`
    /// and `conn` is dropped unused; the caller tells the connection why and
    /// closes it.
    pub fn admit(&mut self, id: PlayerId, conn: T::Connection) -> Result<(), SessionError> {
        if !self.phase.allows(Operation::Admit) {
            warn!("rejecting {id}: game already started");
            return Err(AdmitError::GameAlreadyStarted.into());
        }

        self.transport.attach(id, conn);
        self.players.insert(id, Player::new(id));
        let players = self.players.len();
        let max_players = self.config.max_players;
        info!("{id} joined the lobby ({players}/{max_players})");

        self.send_to(
            id,
            &ServerMessage::Welcome {
                player_id: id,
                players,
                max_players,
            },
        );
        self.broadcast_except(
            id,
            &ServerMessage::PlayerJoined {
                player_id: id,
                players,
                max_players,
            },
        );

        if players == max_players {
            self.start_game()?;
        }
        Ok(())
    }

    /// Deal hands and open round 1. No-op unless in the lobby with every
    /// seat taken, so it fires at most once.
    pub fn start_game(&mut self) -> Result<(), InvariantViolation> {
        if !self.phase.allows(Operation::StartGame)
            || self.players.len() != self.config.max_players
        {
            return Ok(());
        }
        info!(
            "starting game with {} players, {} rounds",
            self.players.len(),
            self.config.max_rounds
        );
        self.phase = Phase::InGame(RoundStage::Dealing);

        let mut dealt = Vec::with_capacity(self.players.len());
        for player in self.players.values_mut() {
            let hand = Hand::generate(
                &mut self.rng,
                self.config.hand_size,
                self.config.lower_bound,
                self.config.upper_bound,
            )
            .map_err(|e| InvariantViolation::Deal(e.to_string()))?;
            debug!("{} dealt {:?}", player.id, hand.numbers());
            dealt.push((player.id, hand.numbers().to_vec()));
            player.deal(hand);
        }
        let max_rounds = self.config.max_rounds;
        for (id, hand) in dealt {
            self.send_to(id, &ServerMessage::GameStart { hand, max_rounds });
        }

        self.start_new_round()
    }

    /// Advance the round counter and either open the next round or, past the
    /// last round, finish the game. The previous round must already be
    /// resolved.
    fn start_new_round(&mut self) -> Result<(), InvariantViolation> {
        if !self.phase.allows(Operation::StartNewRound) {
            return Ok(());
        }
        self.round = self.round.next();
        if self.round.0 > self.config.max_rounds {
            return self.end_game();
        }

        info!("round {} begins", self.round);
        self.phase = Phase::InGame(RoundStage::AwaitingChoices { submitted: 0 });
        let round = self.round;
        let max_rounds = self.config.max_rounds;
        let mut prompts = Vec::with_capacity(self.players.len());
        for player in self.players.values_mut() {
            player.open_round();
            prompts.push((
                player.id,
                ServerMessage::RoundStart {
                    round,
                    max_rounds,
                    remaining: player.remaining(),
                    score: player.score,
                },
            ));
        }
        for (id, msg) in prompts {
            self.send_to(id, &msg);
        }
        Ok(())
    }

    /// Handle one line of input from a player.
    ///
    /// Ignored outside an open round and for players who already chose. An
    /// invalid line re-prompts only that player. A valid one is locked in,
    /// and the round resolves once every seated player has chosen.
    pub fn submit_choice(&mut self, id: PlayerId, raw: &str) -> Result<(), InvariantViolation> {
        if !self.phase.allows(Operation::SubmitChoice) {
            return Ok(());
        }
        let Some(player) = self.players.get_mut(&id) else {
            return Ok(());
        };
        if !player.eligible {
            debug!("ignoring input from {id}: already chose this round");
            return Ok(());
        }

        let choice = match choice::validate(raw, player) {
            Ok(choice) => choice,
            Err(rejection) => {
                debug!("{id} sent invalid choice {raw:?}: {rejection}");
                let remaining = player.remaining();
                self.send_to(
                    id,
                    &ServerMessage::InvalidChoice {
                        reason: rejection.to_string(),
                        remaining,
                    },
                );
                return Ok(());
            }
        };

        let players = self.players.len();
        let submitted = self.phase.submitted().unwrap_or(0) + 1;
        if submitted > players {
            error!("{submitted} choices for {players} players in round {}", self.round);
            return Err(InvariantViolation::ChoiceCountExceeded { submitted, players });
        }
        self.phase = Phase::InGame(RoundStage::AwaitingChoices { submitted });
        info!("{id} chose {choice} ({submitted}/{players})");

        self.send_to(
            id,
            &ServerMessage::ChoiceAccepted {
                choice,
                waiting_on: players - submitted,
            },
        );
        if submitted == players {
            self.resolve_round()?;
        }
        Ok(())
    }

    /// Score the round, tell each player how they did, show everyone every
    /// choice, and start the countdown to the next round.
    fn resolve_round(&mut self) -> Result<(), InvariantViolation> {
        if !self.phase.allows(Operation::ResolveRound) {
            return Ok(());
        }
        let outcome = resolver::resolve_round(
            self.players
                .values()
                .map(|player| (player.id, player.current_choice)),
        )?;
        let round = self.round;
        info!(
            "round {round} won by {:?} with {}",
            outcome.winners, outcome.winning_choice
        );

        for id in &outcome.winners {
            if let Some(player) = self.players.get_mut(id) {
                player.score += 1;
            }
        }
        for &(id, choice) in &outcome.choices {
            let score = self.players.get(&id).map_or(0, |player| player.score);
            let msg = if outcome.is_winner(id) {
                ServerMessage::RoundWon {
                    round,
                    choice,
                    score,
                }
            } else {
                ServerMessage::RoundLost {
                    round,
                    choice,
                    winning_choice: outcome.winning_choice,
                    score,
                }
            };
            self.send_to(id, &msg);
        }
        self.broadcast(&ServerMessage::RoundChoices {
            round,
            choices: outcome.choices,
        });

        self.begin_countdown(Instant::now())
    }

    fn begin_countdown(&mut self, now: Instant) -> Result<(), InvariantViolation> {
        let steps = self.config.countdown_secs;
        self.phase = Phase::InGame(RoundStage::Countdown {
            remaining: steps,
            next_at: now + self.config.countdown_interval(),
        });
        if steps == 0 {
            return self.start_new_round();
        }
        self.broadcast(&ServerMessage::Countdown { seconds: steps });
        Ok(())
    }

    /// Advance the between-round countdown to `now`, opening the next round
    /// (or ending the game) when it runs out. No-op in any other phase.
    pub fn tick(&mut self, now: Instant) -> Result<(), InvariantViolation> {
        if !self.phase.allows(Operation::AdvanceCountdown) {
            return Ok(());
        }
        while let Phase::InGame(RoundStage::Countdown { remaining, next_at }) = self.phase {
            if now < next_at {
                break;
            }
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                return self.start_new_round();
            }
            self.phase = Phase::InGame(RoundStage::Countdown {
                remaining,
                next_at: next_at + self.config.countdown_interval(),
            });
            self.broadcast(&ServerMessage::Countdown { seconds: remaining });
        }
        Ok(())
    }

    /// Announce the final result (top score wins, ties share the win) and
    /// tear the session down.
    fn end_game(&mut self) -> Result<(), InvariantViolation> {
        let (winning_score, winners) =
            resolver::top_scorers(self.players.values().map(|player| (player.id, player.score)))?;
        info!("game over: {winners:?} win with {winning_score} point(s)");

        let results: Vec<(PlayerId, ServerMessage)> = self
            .players
            .values()
            .map(|player| {
                let msg = if winners.contains(&player.id) {
                    ServerMessage::GameWon {
                        score: player.score,
                        tied_with: winners.len() - 1,
                    }
                } else {
                    ServerMessage::GameLost {
                        score: player.score,
                        winning_score,
                    }
                };
                (player.id, msg)
            })
            .collect();
        for (id, msg) in results {
            self.send_to(id, &msg);
        }

        self.teardown();
        Ok(())
    }

    /// Remove a player whose connection closed.
    pub fn disconnect(&mut self, id: PlayerId) -> Result<(), InvariantViolation> {
        if !self.phase.allows(Operation::Disconnect) {
            return Ok(());
        }
        let Some(player) = self.players.remove(&id) else {
            return Ok(());
        };
        self.transport.detach(id);
        let players = self.players.len();
        info!("{id} disconnected ({players} remaining)");
        self.broadcast(&ServerMessage::PlayerLeft {
            player_id: id,
            players,
        });

        let phase = self.phase;
        match phase {
            Phase::InGame(_) if self.players.is_empty() => {
                info!("last player left; ending session");
                self.teardown();
            }
            Phase::InGame(RoundStage::AwaitingChoices { submitted }) => {
                let submitted = if player.current_choice.is_some() {
                    submitted.saturating_sub(1)
                } else {
                    submitted
                };
                self.phase = Phase::InGame(RoundStage::AwaitingChoices { submitted });
                if submitted == players {
                    self.resolve_round()?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Notify everyone and close every connection. Safe in any phase,
    /// including mid-round and mid-countdown.
    pub fn shutdown(&mut self, reason: &str) {
        if !self.phase.allows(Operation::Shutdown) {
            return;
        }
        info!("shutting down session: {reason}");
        self.broadcast(&ServerMessage::ShuttingDown {
            reason: reason.into(),
        });
        self.teardown();
    }

    /// Shut down after an internal-consistency violation.
    pub fn abort(&mut self, violation: &InvariantViolation) {
        error!("aborting session: {violation}");
        self.shutdown(&format!("internal error ({violation})"));
    }

    fn teardown(&mut self) {
        self.phase = Phase::GameOver;
        self.players.clear();
        self.transport.close_all();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Rounds started so far (exceeds `max_rounds` by one after the game).
    pub fn round(&self) -> RoundNumber {
        self.round
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send to one player. Failures are logged, not propagated.
    fn send_to(&mut self, id: PlayerId, msg: &ServerMessage) {
        if let Err(e) = self.transport.send(id, msg) {
            warn!("failed to send to {id}: {e}");
        }
    }

    /// Send to every seated player. One failed send does not stop the rest.
    fn broadcast(&mut self, msg: &ServerMessage) {
        let ids: Vec<PlayerId> = self.players.keys().copied().collect();
        for id in ids {
            self.send_to(id, msg);
        }
    }

    fn broadcast_except(&mut self, skip: PlayerId, msg: &ServerMessage) {
        let ids: Vec<PlayerId> = self
            .players
            .keys()
            .copied()
            .filter(|id| *id != skip)
            .collect();
        for id in ids {
            self.send_to(id, msg);
        }
    }
}
