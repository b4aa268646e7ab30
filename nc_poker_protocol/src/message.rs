// Server-to-player messages.
//
// Players talk to the server with a bare `nc`, so every notification is
// rendered as one human-readable text line (`Display`), framed by
// `framing::write_line`. The enum keeps the data values separate from their
// wording: the session decides *what* to say, this module decides *how* it
// reads on a terminal.
//
// Player-to-server traffic has no message type at all. Each line a player
// types is handed to the session's choice validator verbatim.

use std::fmt;

use crate::types::{PlayerId, RoundNumber};

/// ANSI sequence that clears the terminal and homes the cursor.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Messages sent by the server to a player.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerMessage {
    /// Admission accepted. Sent to the new player only.
    Welcome {
        player_id: PlayerId,
        players: usize,
        max_players: usize,
    },
    /// Admission refused (e.g. game already running). Last line the
    /// connection receives.
    Rejected { reason: String },
    /// Another player took a lobby seat.
    PlayerJoined {
        player_id: PlayerId,
        players: usize,
        max_players: usize,
    },
    /// A player disconnected.
    PlayerLeft { player_id: PlayerId, players: usize },
    /// The lobby is full and the game begins. Carries the recipient's hand.
    GameStart { hand: Vec<u32>, max_rounds: u32 },
    /// A new round opened; the recipient may choose one of `remaining`.
    RoundStart {
        round: RoundNumber,
        max_rounds: u32,
        remaining: Vec<u32>,
        score: u32,
    },
    /// The recipient's input was not a valid choice. Same options re-offered.
    InvalidChoice { reason: String, remaining: Vec<u32> },
    /// The recipient's choice was locked in.
    ChoiceAccepted { choice: u32, waiting_on: usize },
    /// The recipient won (or tied for) the round.
    RoundWon { round: RoundNumber, choice: u32, score: u32 },
    /// The recipient lost the round to a higher number.
    RoundLost {
        round: RoundNumber,
        choice: u32,
        winning_choice: u32,
        score: u32,
    },
    /// Every player's choice for the finished round.
    RoundChoices {
        round: RoundNumber,
        choices: Vec<(PlayerId, u32)>,
    },
    /// Seconds left before the next round (or the final result).
    Countdown { seconds: u32 },
    /// The recipient has (or shares) the top score.
    GameWon { score: u32, tied_with: usize },
    /// Someone else finished with a higher score.
    GameLost { score: u32, winning_score: u32 },
    /// The server is closing every connection.
    ShuttingDown { reason: String },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Welcome {
                player_id,
                players,
                max_players,
            } => write!(
                f,
                "{CLEAR_SCREEN}Welcome to Netcat Poker, {player_id}. \
                 Lobby #1 ({players} / {max_players}). Waiting for game to start..."
            ),
            ServerMessage::Rejected { reason } => write!(f, "Sorry: {reason}. Bye!"),
            ServerMessage::PlayerJoined {
                player_id,
                players,
                max_players,
            } => write!(
                f,
                "{player_id} joined the lobby ({players} / {max_players})."
            ),
            ServerMessage::PlayerLeft { player_id, players } => {
                write!(f, "{player_id} left the game ({players} remaining).")
            }
            ServerMessage::GameStart { hand, max_rounds } => write!(
                f,
                "The game begins! {max_rounds} rounds. Your hand: {}",
                list(hand)
            ),
            ServerMessage::RoundStart {
                round,
                max_rounds,
                remaining,
                score,
            } => write!(
                f,
                "Round {round}/{max_rounds}. Score: {score}. Your options: {}. Pick a number:",
                list(remaining)
            ),
            ServerMessage::InvalidChoice { reason, remaining } => write!(
                f,
                "Invalid choice ({reason}). Your options: {}. Pick a number:",
                list(remaining)
            ),
            ServerMessage::ChoiceAccepted { choice, waiting_on } => {
                if *waiting_on == 0 {
                    write!(f, "You chose {choice}.")
                } else {
                    write!(
                        f,
                        "You chose {choice}. Waiting on {waiting_on} other player(s)..."
                    )
                }
            }
            ServerMessage::RoundWon {
                round,
                choice,
                score,
            } => write!(
                f,
                "You won round {round} with {choice}! Score: {score}."
            ),
            ServerMessage::RoundLost {
                round,
                choice,
                winning_choice,
                score,
            } => write!(
                f,
                "You lost round {round}: {choice} vs {winning_choice}. Score: {score}."
            ),
            ServerMessage::RoundChoices { round, choices } => {
                write!(f, "Round {round} choices:")?;
                for (i, (player_id, choice)) in choices.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{player_id} played {choice}")?;
                }
                Ok(())
            }
            ServerMessage::Countdown { seconds } => write!(f, "{seconds}..."),
            ServerMessage::GameWon { score, tied_with } => {
                if *tied_with == 0 {
                    write!(f, "Game over. You win with {score} point(s)!")
                } else {
                    write!(
                        f,
                        "Game over. You tied for the win with {score} point(s) \
                         ({tied_with} other player(s) tied)."
                    )
                }
            }
            ServerMessage::GameLost {
                score,
                winning_score,
            } => write!(
                f,
                "Game over. You lose with {score} point(s); the winning score was {winning_score}."
            ),
            ServerMessage::ShuttingDown { reason } => {
                write!(f, "Server shutting down: {reason}.")
            }
        }
    }
}

/// Render a number list as `[3, 7, 12]`.
fn list(numbers: &[u32]) -> String {
    let items: Vec<String> = numbers.iter().map(u32::to_string).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId(s.parse().unwrap())
    }

    #[test]
    fn welcome_clears_screen_and_shows_lobby_count() {
        let line = ServerMessage::Welcome {
            player_id: pid("127.0.0.1:5000"),
            players: 1,
            max_players: 2,
        }
        .to_string();
        assert!(line.starts_with(CLEAR_SCREEN));
        assert!(line.contains("(1 / 2)"));
        assert!(line.contains("127.0.0.1:5000"));
    }

    #[test]
    fn round_start_lists_remaining_options_and_score() {
        let line = ServerMessage::RoundStart {
            round: RoundNumber(2),
            max_rounds: 3,
            remaining: vec![3, 12],
            score: 1,
        }
        .to_string();
        assert_eq!(
            line,
            "Round 2/3. Score: 1. Your options: [3, 12]. Pick a number:"
        );
    }

    #[test]
    fn round_choices_lists_every_player() {
        let line = ServerMessage::RoundChoices {
            round: RoundNumber(1),
            choices: vec![(pid("10.0.0.1:1"), 7), (pid("10.0.0.2:2"), 3)],
        }
        .to_string();
        assert_eq!(
            line,
            "Round 1 choices: 10.0.0.1:1 played 7, 10.0.0.2:2 played 3"
        );
    }

    #[test]
    fn every_message_renders_as_a_single_line() {
        let messages = vec![
            ServerMessage::Rejected {
                reason: "game already started".into(),
            },
            ServerMessage::GameStart {
                hand: vec![1, 2, 3],
                max_rounds: 3,
            },
            ServerMessage::ChoiceAccepted {
                choice: 7,
                waiting_on: 1,
            },
            ServerMessage::GameWon {
                score: 2,
                tied_with: 1,
            },
            ServerMessage::GameLost {
                score: 0,
                winning_score: 3,
            },
            ServerMessage::ShuttingDown {
                reason: "server stopped".into(),
            },
        ];
        for msg in messages {
            assert!(!msg.to_string().contains('\n'), "multi-line: {msg:?}");
        }
    }

    #[test]
    fn list_formats_empty_and_single() {
        assert_eq!(list(&[]), "[]");
        assert_eq!(list(&[15]), "[15]");
    }
}
