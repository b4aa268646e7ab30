// Server and game configuration.
//
// `ServerConfig` is built once at startup (CLI flags layered over an optional
// JSON file, see `main.rs`) and handed to `start_server`, which passes the
// `GameConfig` half into `Session::new`. Nothing reads configuration from
// globals. Every field has a default, so a JSON file only needs to name the
// values it changes.

use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use std::path::Path;
use std::time::Duration;

use nc_poker_protocol::{MAX_LINE_LEN, PlayerId, RoundNumber, ServerMessage};
use serde::{Deserialize, Serialize};

use crate::error::{ChoiceRejection, ConfigError};

/// Rules of a single game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seats in the lobby. The game starts the moment they are all taken.
    pub max_players: usize,
    /// Rounds per game.
    pub max_rounds: u32,
    /// Distinct numbers dealt to each player.
    pub hand_size: usize,
    /// Smallest number that can be dealt (inclusive).
    pub lower_bound: u32,
    /// Largest number that can be dealt (inclusive).
    pub upper_bound: u32,
    /// Countdown steps between a round result and the next round. 0 skips
    /// the countdown entirely.
    pub countdown_secs: u32,
    /// Length of one countdown step.
    pub countdown_interval_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: 2,
            max_rounds: 3,
            hand_size: 3,
            lower_bound: 1,
            upper_bound: 15,
            countdown_secs: 3,
            countdown_interval_ms: 1000,
        }
    }
}

impl GameConfig {
    /// Reject configurations that could fail mid-game.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_players == 0 {
            return Err(ConfigError::NoPlayers);
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::NoRounds);
        }
        let span = u64::from(self.upper_bound) + 1;
        if self.upper_bound < self.lower_bound
            || span - u64::from(self.lower_bound) < self.hand_size as u64
        {
            return Err(ConfigError::RangeTooSmall {
                count: self.hand_size,
                lower: self.lower_bound,
                upper: self.upper_bound,
            });
        }
        if self.max_rounds as usize > self.hand_size {
            return Err(ConfigError::TooManyRounds {
                rounds: self.max_rounds,
                hand_size: self.hand_size,
            });
        }
        self.check_line_lengths()
    }

    /// Render the longest line each message could take under these rules and
    /// make sure it fits through `write_line`.
    fn check_line_lengths(&self) -> Result<(), ConfigError> {
        // Anything past MAX_LINE_LEN entries is over the limit already.
        let hand_size = self.hand_size.min(MAX_LINE_LEN);
        let seats = self.max_players.min(MAX_LINE_LEN);
        let hand = vec![self.upper_bound; hand_size];
        let round = RoundNumber(self.max_rounds);

        let worst_case = [
            (
                "welcome",
                ServerMessage::Welcome {
                    player_id: widest_player_id(),
                    players: self.max_players,
                    max_players: self.max_players,
                },
            ),
            (
                "game start",
                ServerMessage::GameStart {
                    hand: hand.clone(),
                    max_rounds: self.max_rounds,
                },
            ),
            (
                "round start",
                ServerMessage::RoundStart {
                    round,
                    max_rounds: self.max_rounds,
                    remaining: hand.clone(),
                    score: self.max_rounds,
                },
            ),
            (
                "invalid choice",
                ServerMessage::InvalidChoice {
                    reason: ChoiceRejection::NotAvailable(u32::MAX).to_string(),
                    remaining: hand,
                },
            ),
            (
                "round choices",
                ServerMessage::RoundChoices {
                    round,
                    choices: vec![(widest_player_id(), self.upper_bound); seats],
                },
            ),
        ];

        for (message, msg) in worst_case {
            let len = msg.to_string().len();
            if len > MAX_LINE_LEN {
                return Err(ConfigError::LineTooLong {
                    message,
                    len,
                    max: MAX_LINE_LEN,
                });
            }
        }
        Ok(())
    }

    pub fn countdown_interval(&self) -> Duration {
        Duration::from_millis(self.countdown_interval_ms)
    }
}

/// Listener address plus game rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 1234,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The peer address with the longest text form.
fn widest_player_id() -> PlayerId {
    let ip = Ipv6Addr::new(0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff);
    PlayerId(SocketAddr::V6(SocketAddrV6::new(ip, u16::MAX, 0, u32::MAX)))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:1234");
        assert_eq!(config.game.max_players, 2);
        assert_eq!(config.game.max_rounds, 3);
        config.game.validate().unwrap();
    }

    #[test]
    fn range_smaller_than_hand_is_rejected() {
        let game = GameConfig {
            lower_bound: 5,
            upper_bound: 6,
            max_rounds: 2,
            ..GameConfig::default()
        };
        assert!(matches!(
            game.validate(),
            Err(ConfigError::RangeTooSmall {
                count: 3,
                lower: 5,
                upper: 6
            })
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let game = GameConfig {
            lower_bound: 10,
            upper_bound: 1,
            ..GameConfig::default()
        };
        assert!(matches!(
            game.validate(),
            Err(ConfigError::RangeTooSmall { .. })
        ));
    }

    #[test]
    fn range_exactly_hand_sized_is_accepted() {
        let game = GameConfig {
            lower_bound: 4,
            upper_bound: 6,
            ..GameConfig::default()
        };
        game.validate().unwrap();
    }

    #[test]
    fn more_rounds_than_cards_is_rejected() {
        let game = GameConfig {
            max_rounds: 4,
            ..GameConfig::default()
        };
        assert!(matches!(
            game.validate(),
            Err(ConfigError::TooManyRounds {
                rounds: 4,
                hand_size: 3
            })
        ));
    }

    #[test]
    fn zero_players_or_rounds_is_rejected() {
        let no_players = GameConfig {
            max_players: 0,
            ..GameConfig::default()
        };
        assert!(matches!(no_players.validate(), Err(ConfigError::NoPlayers)));

        let no_rounds = GameConfig {
            max_rounds: 0,
            ..GameConfig::default()
        };
        assert!(matches!(no_rounds.validate(), Err(ConfigError::NoRounds)));
    }

    #[test]
    fn hand_too_wide_for_one_line_is_rejected() {
        let game = GameConfig {
            max_players: 1,
            hand_size: 300,
            upper_bound: 10_000,
            ..GameConfig::default()
        };
        match game.validate() {
            Err(ConfigError::LineTooLong { message, len, max }) => {
                assert_eq!(message, "game start");
                assert!(len > max);
                assert_eq!(max, MAX_LINE_LEN);
            }
            other => panic!("expected LineTooLong, got {other:?}"),
        }
    }

    #[test]
    fn too_many_players_for_round_choices_line_is_rejected() {
        let game = GameConfig {
            max_players: 40,
            ..GameConfig::default()
        };
        assert!(matches!(
            game.validate(),
            Err(ConfigError::LineTooLong {
                message: "round choices",
                ..
            })
        ));

        let game = GameConfig {
            max_players: 10,
            ..GameConfig::default()
        };
        game.validate().unwrap();
    }

    #[test]
    fn huge_player_count_is_rejected_without_rendering_every_seat() {
        let game = GameConfig {
            max_players: usize::MAX,
            ..GameConfig::default()
        };
        assert!(matches!(
            game.validate(),
            Err(ConfigError::LineTooLong { .. })
        ));
    }

    #[test]
    fn widest_player_id_is_the_longest_address_form() {
        let text = widest_player_id().to_string();
        assert_eq!(text.len(), 58);
        assert!(text.ends_with("%4294967295]:65535"));
    }

    #[test]
    fn partial_json_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 4321, "game": {{"countdown_secs": 0}}}}"#).unwrap();

        let config = ServerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.port, 4321);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.game.countdown_secs, 0);
        assert_eq!(config.game.upper_bound, 15);
    }

    #[test]
    fn malformed_json_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            ServerConfig::from_json_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_json_file_is_a_read_error() {
        let path = Path::new("/definitely/not/here/nc_poker.json");
        assert!(matches!(
            ServerConfig::from_json_file(path),
            Err(ConfigError::Read { .. })
        ));
    }
}
