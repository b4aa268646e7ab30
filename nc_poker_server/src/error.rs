// Error taxonomy for the game server.
//
// Four families, by how far they are allowed to travel:
// - `ConfigError`: bad startup configuration. Fatal before the listener binds.
// - `AdmitError`: a connection arrived at the wrong time. Its `Display` text
//   is the reason sent to that connection; the running session is unaffected.
// - `ChoiceRejection`: a player typed something that is not a valid choice.
//   Handled entirely inside the session (the player is re-prompted).
// - `InvariantViolation`: the session's own bookkeeping is inconsistent.
//   Fatal: the server tears the session down instead of risking corrupt scores.
//
// `SessionError` joins the last two for admission, which can trigger game
// start.

use std::io;
use std::path::PathBuf;

use nc_poker_protocol::PlayerId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "range {lower}..={upper} holds fewer than {count} distinct numbers"
    )]
    RangeTooSmall { count: usize, lower: u32, upper: u32 },

    #[error("max_players must be at least 1")]
    NoPlayers,

    #[error("max_rounds must be at least 1")]
    NoRounds,

    #[error("max_rounds ({rounds}) exceeds hand_size ({hand_size})")]
    TooManyRounds { rounds: u32, hand_size: usize },

    #[error(
        "{message} line could reach {len} bytes, over the {max} byte line limit; \
         lower hand_size, upper_bound or max_players"
    )]
    LineTooLong {
        message: &'static str,
        len: usize,
        max: usize,
    },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmitError {
    #[error("the game has already started")]
    GameAlreadyStarted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChoiceRejection {
    #[error("no number found")]
    NoNumber,

    #[error("enter exactly one number")]
    MultipleNumbers,

    #[error("{0} is not one of your options")]
    NotAvailable(u32),

    #[error("number too large")]
    TooLarge,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("{submitted} choices submitted with only {players} players seated")]
    ChoiceCountExceeded { submitted: usize, players: usize },

    #[error("resolving round without a choice from {0}")]
    MissingChoice(PlayerId),

    #[error("no winner could be determined")]
    NoWinners,

    #[error("failed to deal hands: {0}")]
    Deal(String),
}

/// Failure of `Session::admit`: either the connection is turned away, or
/// seating it tripped an invariant while starting the game.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Admit(#[from] AdmitError),

    #[error(transparent)]
    Fatal(#[from] InvariantViolation),
}
