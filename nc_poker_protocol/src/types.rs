// Core ID types for the Netcat Poker protocol.
//
// Players have no names or accounts: a player *is* their TCP connection, so
// `PlayerId` wraps the peer socket address reported by `accept()`. Both the
// server's session registry and the rendered messages use it.

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Connection-scoped player identity (the peer address).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub SocketAddr);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SocketAddr> for PlayerId {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

/// One-based round number. Zero means "no round has started yet".
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RoundNumber(pub u32);

impl RoundNumber {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RoundNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_id_displays_as_address() {
        let id = PlayerId("127.0.0.1:4000".parse().unwrap());
        assert_eq!(id.to_string(), "127.0.0.1:4000");
    }

    #[test]
    fn player_id_serializes_as_address_string() {
        let id = PlayerId("10.0.0.2:51000".parse().unwrap());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""10.0.0.2:51000""#);
    }

    #[test]
    fn round_number_starts_at_zero_and_advances() {
        let r = RoundNumber::default();
        assert_eq!(r, RoundNumber(0));
        assert_eq!(r.next().next(), RoundNumber(2));
    }
}
