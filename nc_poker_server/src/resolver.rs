// Round and game resolution.
//
// Both the round result and the final result use the same rule: the highest
// value wins and every entry tied at that value is a winner. Pure functions;
// the session applies the score changes.

use nc_poker_protocol::PlayerId;

use crate::error::InvariantViolation;

/// Outcome of one round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundOutcome {
    pub winning_choice: u32,
    pub winners: Vec<PlayerId>,
    /// Every player's choice, in input order.
    pub choices: Vec<(PlayerId, u32)>,
}

impl RoundOutcome {
    pub fn is_winner(&self, id: PlayerId) -> bool {
        self.winners.contains(&id)
    }
}

/// Resolve a round from every seated player's current choice.
///
/// Every entry must carry a choice; a missing one means the session resolved
/// too early.
pub fn resolve_round<I>(choices: I) -> Result<RoundOutcome, InvariantViolation>
where
    I: IntoIterator<Item = (PlayerId, Option<u32>)>,
{
    let mut submitted = Vec::new();
    for (id, choice) in choices {
        let choice = choice.ok_or(InvariantViolation::MissingChoice(id))?;
        submitted.push((id, choice));
    }
    let (winning_choice, winners) = max_with_ties(submitted.iter().copied())?;
    Ok(RoundOutcome {
        winning_choice,
        winners,
        choices: submitted,
    })
}

/// Players holding the highest score, and that score.
pub fn top_scorers<I>(scores: I) -> Result<(u32, Vec<PlayerId>), InvariantViolation>
where
    I: IntoIterator<Item = (PlayerId, u32)>,
{
    max_with_ties(scores)
}

/// Single pass: a strictly greater value replaces the winner set, an equal
/// value joins it.
fn max_with_ties<I>(entries: I) -> Result<(u32, Vec<PlayerId>), InvariantViolation>
where
    I: IntoIterator<Item = (PlayerId, u32)>,
{
    let mut best: Option<u32> = None;
    let mut winners = Vec::new();
    for (id, value) in entries {
        match best {
            Some(b) if value < b => {}
            Some(b) if value == b => winners.push(id),
            _ => {
                best = Some(value);
                winners.clear();
                winners.push(id);
            }
        }
    }
    best.map(|b| (b, winners)).ok_or(InvariantViolation::NoWinners)
}
