// Choice validation.
//
// Turns one raw input line into a committed choice. The line must contain
// exactly one run of ASCII digits (anything else around it is ignored, so
// "7", "  7 " and "I pick 7!" are all 7), and that number must still be in
// the player's hand. A rejected line leaves the player untouched.

use crate::error::ChoiceRejection;
use crate::player::Player;

/// Validate `raw` against `player`'s remaining options. On success the
/// number is recorded as played and the player loses eligibility for the
/// rest of the round.
pub fn validate(raw: &str, player: &mut Player) -> Result<u32, ChoiceRejection> {
    let token = single_number_token(raw)?;
    let choice: u32 = token.parse().map_err(|_| ChoiceRejection::TooLarge)?;
    if !player.has_remaining(choice) {
        return Err(ChoiceRejection::NotAvailable(choice));
    }

    player.chosen.push(choice);
    player.current_choice = Some(choice);
    player.eligible = false;
    Ok(choice)
}

/// Return the only digit run in `raw`.
fn single_number_token(raw: &str) -> Result<&str, ChoiceRejection> {
    let mut runs = digit_runs(raw);
    let first = runs.next().ok_or(ChoiceRejection::NoNumber)?;
    if runs.next().is_some() {
        return Err(ChoiceRejection::MultipleNumbers);
    }
    Ok(first)
}

/// Maximal runs of ASCII digits, in order.
fn digit_runs(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
}
