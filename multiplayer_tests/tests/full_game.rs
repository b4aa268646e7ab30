// End-to-end game scenarios.
//
// Each test starts a real server on localhost and drives real TCP players
// through it with `TestPlayer`. Rules are shrunk where timing matters (no
// countdown, or a very short one) so the tests run quickly.

use std::thread;
use std::time::Duration;

use multiplayer_tests::{TestPlayer, parse_numbers, parse_score, quick_rules, start_test_server};
use nc_poker_server::GameConfig;

#[test]
fn two_players_play_a_full_game() {
    let (handle, addr) = start_test_server(quick_rules(2));
    let mut a = TestPlayer::join(addr);
    let mut b = TestPlayer::join(addr);

    // Each player is dealt three distinct numbers within the range.
    for player in [&mut a, &mut b] {
        let hand = parse_numbers(&player.wait_for("Your hand:")).unwrap();
        assert_eq!(hand.len(), 3);
        assert!(hand.windows(2).all(|w| w[0] < w[1]));
        assert!(hand.iter().all(|n| (1..=15).contains(n)));
    }

    for round in 1..=3 {
        let options_a = a.wait_for_round(round);
        let options_b = b.wait_for_round(round);
        assert_eq!(options_a.len() as u32, 4 - round);
        assert_eq!(options_b.len() as u32, 4 - round);

        a.send(&options_a[options_a.len() - 1].to_string());
        b.send(&options_b[0].to_string());

        // Both players see every choice of the round.
        for player in [&mut a, &mut b] {
            let line = player.wait_for(&format!("Round {round} choices:"));
            assert_eq!(line.matches(" played ").count(), 2);
        }
    }

    let result_a = a.wait_for("Game over.");
    let result_b = b.wait_for("Game over.");
    a.wait_for_close();
    b.wait_for_close();

    // Final score equals rounds won (ties count as wins).
    let wins_a = a.seen("You won round").len() as u32;
    let wins_b = b.seen("You won round").len() as u32;
    assert_eq!(a.seen("You won round").len() + a.seen("You lost round").len(), 3);
    assert!(wins_a + wins_b >= 3);

    match wins_a.cmp(&wins_b) {
        std::cmp::Ordering::Greater => {
            assert!(result_a.contains("You win"), "{result_a}");
            assert!(result_b.contains("You lose"), "{result_b}");
        }
        std::cmp::Ordering::Less => {
            assert!(result_a.contains("You lose"), "{result_a}");
            assert!(result_b.contains("You win"), "{result_b}");
        }
        std::cmp::Ordering::Equal => {
            assert!(result_a.contains("tied for the win"), "{result_a}");
            assert!(result_b.contains("tied for the win"), "{result_b}");
        }
    }
    assert!(result_a.contains(&format!("{wins_a} point(s)")));

    // The game ending shuts the server down.
    handle.wait();
}

#[test]
fn invalid_input_reprompts_without_affecting_others() {
    let (handle, addr) = start_test_server(quick_rules(2));
    let mut a = TestPlayer::join(addr);
    let mut b = TestPlayer::join(addr);
    let options = a.wait_for_round(1);
    b.wait_for_round(1);

    a.send("hello");
    assert!(a.wait_for("Invalid choice").contains("no number found"));
    a.send("1 2");
    assert!(a.wait_for("Invalid choice").contains("exactly one number"));
    let outside = (1..=15).find(|n| !options.contains(n)).unwrap();
    a.send(&outside.to_string());
    let line = a.wait_for("Invalid choice");
    assert!(line.contains("is not one of your options"));
    assert_eq!(parse_numbers(&line), Some(options.clone()));

    a.send(&format!("I pick {}", options[0]));
    assert!(a.wait_for("You chose").contains("Waiting on 1 other player"));
    assert!(b.seen("Invalid choice").is_empty());

    handle.stop();
}

#[test]
fn second_choice_in_a_round_is_ignored() {
    let (handle, addr) = start_test_server(quick_rules(2));
    let mut a = TestPlayer::join(addr);
    let mut b = TestPlayer::join(addr);
    let options_a = a.wait_for_round(1);
    let options_b = b.wait_for_round(1);

    a.send(&options_a[0].to_string());
    a.wait_for("You chose");
    a.send(&options_a[1].to_string());
    // Let the server see a's extra line before b closes the round.
    thread::sleep(Duration::from_millis(200));
    b.send(&options_b[0].to_string());

    // Round 2 offers a everything but the first pick.
    let remaining = a.wait_for_round(2);
    assert_eq!(remaining, options_a[1..].to_vec());
    assert_eq!(a.seen("You chose").len(), 1);

    handle.stop();
}

#[test]
fn countdown_is_broadcast_between_rounds() {
    let rules = GameConfig {
        max_players: 2,
        countdown_secs: 2,
        countdown_interval_ms: 50,
        ..GameConfig::default()
    };
    let (handle, addr) = start_test_server(rules);
    let mut a = TestPlayer::join(addr);
    let mut b = TestPlayer::join(addr);

    let options_a = a.wait_for_round(1);
    let options_b = b.wait_for_round(1);
    a.send(&options_a[0].to_string());
    b.send(&options_b[0].to_string());

    for player in [&mut a, &mut b] {
        player.wait_for_round(2);
        let countdown: Vec<&str> = player
            .transcript
            .iter()
            .map(String::as_str)
            .filter(|line| line.ends_with("..."))
            .filter(|line| line.len() <= 4)
            .collect();
        assert_eq!(countdown, vec!["2...", "1..."]);
    }

    handle.stop();
}

#[test]
fn mid_round_disconnect_resolves_among_remaining_players() {
    let (handle, addr) = start_test_server(quick_rules(3));
    let mut a = TestPlayer::join(addr);
    let mut b = TestPlayer::join(addr);
    let mut c = TestPlayer::join(addr);
    let options_a = a.wait_for_round(1);
    let options_b = b.wait_for_round(1);
    c.wait_for_round(1);

    a.send(&options_a[0].to_string());
    b.send(&options_b[0].to_string());
    a.wait_for("You chose");
    b.wait_for("You chose");
    c.disconnect();

    for player in [&mut a, &mut b] {
        player.wait_for("left the game (2 remaining)");
        let choices = player.wait_for("Round 1 choices:");
        assert_eq!(choices.matches(" played ").count(), 2);
        player.wait_for_round(2);
    }

    handle.stop();
    a.wait_for("Server shutting down");
    a.wait_for_close();
}

#[test]
fn simultaneous_submissions_score_each_winner_once() {
    let (handle, addr) = start_test_server(quick_rules(4));
    let mut players: Vec<TestPlayer> = (0..4).map(|_| TestPlayer::join(addr)).collect();
    let picks: Vec<u32> = players
        .iter_mut()
        .map(|p| *p.wait_for_round(1).last().unwrap())
        .collect();

    // Everyone submits at once from their own thread.
    let players: Vec<TestPlayer> = thread::scope(|s| {
        let joins: Vec<_> = players
            .into_iter()
            .zip(&picks)
            .map(|(mut p, pick)| {
                s.spawn(move || {
                    p.send(&pick.to_string());
                    p
                })
            })
            .collect();
        joins.into_iter().map(|j| j.join().unwrap()).collect()
    });

    let best = *picks.iter().max().unwrap();
    let mut scored = 0;
    for (mut player, pick) in players.into_iter().zip(picks) {
        player.wait_for_round(2);
        let score = parse_score(player.seen("Round 2/").last().unwrap()).unwrap();
        assert_eq!(player.seen("Round 1 choices:").len(), 1);
        if pick == best {
            assert_eq!(score, 1);
            scored += 1;
        } else {
            assert_eq!(score, 0);
        }
    }
    assert!(scored >= 1);

    handle.stop();
}

#[test]
fn stop_mid_game_notifies_every_player() {
    let (handle, addr) = start_test_server(quick_rules(2));
    let mut a = TestPlayer::join(addr);
    let mut b = TestPlayer::join(addr);
    a.wait_for_round(1);
    b.wait_for_round(1);

    handle.stop();

    for player in [&mut a, &mut b] {
        player.wait_for("Server shutting down");
        player.wait_for_close();
    }
}
