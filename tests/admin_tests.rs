//! Administrative console output.

mod common;

use common::{Harness, KILLS, WEEKLY};
use leaderboards::admin::{self, AdminCommand, NOT_FOUND};
use leaderboards::Engine;

fn scored_engine(h: &Harness, players: usize) -> Engine {
    h.write_config("kills", KILLS);
    for i in 0..players {
        let id = h.player(&format!("p{:02}", i));
        h.set(id, "%kills%", &i.to_string());
    }
    let engine = Engine::load(h.settings(), h.context()).unwrap();
    // players / batch size, rounded up
    for _ in 0..players.div_ceil(10).max(1) {
        engine.tick().unwrap();
    }
    engine
}

#[test]
fn test_top_pages_and_hides_non_positive_scores() {
    let h = Harness::new();
    // scores 0..=14: fourteen positive entries, one zero
    let engine = scored_engine(&h, 15);

    let first = admin::render_top(&engine, "kills", 1);
    assert_eq!(first[0], "Top kills (page 1/2)");
    assert_eq!(first[1], "#1 p14 - 14");
    assert_eq!(first.len(), 11);

    let second = admin::render_top(&engine, "kills", 2);
    assert_eq!(second[0], "Top kills (page 2/2)");
    assert_eq!(second.last().unwrap(), "#14 p01 - 1");
    assert_eq!(second.len(), 5);

    // pages past the end show the last page
    assert_eq!(admin::render_top(&engine, "kills", 9)[0], "Top kills (page 2/2)");
}

#[test]
fn test_top_on_empty_board() {
    let h = Harness::new();
    h.write_config("kills", KILLS);
    let engine = Engine::load(h.settings(), h.context()).unwrap();
    assert_eq!(
        admin::render_top(&engine, "kills", 1),
        vec!["Top kills (page 1/1)".to_string(), "No entries.".to_string()]
    );
}

#[test]
fn test_unknown_leaderboard() {
    let h = Harness::new();
    let engine = scored_engine(&h, 1);
    assert_eq!(admin::render_info(&engine, "nope"), vec![NOT_FOUND.to_string()]);
    assert_eq!(admin::render_top(&engine, "nope", 1), vec![NOT_FOUND.to_string()]);
}

#[test]
fn test_info_for_rotating_board() {
    let h = Harness::new();
    h.write_config("weekly", WEEKLY);
    let engine = Engine::load(h.settings(), h.context()).unwrap();

    assert_eq!(
        admin::render_info(&engine, "Weekly"),
        vec![
            "weekly",
            "Type: timed",
            "Placeholders: [%blocks%], %fish%",
            "Description: Mine blocks",
            "Resets in: 21 days, 12 hours, 0 minutes",
        ]
    );
}

#[test]
fn test_completion() {
    let h = Harness::new();
    h.write_config("weekly", WEEKLY);
    let engine = scored_engine(&h, 1);

    assert_eq!(admin::complete(&engine, &["re"]), vec!["reload".to_string()]);
    assert_eq!(admin::complete(&engine, &[]).len(), 3);
    assert_eq!(admin::complete(&engine, &["info", "w"]), vec!["weekly".to_string()]);
    assert_eq!(admin::complete(&engine, &["top", ""]).len(), 2);
    assert!(admin::complete(&engine, &["reload", "x"]).is_empty());
}

#[tokio::test]
async fn test_reload_rebuilds_from_directory() {
    let h = Harness::new();
    let mut engine = scored_engine(&h, 3);
    assert_eq!(engine.top_value("kills", 1), "2");

    h.write_config("weekly", WEEKLY);
    h.remove_config("kills");
    let output = AdminCommand::Reload.execute(&mut engine).await;
    assert_eq!(output, vec!["Reloaded.".to_string()]);
    assert_eq!(engine.names(), vec!["weekly".to_string()]);
    assert_eq!(engine.current_tick(), 0);

    // the removed board was flushed on the way out
    assert_eq!(h.store("kills").write_count(), 1);
}

#[test]
fn test_reload_keeps_saved_scores() {
    let h = Harness::new();
    let mut engine = scored_engine(&h, 3);
    tokio_test::block_on(engine.reload()).unwrap();
    assert_eq!(engine.top_value("kills", 1), "2");
    assert_eq!(engine.top_name("kills", 1), "p02");
}
