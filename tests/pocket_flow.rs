use std::cell::RefCell;
use std::rc::Rc;

use tsugihagi::storage::{load_pockets, pocket_save_key};
use tsugihagi::{GameEvent, GameSession, KeyValueStore, MemoryStore};
use tsugihagi_core::{board_geometry, SessionRules, POCKET_CAPACITY};

fn new_session(store: &Rc<MemoryStore>) -> GameSession {
    session_with_pieces(store, 16)
}

fn session_with_pieces(store: &Rc<MemoryStore>, pieces: u32) -> GameSession {
    let geometry = board_geometry(400, 400, pieces, (0.0, 0.0));
    let shared: Rc<dyn KeyValueStore> = Rc::clone(store) as Rc<dyn KeyValueStore>;
    GameSession::new("level-1", geometry, SessionRules::default(), shared)
}

fn record_events(session: &GameSession) -> Rc<RefCell<Vec<GameEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink_log = Rc::clone(&log);
    session.events().subscribe(Rc::new(move |event| {
        sink_log.borrow_mut().push(event.clone());
    }));
    log
}

fn solve_by_drag(session: &mut GameSession, piece_id: usize) {
    let (pos, target) = {
        let piece = session.board().piece(piece_id).expect("piece");
        (piece.pos, piece.target)
    };
    // Grabbing at the piece origin makes the pointer track the piece
    // position one to one.
    assert!(session.begin_drag(piece_id, pos));
    session.drag_move(target, None);
    assert!(session.end_drag());
    assert!(session.board().piece(piece_id).unwrap().solved);
}

#[test]
fn stashing_piece_seven_takes_slot_zero_and_hides_it() {
    let store = Rc::new(MemoryStore::new());
    let mut session = new_session(&store);
    session.scramble(1);

    assert!(session.stash_piece(0, 7));
    let pocket = session.stash().pocket(0).expect("pocket");
    assert_eq!(pocket.pieces.len(), 1);
    assert_eq!(pocket.pieces[0].piece_id, 7);
    assert_eq!(pocket.pieces[0].slot_index, 0);

    let piece = session.board().piece(7).expect("piece");
    assert!(!piece.render.visible);
    assert!(!piece.render.interactive);
}

#[test]
fn stash_then_retrieve_round_trips_pose() {
    let store = Rc::new(MemoryStore::new());
    let mut session = new_session(&store);
    session.scramble(2);
    session.rotate_piece(3);
    let before = session.board().piece(3).unwrap().clone();

    assert!(session.stash_piece(1, 3));
    assert!(session.retrieve_piece(1, 3));

    let after = session.board().piece(3).unwrap();
    assert_eq!(after.pos, before.pos);
    assert_eq!(after.rotation, before.rotation);
    assert!(!after.solved);
    assert!(after.render.visible);
    assert!(after.render.interactive);
    assert!(session.stash().pocket(1).unwrap().pieces.is_empty());
}

#[test]
fn stash_rejects_duplicates_unknown_ids_and_overflow() {
    let store = Rc::new(MemoryStore::new());
    let mut session = new_session(&store);

    assert!(session.stash_piece(0, 4));
    // Already stashed, in any pocket.
    assert!(!session.stash_piece(0, 4));
    assert!(!session.stash_piece(1, 4));
    // Unknown id.
    assert!(!session.stash_piece(0, 99));
    // Fill pocket 1 to capacity with the remaining pieces.
    let mut stashed = 1;
    for id in 0..16 {
        if id == 4 {
            continue;
        }
        if session.stash_piece(1, id) {
            stashed += 1;
        }
    }
    assert_eq!(stashed, 16);
    assert_eq!(session.stash().pocket(1).unwrap().pieces.len(), POCKET_CAPACITY - 1);
}

#[test]
fn freed_slots_are_reused_lowest_first() {
    let store = Rc::new(MemoryStore::new());
    let mut session = new_session(&store);
    for id in [0usize, 1, 2] {
        assert!(session.stash_piece(0, id));
    }
    assert!(session.retrieve_piece(0, 1));
    assert!(session.stash_piece(0, 9));
    let pocket = session.stash().pocket(0).unwrap();
    let slot_of_nine = pocket
        .pieces
        .iter()
        .find(|entry| entry.piece_id == 9)
        .unwrap()
        .slot_index;
    assert_eq!(slot_of_nine, 1);
}

#[test]
fn transfer_is_atomic() {
    let store = Rc::new(MemoryStore::new());
    let mut session = new_session(&store);
    assert!(session.stash_piece(0, 5));
    assert!(session.stash_piece(1, 6));

    let from_before = session.stash().pocket(0).unwrap().clone();
    let to_before = session.stash().pocket(1).unwrap().clone();

    // Failure: piece 6 is not in pocket 0.
    assert!(!session.transfer_piece(0, 1, 6));
    // Failure: destination already holds the piece.
    assert!(!session.transfer_piece(1, 1, 6));
    assert_eq!(session.stash().pocket(0).unwrap(), &from_before);
    assert_eq!(session.stash().pocket(1).unwrap(), &to_before);

    // Success moves the entry and frees the source.
    assert!(session.transfer_piece(0, 1, 5));
    assert!(!session.stash().pocket(0).unwrap().holds(5));
    assert!(session.stash().pocket(1).unwrap().holds(5));
}

#[test]
fn transfer_into_full_pocket_changes_nothing() {
    let store = Rc::new(MemoryStore::new());
    // 5x5 board so a full pocket and a spare piece can coexist.
    let mut session = session_with_pieces(&store, 25);
    for id in 0..POCKET_CAPACITY {
        assert!(session.stash_piece(1, id));
    }
    assert!(session.stash().pocket(1).unwrap().is_full());
    assert!(session.stash_piece(0, 20));

    let before = session.stash().snapshot();
    assert!(!session.transfer_piece(0, 1, 20));
    assert_eq!(session.stash().snapshot(), before);
}

#[test]
fn capture_gate_flips_once_template_pieces_are_solved() {
    let store = Rc::new(MemoryStore::new());
    let mut session = new_session(&store);
    session.scramble(3);

    // Solve piece 0 first, then capture the 2x2 region covering ids
    // 0, 1, 4, 5.
    solve_by_drag(&mut session, 0);
    assert!(session.begin_template_capture(0, 0.0, 0.0));
    assert!(session.finish_template_capture(Some((200.0, 200.0))));

    let template = session
        .stash()
        .pocket(0)
        .unwrap()
        .template
        .as_ref()
        .expect("template");
    let mut ids: Vec<u32> = template.layout.iter().map(|cell| cell.piece_id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 4, 5]);
    assert_eq!(template.solved_ids, vec![0]);

    assert!(!session.can_capture_template(0));
    for id in [1usize, 4, 5] {
        solve_by_drag(&mut session, id);
    }
    assert!(session.can_capture_template(0));
}

#[test]
fn blocked_capture_emits_capture_blocked_and_keeps_the_template() {
    let store = Rc::new(MemoryStore::new());
    let mut session = new_session(&store);
    let log = record_events(&session);

    assert!(session.begin_template_capture(0, 0.0, 0.0));
    assert!(session.finish_template_capture(Some((200.0, 200.0))));
    let first = session.stash().pocket(0).unwrap().template.clone();

    // Nothing solved yet, so a second capture is blocked.
    assert!(session.begin_template_capture(0, 0.0, 0.0));
    assert!(!session.finish_template_capture(Some((300.0, 300.0))));
    assert_eq!(session.stash().pocket(0).unwrap().template, first);
    assert!(log
        .borrow()
        .iter()
        .any(|event| matches!(event, GameEvent::CaptureBlocked { pocket: 0 })));
}

#[test]
fn auto_insert_places_everything_and_clears_the_pocket() {
    let store = Rc::new(MemoryStore::new());
    let mut session = new_session(&store);
    session.scramble(4);

    solve_by_drag(&mut session, 0);
    assert!(session.begin_template_capture(0, 0.0, 0.0));
    assert!(session.finish_template_capture(Some((200.0, 200.0))));
    for id in [1usize, 4, 5] {
        assert!(session.stash_piece(0, id));
    }

    assert!(session.auto_insert_if_solved(0));
    let pocket = session.stash().pocket(0).unwrap();
    assert!(pocket.pieces.is_empty());
    assert!(pocket.template.is_none());
    for id in [1usize, 4, 5] {
        let piece = session.board().piece(id).unwrap();
        assert!(piece.solved);
        assert_eq!(piece.pos, piece.target);
    }
}

#[test]
fn auto_insert_refuses_partial_contents() {
    let store = Rc::new(MemoryStore::new());
    let mut session = new_session(&store);
    session.scramble(5);

    solve_by_drag(&mut session, 0);
    assert!(session.begin_template_capture(0, 0.0, 0.0));
    assert!(session.finish_template_capture(Some((200.0, 200.0))));
    // Two of the three unsolved template pieces, plus a stranger.
    assert!(session.stash_piece(0, 1));
    assert!(session.stash_piece(0, 4));
    assert!(session.stash_piece(0, 9));

    assert!(!session.auto_insert_if_solved(0));
    assert_eq!(session.stash().pocket(0).unwrap().pieces.len(), 3);
    assert!(session.stash().pocket(0).unwrap().template.is_some());
}

#[test]
fn pocket_state_survives_a_session_restart() {
    let store = Rc::new(MemoryStore::new());
    {
        let mut session = new_session(&store);
        session.scramble(6);
        assert!(session.stash_piece(2, 11));
    }
    let session = new_session(&store);
    let pocket = session.stash().pocket(2).unwrap();
    assert!(pocket.holds(11));
    // The restored board hides the stashed piece again.
    let piece = session.board().piece(11).unwrap();
    assert!(!piece.render.visible);
    assert!(!piece.render.interactive);
}

#[test]
fn snapshot_is_persisted_before_the_update_notification() {
    let store = Rc::new(MemoryStore::new());
    let session_store = Rc::clone(&store);
    let mut session = new_session(&store);
    let key = pocket_save_key("level-1");
    let observed = Rc::new(RefCell::new(Vec::new()));
    let observed_sink = Rc::clone(&observed);
    session.events().subscribe(Rc::new(move |event| {
        if let GameEvent::PocketUpdated { snapshot } = event {
            let stored = load_pockets(session_store.as_ref(), &key);
            observed_sink
                .borrow_mut()
                .push(stored.as_ref() == Some(snapshot));
        }
    }));

    assert!(session.stash_piece(0, 2));
    assert!(session.transfer_piece(0, 1, 2));
    let observed = observed.borrow();
    assert!(!observed.is_empty());
    assert!(observed.iter().all(|&consistent| consistent));
}
