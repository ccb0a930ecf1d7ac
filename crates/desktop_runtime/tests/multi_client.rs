use std::rc::Rc;

use desktop_app_contract::PropsBag;
use desktop_runtime::{
    decode_command_log, DesktopSession, PresenceIdentity, COMMAND_LOG_PATH, ICON_SIZE_PATH,
};
use platform_host::{
    HostServices, HostStrategy, MemoryPrefsStore, MemoryRealtimeBackend, MemoryRealtimeStore,
};
use pretty_assertions::assert_eq;
use serde_json::json;

struct Client {
    store: Rc<MemoryRealtimeStore>,
    session: Rc<DesktopSession>,
}

fn join(backend: &MemoryRealtimeBackend, user_id: &str) -> Client {
    let store = Rc::new(backend.connect());
    let host = HostServices {
        realtime: store.clone(),
        prefs: Rc::new(MemoryPrefsStore::default()),
        host_strategy: HostStrategy::Memory,
    };
    let session = DesktopSession::connect(host, PresenceIdentity::new(user_id)).expect("connect");
    session.subscribe_all().expect("subscribe");
    Client { store, session }
}

fn global_ids(client: &Client) -> Vec<String> {
    client
        .session
        .registry
        .programs()
        .into_iter()
        .map(|program| program.global_id)
        .collect()
}

#[test]
fn launch_on_one_client_opens_once_everywhere() {
    let backend = MemoryRealtimeBackend::new();
    let alice = join(&backend, "alice");
    let bob = join(&backend, "bob");

    let id = alice
        .session
        .launch("notepad", PropsBag::new())
        .expect("launch")
        .expect("opened");

    assert_eq!(alice.session.registry.programs().len(), 1);
    assert_eq!(bob.session.registry.programs().len(), 1);
    assert_eq!(global_ids(&alice), global_ids(&bob));
    assert_eq!(
        bob.session.registry.find(&id).map(|program| program.program_type),
        Some("notepad".to_string())
    );

    let log = decode_command_log(backend.snapshot(COMMAND_LOG_PATH));
    assert_eq!(log.len(), 1);
    assert!(log.iter().all(|(_, event)| event.processed));
}

#[test]
fn late_joiner_does_not_replay_processed_opens() {
    let backend = MemoryRealtimeBackend::new();
    let alice = join(&backend, "alice");
    alice
        .session
        .launch("paint", PropsBag::new())
        .expect("launch");
    alice
        .session
        .launch("minesweeper", PropsBag::new())
        .expect("launch");

    let carol = join(&backend, "carol");
    assert_eq!(carol.session.registry.programs().len(), 2);
    assert_eq!(alice.session.registry.programs().len(), 2);
}

#[test]
fn close_and_focus_fan_out() {
    let backend = MemoryRealtimeBackend::new();
    let alice = join(&backend, "alice");
    let bob = join(&backend, "bob");

    let first = alice
        .session
        .launch("notepad", PropsBag::new())
        .expect("launch")
        .expect("opened");
    let second = alice
        .session
        .launch("paint", PropsBag::new())
        .expect("launch")
        .expect("opened");
    assert_eq!(
        bob.session.registry.topmost().map(|program| program.id),
        Some(second.clone())
    );

    bob.session.commands.activate(&first).expect("focus");
    assert_eq!(
        alice.session.registry.topmost().map(|program| program.id),
        Some(first.clone())
    );

    bob.session.commands.terminate(&first).expect("close");
    assert_eq!(alice.session.registry.find(&first), None);
    assert_eq!(bob.session.registry.find(&first), None);
    assert!(alice.session.registry.is_running("paint"));
}

#[test]
fn props_updates_replicate() {
    let backend = MemoryRealtimeBackend::new();
    let alice = join(&backend, "alice");
    let bob = join(&backend, "bob");
    let id = alice
        .session
        .launch("notepad", PropsBag::new())
        .expect("launch")
        .expect("opened");

    let mut patch = PropsBag::new();
    patch.insert("content".to_string(), json!("hello"));
    alice
        .session
        .registry
        .update_props(&id, patch)
        .expect("update");

    let mirrored = bob.session.registry.find(&id).expect("mirrored");
    assert_eq!(mirrored.props["content"], json!("hello"));
}

#[test]
fn defaults_are_materialized_by_the_first_client_only() {
    let backend = MemoryRealtimeBackend::new();
    let alice = join(&backend, "alice");
    let bob = join(&backend, "bob");

    assert!(alice.session.settings.icon_size.default_written());
    assert!(!bob.session.settings.icon_size.default_written());
    assert_eq!(backend.snapshot(ICON_SIZE_PATH), Some(json!("medium")));
    assert_eq!(
        alice.session.settings.snapshot(),
        bob.session.settings.snapshot()
    );
}

#[test]
fn wallpaper_change_reaches_peers() {
    let backend = MemoryRealtimeBackend::new();
    let alice = join(&backend, "alice");
    let bob = join(&backend, "bob");

    alice
        .session
        .settings
        .set_wallpaper(None)
        .expect("clear wallpaper");
    assert_eq!(bob.session.settings.wallpaper(), None);

    alice
        .session
        .settings
        .set_wallpaper(Some("/assets/wallpapers/autumn.webp"))
        .expect("set wallpaper");
    assert_eq!(
        bob.session.settings.wallpaper().as_deref(),
        Some("/assets/wallpapers/autumn.webp")
    );
}

#[test]
fn show_desktop_minimizes_every_window_on_every_client() {
    let backend = MemoryRealtimeBackend::new();
    let alice = join(&backend, "alice");
    let bob = join(&backend, "bob");
    alice
        .session
        .launch("notepad", PropsBag::new())
        .expect("launch");
    alice
        .session
        .launch("paint", PropsBag::new())
        .expect("launch");

    bob.session.system.trigger_show_desktop().expect("trigger");

    for client in [&alice, &bob] {
        assert!(client
            .session
            .registry
            .programs()
            .iter()
            .all(|program| program.is_minimized));
        assert!(!client.session.system.show_desktop().triggered);
    }
}

#[test]
fn peers_see_each_other_until_disconnect() {
    let backend = MemoryRealtimeBackend::new();
    let alice = join(&backend, "alice");
    let bob = join(&backend, "bob");

    let seen_by_alice: Vec<String> = alice
        .session
        .presence
        .peers()
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(seen_by_alice, vec!["bob".to_string()]);
    assert_eq!(bob.session.presence.peers().len(), 1);

    bob.store.disconnect();
    assert_eq!(backend.snapshot("cursors/bob"), None);
    assert!(alice.session.presence.peers().is_empty());
}

#[test]
fn teardown_removes_presence_and_listeners() {
    let backend = MemoryRealtimeBackend::new();
    let alice = join(&backend, "alice");
    let bob = join(&backend, "bob");
    let before = backend.listener_count();

    bob.session.teardown();
    assert_eq!(backend.listener_count(), before - 12);
    assert!(alice.session.presence.peers().is_empty());
    assert!(backend.snapshot("cursors/alice").is_some());
}
