use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use syncednotes_session::{
    DispatchOutcome, EditSessionManager, FsShell, HostEditorShell, MemoryShell, NamingPolicy,
    ResourceId, ResourceNamer, SessionError, ShellEvent, ShellEventKind,
};
use syncednotes_tree::{Base64Codec, Codec, NoteNode, NoteTree, NoteTreeStore, TreeOwner};
use tempfile::tempdir;

struct CountingOwner {
    tree: NoteTree,
    persisted: usize,
}

impl TreeOwner for CountingOwner {
    fn tree(&self) -> &NoteTree {
        &self.tree
    }

    fn tree_mut(&mut self) -> &mut NoteTree {
        &mut self.tree
    }

    fn save_to_config(&mut self) {
        self.persisted += 1;
    }
}

fn encoded(text: &str) -> String {
    Base64Codec.encode(text).expect("encode")
}

fn decoded(owner: &CountingOwner, path: &str) -> String {
    owner
        .tree
        .find(path)
        .expect("note")
        .decoded_content(&Base64Codec, None)
        .expect("decode")
}

fn single_note_owner() -> CountingOwner {
    let mut tree = NoteTree::empty("Notes");
    tree.add_child("Notes", NoteNode::note("note1", "Notes/note1", encoded("start")))
        .expect("insert");
    CountingOwner { tree, persisted: 0 }
}

fn twin_label_owner() -> CountingOwner {
    let mut tree = NoteTree::empty("Notes");
    for folder in ["a", "b"] {
        let folder_path = NoteTree::child_path("Notes", folder);
        tree.add_child("Notes", NoteNode::folder(folder, folder_path.clone()))
            .expect("folder");
        tree.add_child(
            &folder_path,
            NoteNode::note(
                "note1",
                NoteTree::child_path(&folder_path, "note1"),
                encoded(&format!("from {folder}")),
            ),
        )
        .expect("note");
    }
    CountingOwner { tree, persisted: 0 }
}

#[test]
fn two_saves_then_close() {
    let mut owner = single_note_owner();
    let mut shell = MemoryShell::new();
    let mut manager = EditSessionManager::new(ResourceNamer::new(NamingPolicy::Label, ".md"));
    let codec = Base64Codec;

    let id = manager
        .open_editor("Notes/note1", &mut shell, &owner, &codec)
        .expect("open");
    let resource = ResourceId::new("note1.md");
    assert_eq!(shell.text(&resource), Some("start"));

    for (round, text) in ["first edit", "second edit"].into_iter().enumerate() {
        shell.edit(&resource, text);
        let event = shell.emit_save(&resource).expect("save subscription armed");
        let outcome = manager
            .dispatch(&event, &mut shell, &mut owner, &codec)
            .expect("save");
        assert_eq!(
            outcome,
            DispatchOutcome::Saved {
                session: id,
                saves: round as u32 + 1,
            }
        );
    }
    assert_eq!(decoded(&owner, "Notes/note1"), "second edit");
    assert_eq!(owner.persisted, 2);

    let close = shell.emit_close(&resource).expect("close subscription armed");
    let outcome = manager
        .dispatch(&close, &mut shell, &mut owner, &codec)
        .expect("close");
    assert_eq!(outcome, DispatchOutcome::Closed { session: id });
    assert!(!shell.exists(&resource));
    assert!(manager.is_empty());

    assert_eq!(shell.emit_save(&resource), None);
    assert_eq!(shell.emit_close(&resource), None);
    let late = ShellEvent::saved(resource.clone());
    assert_eq!(
        manager
            .dispatch(&late, &mut shell, &mut owner, &codec)
            .expect("late save"),
        DispatchOutcome::Ignored
    );
    assert_eq!(owner.persisted, 2);
}

#[test]
fn label_naming_refuses_second_note_with_same_label() {
    let mut owner = twin_label_owner();
    let mut shell = MemoryShell::new();
    let mut manager = EditSessionManager::new(ResourceNamer::new(NamingPolicy::Label, ".md"));
    let codec = Base64Codec;

    manager
        .open_editor("Notes/a/note1", &mut shell, &owner, &codec)
        .expect("first open");
    let err = manager
        .open_editor("Notes/b/note1", &mut shell, &owner, &codec)
        .expect_err("collision");
    match err {
        SessionError::ResourceBusy { resource, holder } => {
            assert_eq!(resource, ResourceId::new("note1.md"));
            assert_eq!(holder, "Notes/a/note1");
        }
        other => panic!("unexpected error: {other}"),
    }

    let resource = ResourceId::new("note1.md");
    assert_eq!(shell.text(&resource), Some("from a"));
    shell.edit(&resource, "edited a");
    let event = shell.emit_save(&resource).expect("armed");
    manager
        .dispatch(&event, &mut shell, &mut owner, &codec)
        .expect("save");
    assert_eq!(decoded(&owner, "Notes/a/note1"), "edited a");
    assert_eq!(decoded(&owner, "Notes/b/note1"), "from b");
}

#[test]
fn path_naming_keeps_same_labels_apart() {
    let mut owner = twin_label_owner();
    let mut shell = MemoryShell::new();
    let mut manager = EditSessionManager::default();
    let codec = Base64Codec;

    manager
        .open_editor("Notes/a/note1", &mut shell, &owner, &codec)
        .expect("open a");
    manager
        .open_editor("Notes/b/note1", &mut shell, &owner, &codec)
        .expect("open b");
    assert_eq!(manager.len(), 2);

    let a = shell.resource_for("Notes_a_note1.md");
    let b = shell.resource_for("Notes_b_note1.md");

    // Interleave events across the two sessions.
    shell.edit(&b, "b v1");
    let save_b = shell.emit_save(&b).expect("b armed");
    shell.edit(&a, "a v1");
    let save_a = shell.emit_save(&a).expect("a armed");
    let close_b = shell.emit_close(&b).expect("b close armed");

    for event in [&save_b, &save_a, &close_b] {
        manager
            .dispatch(event, &mut shell, &mut owner, &codec)
            .expect("dispatch");
    }

    assert_eq!(decoded(&owner, "Notes/a/note1"), "a v1");
    assert_eq!(decoded(&owner, "Notes/b/note1"), "b v1");
    assert_eq!(manager.len(), 1);
    assert!(shell.exists(&a));
    assert!(!shell.exists(&b));
}

#[test]
fn nested_and_underscored_paths_get_separate_resources() {
    let mut tree = NoteTree::empty("Notes");
    tree.add_child("Notes", NoteNode::folder("a", "Notes/a"))
        .expect("folder");
    tree.add_child("Notes/a", NoteNode::note("b", "Notes/a/b", encoded("nested")))
        .expect("nested note");
    tree.add_child("Notes", NoteNode::note("a_b", "Notes/a_b", encoded("flat")))
        .expect("flat note");
    let mut owner = CountingOwner { tree, persisted: 0 };
    let mut shell = MemoryShell::new();
    let mut manager = EditSessionManager::default();
    let codec = Base64Codec;

    manager
        .open_editor("Notes/a/b", &mut shell, &owner, &codec)
        .expect("open nested");
    let nested = shell.resource_for("Notes_a_b.md");
    shell.edit(&nested, "unsaved nested draft");

    let preview = manager
        .preview("Notes/a_b", &mut shell, &owner, &codec)
        .expect("preview flat");
    assert_ne!(preview, nested);
    assert_eq!(shell.text(&preview), Some("flat"));

    manager
        .open_editor("Notes/a_b", &mut shell, &owner, &codec)
        .expect("open flat");
    assert_eq!(manager.len(), 2);

    shell.edit(&preview, "flat v2");
    let event = shell.emit_save(&preview).expect("flat armed");
    manager
        .dispatch(&event, &mut shell, &mut owner, &codec)
        .expect("save flat");
    assert_eq!(decoded(&owner, "Notes/a_b"), "flat v2");
    assert_eq!(decoded(&owner, "Notes/a/b"), "nested");
    assert_eq!(shell.text(&nested), Some("unsaved nested draft"));
}

#[test]
fn codec_failure_on_save_surfaces_and_keeps_content() {
    struct RejectingCodec;

    impl Codec for RejectingCodec {
        fn encode(&self, _text: &str) -> Result<String, syncednotes_tree::CodecError> {
            Err(syncednotes_tree::CodecError::Other("encoder offline".into()))
        }

        fn decode(&self, blob: &str) -> Result<String, syncednotes_tree::CodecError> {
            Base64Codec.decode(blob)
        }
    }

    let mut owner = single_note_owner();
    let mut shell = MemoryShell::new();
    let mut manager = EditSessionManager::default();

    manager
        .open_editor("Notes/note1", &mut shell, &owner, &RejectingCodec)
        .expect("open");
    let resource = shell.resource_for("Notes_note1.md");
    shell.edit(&resource, "lost?");
    let event = shell.emit_save(&resource).expect("armed");

    let err = manager
        .dispatch(&event, &mut shell, &mut owner, &RejectingCodec)
        .expect_err("codec failure");
    assert!(matches!(err, SessionError::Codec(_)));
    assert_eq!(decoded(&owner, "Notes/note1"), "start");
    assert_eq!(owner.persisted, 0);
    assert_eq!(manager.len(), 1);
    assert_eq!(shell.text(&resource), Some("lost?"));
}

#[test]
fn close_after_external_deletion_still_finishes() {
    let mut owner = single_note_owner();
    let mut shell = MemoryShell::new();
    let mut manager = EditSessionManager::default();
    let codec = Base64Codec;

    manager
        .open_editor("Notes/note1", &mut shell, &owner, &codec)
        .expect("open");
    let resource = shell.resource_for("Notes_note1.md");
    shell.remove_externally(&resource);

    let close = ShellEvent {
        kind: ShellEventKind::Closed,
        resource: resource.clone(),
    };
    let outcome = manager
        .dispatch(&close, &mut shell, &mut owner, &codec)
        .expect("close");
    assert!(matches!(outcome, DispatchOutcome::Closed { .. }));
    assert_eq!(shell.live_subscriptions(), 0);
}

#[test]
fn fs_shell_session_persists_through_store() {
    let dir = tempdir().expect("tempdir");
    let codec = Base64Codec;
    let store_path = dir.path().join("notes.json");
    let mut store = NoteTreeStore::load(&store_path).expect("store");
    store
        .tree_mut()
        .add_child("Notes", NoteNode::note("todo", "Notes/todo", encoded("- milk")))
        .expect("insert");

    let mut shell = FsShell::new(dir.path().join("scratch"), None).expect("shell");
    let mut manager = EditSessionManager::default();
    manager
        .open_editor("Notes/todo", &mut shell, &store, &codec)
        .expect("open");

    let resource = shell.resource_for("Notes_todo.md");
    let path = Path::new(resource.as_str()).to_path_buf();
    assert_eq!(fs::read_to_string(&path).expect("temp file"), "- milk");

    fs::write(&path, "- milk\n- eggs").expect("edit");
    let mut saved = false;
    let deadline = Instant::now() + Duration::from_secs(5);
    while !saved && Instant::now() < deadline {
        for event in shell.poll_events(Duration::from_millis(100)).expect("poll") {
            let outcome = manager
                .dispatch(&event, &mut shell, &mut store, &codec)
                .expect("dispatch");
            saved |= matches!(outcome, DispatchOutcome::Saved { .. });
        }
    }
    assert!(saved, "save event should be observed");

    let reloaded = NoteTreeStore::load(&store_path).expect("reload");
    let todo = reloaded.tree().find("Notes/todo").expect("todo");
    assert_eq!(
        todo.decoded_content(&codec, None).expect("decode"),
        "- milk\n- eggs"
    );

    manager
        .dispatch(&ShellEvent::closed(resource), &mut shell, &mut store, &codec)
        .expect("close");
    assert!(!path.exists());
}
