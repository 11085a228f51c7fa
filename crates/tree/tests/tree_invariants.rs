use std::fs;

use syncednotes_tree::{
    Base64Codec, Codec, NodeKind, NoteNode, NoteTree, NoteTreeStore, TreeOwner,
};
use tempfile::tempdir;

fn assert_state_consistent(node: &NoteNode) {
    let state = node.state();
    let children = node.children();
    assert_eq!(state.has_children, !children.is_empty());
    assert_eq!(
        state.is_empty_folder,
        node.kind() == NodeKind::Folder && children.is_empty()
    );
    assert_eq!(
        state.has_sub_folders,
        children.iter().any(|child| child.kind() == NodeKind::Folder)
    );
}

#[test]
fn derived_state_is_consistent_after_every_insertion() {
    let mut tree = NoteTree::empty("Notes");
    let steps = [
        ("Notes", NoteNode::folder("a", "Notes/a")),
        ("Notes/a", NoteNode::note("n1", "Notes/a/n1", "")),
        ("Notes/a", NoteNode::folder("b", "Notes/a/b")),
        ("Notes/a/b", NoteNode::folder("c", "Notes/a/b/c")),
        ("Notes", NoteNode::note("n2", "Notes/n2", "")),
    ];

    for (parent, node) in steps {
        let kinds_before: Vec<(String, NodeKind)> = tree
            .root()
            .walk()
            .map(|n| (n.full_path().to_string(), n.kind()))
            .collect();

        tree.add_child(parent, node).expect("insert");

        for node in tree.root().walk() {
            assert_state_consistent(node);
        }
        for (path, kind) in kinds_before {
            assert_eq!(tree.find(&path).expect("still present").kind(), kind);
        }
    }
}

#[test]
fn codec_roundtrip_for_representative_inputs() {
    let codec = Base64Codec;
    for text in ["", "first line\nsecond line\n\nfourth", "unicode: 日本語 — ñ — 🦀"] {
        let blob = codec.encode(text).expect("encode");
        assert_eq!(codec.decode(&blob).expect("decode"), text);
    }
}

#[test]
fn edited_content_survives_store_reload() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("notes").join("tree.json");
    let codec = Base64Codec;

    let mut store = NoteTreeStore::load(&path).expect("load");
    let blob = codec.encode("draft").expect("encode");
    store
        .tree_mut()
        .add_child("Notes", NoteNode::note("draft", "Notes/draft", blob))
        .expect("insert");
    store.save_to_config();

    let revision = store.tree().revision;
    let blob = codec.encode("final text").expect("encode");
    store
        .tree_mut()
        .set_content("Notes/draft", blob)
        .expect("set content");
    assert_eq!(store.tree().revision, revision + 1);
    store.save_to_config();
    assert_eq!(store.save_count(), 2);

    let reloaded = NoteTreeStore::load(&path).expect("reload");
    let draft = reloaded.tree().find("Notes/draft").expect("draft");
    assert_eq!(draft.decoded_content(&codec, None).expect("decode"), "final text");
    assert!(fs::read_to_string(&path).expect("read").contains("\"content\""));
}
