/// Reconciliation tests
/// End-to-end flows through the chat room, with payloads shaped like the transport sends them

use chatroom_core::bus::{EventName, EventPayload};
use chatroom_core::chat_room::{ChatRoom, Component};
use chatroom_core::chat_types::{Message, RelationshipState};
use chatroom_core::ChatError;
use serde_json::json;

fn signed_in(nickname: &str) -> ChatRoom {
    let mut room = ChatRoom::new();
    room.deliver_json("show_user_info", json!({ "nickname": nickname }))
        .unwrap();
    room
}

fn add_contact(room: &mut ChatRoom, nickname: &str, status: &str) {
    room.deliver_json(
        "add_contact_to_list",
        json!({
            "contact_data": { "nickname": nickname, "image_profile": format!("/img/{}.png", nickname) },
            "request": { "status": status },
            "is_group": false
        }),
    )
    .unwrap();
}

fn state_of(room: &ChatRoom, identity: &str) -> Option<RelationshipState> {
    room.directory()
        .unwrap()
        .get(identity)
        .and_then(|c| c.relationship)
}

#[test]
fn test_pending_contact_accepted_through_resolver() {
    let mut room = signed_in("me");
    add_contact(&mut room, "bob", "pending");

    room.deliver_json(
        "open_chat_request_received",
        json!({ "from_user": "bob", "to_user": "me" }),
    )
    .unwrap();
    assert_eq!(
        room.resolver().unwrap().prompt().as_deref(),
        Some("bob sent you a friend request.")
    );

    room.accept_request().unwrap();
    assert_eq!(state_of(&room, "bob"), Some(RelationshipState::Accepted));

    let outbound = room.take_outbound();
    assert_eq!(outbound.len(), 1);
    match &outbound[0].payload {
        EventPayload::StatusRequest(notice) => {
            assert_eq!(notice.status, RelationshipState::Accepted);
            assert_eq!(notice.contact_name, "me");
            assert_eq!(notice.from_user_name, "bob");
        }
        other => panic!("unexpected outbound payload {:?}", other),
    }
}

#[test]
fn test_status_update_changes_only_the_counterpart() {
    // Current user is "b"; both "a" and "b" are pending entries
    let mut room = signed_in("b");
    add_contact(&mut room, "a", "pending");
    add_contact(&mut room, "b", "pending");

    room.deliver_json(
        "update_contact_status",
        json!({ "request": { "from_user": "a", "to_user": "b" }, "new_status": "accepted" }),
    )
    .unwrap();

    assert_eq!(state_of(&room, "a"), Some(RelationshipState::Accepted));
    assert_eq!(state_of(&room, "b"), Some(RelationshipState::Pending));
}

#[test]
fn test_stale_status_update_is_ignored() {
    let mut room = signed_in("me");
    add_contact(&mut room, "bob", "accepted");
    add_contact(&mut room, "eve", "rejected");

    for (from, status) in [("bob", "rejected"), ("eve", "accepted")] {
        room.deliver_json(
            "update_contact_status",
            json!({ "request": { "from_user": from, "to_user": "me" }, "new_status": status }),
        )
        .unwrap();
    }

    assert_eq!(state_of(&room, "bob"), Some(RelationshipState::Accepted));
    assert_eq!(state_of(&room, "eve"), Some(RelationshipState::Rejected));
    assert!(room.bus().get_event(EventName::UpdateContactStatus).is_none());
}

#[test]
fn test_rejected_contact_removed_by_transport() {
    let mut room = signed_in("me");
    add_contact(&mut room, "bob", "rejected");
    add_contact(&mut room, "eve", "pending");
    room.select_contact("bob").unwrap();
    room.take_outbound();

    room.deliver_json("delete_rejected_contact", json!("bob"))
        .unwrap();

    let dir = room.directory().unwrap();
    assert_eq!(dir.contacts().len(), 1);
    assert_eq!(dir.selected(), None);

    let outbound = room.take_outbound();
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].name, EventName::DeleteContact);
    assert_eq!(outbound[0].payload, EventPayload::Identity("bob".to_string()));
}

#[test]
fn test_duplicate_add_keeps_first_entry() {
    let mut room = signed_in("me");
    add_contact(&mut room, "bob", "pending");
    add_contact(&mut room, "bob", "accepted");

    let dir = room.directory().unwrap();
    assert_eq!(dir.contacts().len(), 1);
    assert_eq!(state_of(&room, "bob"), Some(RelationshipState::Pending));
}

#[test]
fn test_bulk_contact_list_and_groups() {
    let mut room = signed_in("me");
    room.deliver_json(
        "show_list_contact",
        json!([
            { "contact_data": { "nickname": "bob" }, "request": { "status": "accepted" } },
            { "contact_data": { "nickname": "eve" }, "request": { "status": "pending" } }
        ]),
    )
    .unwrap();
    room.deliver_json(
        "add_group_to_list",
        json!({ "group_data": { "name": "Climbers", "image": "/img/g.png" }, "is_group": true }),
    )
    .unwrap();

    let dir = room.directory().unwrap();
    let names: Vec<_> = dir.contacts().iter().map(|c| c.identity.as_str()).collect();
    assert_eq!(names, vec!["bob", "eve", "Climbers"]);
    assert_eq!(dir.get("Climbers").unwrap().image_ref.as_deref(), Some("/img/g.png"));
    assert_eq!(dir.get("Climbers").unwrap().relationship, None);
}

#[test]
fn test_malformed_payload_fails_fast() {
    let mut room = signed_in("me");
    let err = room
        .deliver_json("add_contact_to_list", json!({ "is_group": false }))
        .unwrap_err();
    assert!(matches!(err, ChatError::InvalidPayload { .. }));

    let err = room
        .deliver_json("open_chat_request_received", json!({ "from_user": "bob" }))
        .unwrap_err();
    assert!(matches!(err, ChatError::Serialization(_)));

    assert!(room.directory().unwrap().contacts().is_empty());
    assert!(room.bus().pending_names().is_empty());
}

#[test]
fn test_snapshot_then_arrivals() {
    let mut room = signed_in("me");
    room.deliver_json(
        "show_list_messages",
        json!([
            { "public_id_msg": "m1", "text": "hi", "sender": "bob" },
            { "public_id_msg": "m2", "text": "hey", "sender": "me" }
        ]),
    )
    .unwrap();
    room.deliver_json(
        "show_message_to_send",
        json!({ "public_id_msg": "m3", "text": "how are you?", "sender": "bob" }),
    )
    .unwrap();
    room.deliver_json(
        "show_message_to_send",
        json!({ "public_id_msg": "m4", "text": "  " }),
    )
    .unwrap();

    let log = room.log().unwrap();
    let ids: Vec<_> = log.messages().iter().map(|m| m.public_id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3"]);
    assert!(log.is_outgoing(&log.messages()[1]));
    assert!(!log.is_outgoing(&log.messages()[0]));
}

#[test]
fn test_overwrite_before_poll_keeps_latest_only() {
    let mut room = signed_in("me");
    room.unmount(Component::Log);

    for (id, text) in [("m1", "first"), ("m2", "second")] {
        room.deliver(
            EventName::ShowMessageToSend,
            EventPayload::Message(Message::new(id, text, None)),
        )
        .unwrap();
    }
    assert_eq!(room.bus().get_event(EventName::ShowMessageToSend).unwrap().version, 2);

    room.mount(Component::Log).unwrap();
    let log = room.log().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log.latest().unwrap().text, "second");
}

#[test]
fn test_unmounted_directory_leaves_status_update_on_bus() {
    let mut room = signed_in("me");
    add_contact(&mut room, "bob", "pending");
    room.deliver_json(
        "open_chat_request_received",
        json!({ "from_user": "bob", "to_user": "me" }),
    )
    .unwrap();

    room.unmount(Component::Directory);
    room.reject_request().unwrap();
    assert!(room.bus().get_event(EventName::UpdateContactStatus).is_some());

    // A fresh directory has no bob to update; the instruction is still consumed
    room.mount(Component::Directory).unwrap();
    assert!(room.bus().get_event(EventName::UpdateContactStatus).is_none());
    assert!(room.directory().unwrap().contacts().is_empty());
}

#[test]
fn test_log_listener_sees_every_change() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut room = signed_in("me");
    let anchors = Rc::new(RefCell::new(Vec::new()));
    let sink = anchors.clone();
    room.log_mut().unwrap().on_change(move |messages| {
        sink.borrow_mut()
            .push(messages.last().map(|m| m.text.clone()));
    });

    room.send_text("one").unwrap();
    room.send_text(" ").unwrap();
    room.send_text("two").unwrap();

    assert_eq!(
        *anchors.borrow(),
        vec![Some("one".to_string()), Some("two".to_string())]
    );
}
