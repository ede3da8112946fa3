//! Black-box codec tests (spec §8): byte-exact wire vectors, round-trips,
//! and the malformed-input cases the protocol-error classifier must reject.

use robots::protocol::{
    ClientMessage, Direction, Event, HelloParams, Position, ProtocolError, ServerMessage,
};
use std::io::Cursor;

#[tokio::test]
async fn vector_move_right_client_to_server() {
    let msg = ClientMessage::Move(Direction::Right);
    assert_eq!(msg.encode().to_vec(), vec![0x03, 0x01]);

    let mut cursor = Cursor::new(&[0x03u8, 0x01][..]);
    let decoded = ClientMessage::decode(&mut cursor).await.unwrap();
    assert_eq!(decoded, msg);
}

#[tokio::test]
async fn vector_hello_server_to_client() {
    let msg = ServerMessage::Hello(HelloParams {
        server_name: "srv".to_string(),
        players_count: 2,
        size_x: 10,
        size_y: 10,
        game_length: 50,
        explosion_radius: 3,
        bomb_timer: 5,
    });
    let expected = vec![
        0x00, 0x03, b's', b'r', b'v', 0x02, 0x00, 0x0A, 0x00, 0x0A, 0x00, 0x32, 0x00, 0x03, 0x00,
        0x05,
    ];
    assert_eq!(msg.encode().to_vec(), expected);

    let mut cursor = Cursor::new(expected.as_slice());
    let decoded = ServerMessage::decode(&mut cursor).await.unwrap();
    assert_eq!(decoded, msg);
}

#[tokio::test]
async fn vector_bomb_placed_event() {
    let event = Event::BombPlaced { bomb_id: 7, position: Position::new(4, 5) };
    let mut buf = bytes::BytesMut::new();
    event.encode_into(&mut buf);
    assert_eq!(
        buf.to_vec(),
        vec![0x00, 0x00, 0x00, 0x00, 0x07, 0x00, 0x04, 0x00, 0x05]
    );

    let mut cursor = Cursor::new(buf.as_ref());
    let decoded = Event::decode(&mut cursor).await.unwrap();
    assert_eq!(decoded, event);
}

#[tokio::test]
async fn vector_turn_with_one_player_moved_event() {
    // Byte layout per spec §3/§4.1's documented field widths (consistent
    // with the Hello and BombPlaced vectors above): message tag (1) + turn
    // (u16) + event list_len (u32) + event tag (1) + player_id (u8) +
    // position (u16, u16).
    let msg = ServerMessage::Turn {
        turn: 1,
        events: vec![Event::PlayerMoved { player_id: 0, position: Position::new(0, 1) }],
    };
    let expected = vec![
        0x03, // tag: Turn
        0x00, 0x01, // turn = 1
        0x00, 0x00, 0x00, 0x01, // events.len() = 1
        0x02, // event tag: PlayerMoved
        0x00, // player_id = 0
        0x00, 0x00, // position.x = 0
        0x00, 0x01, // position.y = 1
    ];
    assert_eq!(msg.encode().to_vec(), expected);

    let mut cursor = Cursor::new(expected.as_slice());
    let decoded = ServerMessage::decode(&mut cursor).await.unwrap();
    assert_eq!(decoded, msg);
}

#[tokio::test]
async fn join_round_trips() {
    let msg = ClientMessage::Join { name: "alice".to_string() };
    let bytes = msg.encode().to_vec();
    let mut cursor = Cursor::new(bytes.as_slice());
    assert_eq!(ClientMessage::decode(&mut cursor).await.unwrap(), msg);
}

#[tokio::test]
async fn game_ended_round_trips() {
    let msg = ServerMessage::GameEnded { scores: vec![(0, 3), (1, 1)] };
    let bytes = msg.encode().to_vec();
    let mut cursor = Cursor::new(bytes.as_slice());
    assert_eq!(ServerMessage::decode(&mut cursor).await.unwrap(), msg);
}

#[tokio::test]
async fn unknown_client_message_tag_is_a_protocol_error() {
    let mut cursor = Cursor::new(&[0xFFu8][..]);
    let err = ClientMessage::decode(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownTag { tag: 0xFF, .. }));
}

#[tokio::test]
async fn truncated_message_is_eof() {
    // Move's direction byte is missing.
    let mut cursor = Cursor::new(&[0x03u8][..]);
    let err = ClientMessage::decode(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Eof));
}

#[tokio::test]
async fn direction_out_of_range_is_rejected() {
    let mut cursor = Cursor::new(&[0x03u8, 0x04][..]);
    let err = ClientMessage::decode(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidDirection(4)));
}

#[tokio::test]
async fn string_length_exceeding_remaining_bytes_is_rejected() {
    // Join with a claimed 5-byte name but only 2 bytes actually follow.
    let mut cursor = Cursor::new(&[0x00u8, 0x05, b'a', b'b'][..]);
    let err = ClientMessage::decode(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Eof));
}

#[tokio::test]
async fn gui_datagram_with_trailing_bytes_is_rejected() {
    use robots::protocol::GuiMessage;
    // A valid PlaceBomb datagram (1 byte) with one trailing byte appended.
    let data = [0x01u8, 0x00];
    let err = GuiMessage::decode_datagram(&data).await.unwrap_err();
    assert!(matches!(err, ProtocolError::TrailingBytes(1)));
}

#[tokio::test]
async fn gui_datagram_decodes_exactly_when_fully_consumed() {
    use robots::protocol::GuiMessage;
    let data = [0x03u8, 0x02]; // Move(Down)
    let decoded = GuiMessage::decode_datagram(&data).await.unwrap();
    assert_eq!(decoded, GuiMessage::Move(Direction::Down));
}
