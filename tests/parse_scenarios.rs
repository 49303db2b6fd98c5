use log::debug;

use wirews::close::{parse_close_payload, CloseFrame};
use wirews::engine::{consume, ConnState, FrameHandler, POST_PADDING, ERR_PROTOCOL};
use wirews::frame::OpCode;
use wirews::role::{Client, RoleHelper, Server};

#[derive(Default)]
struct Record {
    fragments: Vec<(Vec<u8>, u64, OpCode, bool)>,
    closed: Option<&'static str>,
}

impl FrameHandler for Record {
    fn handle_fragment(
        &mut self,
        data: &[u8],
        remaining: u64,
        opcode: OpCode,
        fin: bool,
        _compressed: bool,
    ) -> bool {
        debug!("fragment: {} bytes, {:?}, remaining {}", data.len(), opcode, remaining);
        self.fragments.push((data.to_vec(), remaining, opcode, fin));
        false
    }

    fn force_close(&mut self, reason: &'static str) {
        debug!("force close: {}", reason);
        self.closed = Some(reason);
    }
}

fn feed<Role: RoleHelper>(state: &mut ConnState<Role>, record: &mut Record, chunk: &[u8]) {
    let mut buf = vec![0_u8; Role::PRE_PADDING + chunk.len() + POST_PADDING];
    buf[Role::PRE_PADDING..Role::PRE_PADDING + chunk.len()].copy_from_slice(chunk);
    consume(&mut buf, chunk.len(), state, record);
}

#[test]
fn short_unmasked_text() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut state = ConnState::<Client>::new();
    let mut record = Record::default();

    feed(&mut state, &mut record, &[0x81, 0x05, 0x48, 0x65, 0x6c, 0x6c, 0x6f]);

    assert_eq!(record.closed, None);
    assert_eq!(
        record.fragments,
        [(b"Hello".to_vec(), 0, OpCode::Text, true)]
    );
}

#[test]
fn short_masked_text() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut state = ConnState::<Server>::new();
    let mut record = Record::default();

    feed(
        &mut state,
        &mut record,
        &[0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58],
    );

    assert_eq!(record.closed, None);
    assert_eq!(
        record.fragments,
        [(b"Hello".to_vec(), 0, OpCode::Text, true)]
    );
}

#[test]
fn fragmented_text() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut state = ConnState::<Client>::new();
    let mut record = Record::default();

    feed(&mut state, &mut record, &[0x01, 0x03, 0x66, 0x6f, 0x6f]);
    feed(&mut state, &mut record, &[0x80, 0x03, 0x62, 0x61, 0x72]);

    assert_eq!(record.closed, None);
    assert_eq!(
        record.fragments,
        [
            (b"foo".to_vec(), 0, OpCode::Text, false),
            (b"bar".to_vec(), 0, OpCode::Continue, true),
        ]
    );
    assert_eq!(state.op_depth(), -1);
}

#[test]
fn ping_inside_fragmented_binary() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut state = ConnState::<Client>::new();
    let mut record = Record::default();

    feed(&mut state, &mut record, &[0x02, 0x03, 0xaa, 0xbb, 0xcc]);
    assert_eq!(state.op_depth(), 0);

    feed(&mut state, &mut record, &[0x89, 0x00]);
    assert_eq!(state.op_depth(), 0);

    feed(&mut state, &mut record, &[0x80, 0x03, 0xdd, 0xee, 0xff]);

    assert_eq!(record.closed, None);
    assert_eq!(
        record.fragments,
        [
            (vec![0xaa, 0xbb, 0xcc], 0, OpCode::Binary, false),
            (vec![], 0, OpCode::Ping, true),
            (vec![0xdd, 0xee, 0xff], 0, OpCode::Continue, true),
        ]
    );
    assert_eq!(state.op_depth(), -1);
}

#[test]
fn payload_split_across_reads() {
    let _ = env_logger::builder().is_test(true).try_init();

    let payload: Vec<u8> = (0..200_u8).collect();
    let mut frame = vec![0x82, 126];
    frame.extend_from_slice(&200_u16.to_be_bytes());
    frame.extend_from_slice(&payload);

    let mut state = ConnState::<Client>::new();
    let mut record = Record::default();

    // head plus the first half of the payload, then the rest
    feed(&mut state, &mut record, &frame[..104]);
    assert_eq!(record.fragments.len(), 1);
    assert_eq!(record.fragments[0].1, 100);
    assert!(!state.wants_head());
    assert_eq!(state.remaining(), 100);

    feed(&mut state, &mut record, &frame[104..]);
    assert_eq!(record.closed, None);
    assert_eq!(record.fragments.len(), 2);
    assert_eq!(record.fragments[1].1, 0);

    let total: Vec<u8> = record
        .fragments
        .iter()
        .flat_map(|f| f.0.iter().copied())
        .collect();
    assert_eq!(total, payload);
    assert!(state.wants_head());
}

#[test]
fn close_with_invalid_reason() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut state = ConnState::<Client>::new();
    let mut record = Record::default();

    feed(&mut state, &mut record, &[0x88, 0x05, 0x03, 0xe8, 0xff, 0xfe, 0xfd]);

    assert_eq!(record.closed, None);
    let (payload, _, opcode, fin) = &record.fragments[0];
    assert_eq!(*opcode, OpCode::Close);
    assert!(*fin);

    assert_eq!(
        parse_close_payload(payload),
        CloseFrame {
            code: 1006,
            reason: "Received invalid close payload"
        }
    );
}

#[test]
fn new_data_frame_inside_open_message() {
    let _ = env_logger::builder().is_test(true).try_init();

    for second in [[0x01_u8, 0x01, 0x62], [0x02, 0x01, 0x62]] {
        let mut state = ConnState::<Client>::new();
        let mut record = Record::default();

        feed(&mut state, &mut record, &[0x01, 0x01, 0x61]);
        assert_eq!(record.closed, None);

        feed(&mut state, &mut record, &second);
        assert_eq!(record.closed, Some(ERR_PROTOCOL));
        assert_eq!(record.fragments.len(), 1);
    }
}
