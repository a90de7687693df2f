use striptools::error::{DemuxError, FrameError};
use striptools::frame::{FrameScanner, StreamBuilder};
use striptools::{Variant, LADDER_FIRMWARE};

mod common;

const FW: u64 = 0x0000_0001_2020_0101;

/// Two boards per trigger: the gap after a board depends on its position
#[test]
fn two_boards_two_triggers() {
    let a = common::block(Variant::Standard, |ch| ch as u32);
    let b = common::block(Variant::Standard, |ch| 5000 + ch as u32);
    let stream = StreamBuilder::new(&[1, 2, 3])
        .board(FW, 0, 1, 10, &a, false)
        .board(FW, 1, 1, 10, &b, true)
        .board(FW, 0, 2, 20, &b, false)
        .board(FW, 1, 2, 20, &a, true)
        .finish();

    let frames = FrameScanner::new(&stream, 2)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(4, frames.len());
    let lasts = frames.iter().map(|f| f.last_of_trigger).collect::<Vec<_>>();
    assert_eq!(vec![false, true, false, true], lasts);

    let events = FrameScanner::new(&stream, 2)
        .unwrap()
        .events()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(2, events.len());
    assert_eq!((1, 10), (events[0].trigger_id, events[0].timestamp));
    assert_eq!((2, 20), (events[1].trigger_id, events[1].timestamp));

    let side0 = events[0].side(0, 0).unwrap();
    assert_eq!(640, side0.len());
    assert_eq!((0..640).collect::<Vec<u32>>(), side0);
    let side1 = events[0].side(1, 1).unwrap();
    assert_eq!((5640..6280).collect::<Vec<u32>>(), side1);
    assert_eq!(Some(5000), events[1].side(0, 0).map(|s| s[0]));
    assert_eq!(None, events[1].side(7, 0));
}

#[test]
fn ladder_padding_and_board_id() {
    let a = common::block(Variant::Ladder, |ch| 100 + ch as u32);
    let stream = StreamBuilder::new(&[])
        .board(LADDER_FIRMWARE, 301, 5, 0, &a, true)
        .board(LADDER_FIRMWARE, 301, 6, 0, &a, true)
        .finish();

    let events = FrameScanner::new(&stream, 1)
        .unwrap()
        .events()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(2, events.len());
    for ev in events.iter() {
        let sides = &ev.boards[&1].sides;
        assert_eq!(192, sides[0].len());
        assert_eq!(100, sides[0][0]);
        assert_eq!(292, sides[1][0]);
    }
}

#[test]
fn garbage_tail_ends_cleanly() {
    let a = common::block(Variant::Standard, |_| 7);
    let stream = StreamBuilder::new(&[])
        .board(FW, 0, 1, 0, &a, true)
        .raw(&[0xff; 100])
        .finish();

    let mut events = FrameScanner::new(&stream, 1).unwrap().events();
    assert!(matches!(events.next(), Some(Ok(_))));
    assert!(events.next().is_none());
}

#[test]
fn truncated_last_board() {
    let a = common::block(Variant::Standard, |_| 7);
    let mut stream = StreamBuilder::new(&[])
        .board(FW, 0, 1, 0, &a, true)
        .board(FW, 0, 2, 0, &a, true)
        .finish();
    stream.truncate(stream.len() - 100);

    let mut events = FrameScanner::new(&stream, 1).unwrap().events();
    assert!(matches!(events.next(), Some(Ok(_))));
    assert!(matches!(
        events.next(),
        Some(Err(FrameError::TruncatedPayload { .. }))
    ));
    assert!(events.next().is_none());
}

/// A block of the wrong size spoils its trigger but not the next one
#[test]
fn demux_error_spoils_one_trigger() {
    let good = common::block(Variant::Standard, |ch| ch as u32);
    let stream = StreamBuilder::new(&[])
        .board(FW, 0, 1, 0, &good, false)
        .board(FW, 1, 1, 0, &[1, 2, 3], true)
        .board(FW, 0, 2, 0, &good, false)
        .board(FW, 1, 2, 0, &good, true)
        .finish();

    let events = FrameScanner::new(&stream, 2).unwrap().events().collect::<Vec<_>>();
    assert_eq!(2, events.len());
    assert_eq!(
        Err(FrameError::Demux {
            board: 1,
            trigger: 1,
            source: DemuxError::Length {
                expected: 1280,
                actual: 3
            },
        }),
        events[0]
    );
    let ev = events[1].as_ref().unwrap();
    assert_eq!(2, ev.trigger_id);
    assert_eq!(2, ev.boards.len());
}

/// A run cut short inside a trigger still hands out the boards it got
#[test]
fn partial_trigger_at_end() {
    let a = common::block(Variant::Standard, |_| 1);
    let stream = StreamBuilder::new(&[])
        .board(FW, 0, 9, 0, &a, false)
        .finish();

    let events = FrameScanner::new(&stream, 2)
        .unwrap()
        .events()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(1, events.len());
    assert_eq!(vec![0], events[0].boards.keys().copied().collect::<Vec<_>>());
}
