//! 局面・指し手コーデック、合法手インデックス、棋譜台帳の性質テスト

use std::time::Duration;

use proptest::prelude::*;

use rshogi_session::ledger::{MoveDraft, MoveLedger};
use rshogi_session::notation::{UsiMove, decode, encode};
use rshogi_session::position::{Board, Sfen};
use rshogi_session::types::{BOARD_SIZE, Color, Hand, Hands, Piece, PieceType, Square};
use rshogi_session::{LegalityIndex, ManualTimeSource, SessionClock};

#[derive(Debug, Clone)]
enum ClockStep {
    Start,
    Stop,
    Advance(u64),
}

fn arb_clock_step() -> impl Strategy<Value = ClockStep> {
    prop_oneof![
        Just(ClockStep::Start),
        Just(ClockStep::Stop),
        (0u64..10_000).prop_map(ClockStep::Advance),
    ]
}

fn arb_color() -> impl Strategy<Value = Color> {
    prop_oneof![Just(Color::Black), Just(Color::White)]
}

fn arb_square() -> impl Strategy<Value = Square> {
    (0..BOARD_SIZE, 0..BOARD_SIZE).prop_map(|(row, col)| Square::new(row, col).unwrap())
}

fn arb_piece() -> impl Strategy<Value = Piece> {
    (arb_color(), prop::sample::select(PieceType::ALL.to_vec()), any::<bool>()).prop_map(
        |(color, pt, promoted)| {
            if promoted {
                Piece::promoted(color, pt).unwrap_or(Piece::new(color, pt))
            } else {
                Piece::new(color, pt)
            }
        },
    )
}

fn arb_board() -> impl Strategy<Value = Board> {
    prop::collection::vec(prop::option::weighted(0.4, arb_piece()), BOARD_SIZE * BOARD_SIZE)
        .prop_map(|cells| {
            Square::all()
                .zip(cells)
                .fold(Board::empty(), |board, (sq, piece)| board.with_piece(sq, piece))
        })
}

fn arb_hand() -> impl Strategy<Value = Hand> {
    prop::collection::vec(0u32..20, PieceType::HAND_PIECES.len()).prop_map(|counts| {
        PieceType::HAND_PIECES
            .iter()
            .zip(counts)
            .fold(Hand::default(), |hand, (&pt, n)| hand.with_added(pt, n))
    })
}

fn arb_sfen() -> impl Strategy<Value = Sfen> {
    (arb_board(), arb_color(), arb_hand(), arb_hand(), 1u32..500).prop_map(
        |(board, side_to_move, sente, gote, ply)| Sfen {
            board,
            side_to_move,
            hands: Hands { sente, gote },
            ply,
        },
    )
}

fn draft(i: usize) -> MoveDraft {
    MoveDraft {
        side: if i % 2 == 0 { Color::Black } else { Color::White },
        notation: format!("m{i}"),
        label: None,
        resulting_position: format!("p{i}"),
    }
}

proptest! {
    #[test]
    fn prop_board_roundtrip(board in arb_board()) {
        let text = board.to_sfen();
        let parsed = Board::parse(&text).unwrap();
        prop_assert_eq!(&parsed, &board);
        prop_assert_eq!(parsed.to_sfen(), text);
    }

    #[test]
    fn prop_sfen_roundtrip(sfen in arb_sfen()) {
        let parsed = Sfen::parse(&sfen.to_sfen()).unwrap();
        prop_assert_eq!(parsed, sfen);
    }

    #[test]
    fn prop_move_codec_symmetry(from in arb_square(), to in arb_square(), promote in any::<bool>()) {
        let decoded = decode(&encode(from, to, promote)).unwrap();
        prop_assert_eq!(decoded, UsiMove::Normal { from, to, promote });
    }

    #[test]
    fn prop_legality_completeness(
        moves in prop::collection::vec((arb_square(), arb_square(), any::<bool>()), 0..60)
    ) {
        let legal: Vec<String> = moves
            .iter()
            .map(|&(from, to, promote)| encode(from, to, promote))
            .collect();
        let index = LegalityIndex::build(&legal);
        for notation in &legal {
            let mv = decode(notation).unwrap();
            prop_assert!(index.contains(&mv));
            if let Some(from) = mv.from() {
                prop_assert!(index.moves_from(from).contains(&mv.to()));
            }
        }
    }

    #[test]
    fn prop_ledger_truncation((k, j) in (2usize..30).prop_flat_map(|k| (Just(k), 0..k - 1))) {
        let mut ledger = MoveLedger::new();
        for i in 0..k {
            ledger.append(draft(i), i as u64 * 100);
        }
        let before = ledger.records()[..=j].to_vec();

        ledger.truncate_after(j).unwrap();
        prop_assert_eq!(ledger.len(), j + 1);
        prop_assert_eq!(ledger.records(), before.as_slice());
    }

    #[test]
    fn prop_clock_monotonic(steps in prop::collection::vec(arb_clock_step(), 0..80)) {
        let time = ManualTimeSource::new();
        let mut clock = SessionClock::with_time_source(time.clone());
        let mut last = clock.elapsed();
        let mut expected = Duration::ZERO;

        for step in steps {
            let running = clock.is_running();
            match step {
                ClockStep::Start => clock.start(),
                ClockStep::Stop => clock.stop(),
                ClockStep::Advance(ms) => {
                    time.advance(ms);
                    if running {
                        expected += Duration::from_millis(ms);
                    }
                }
            }
            let now = clock.elapsed();
            prop_assert!(now >= last, "elapsed went back: {:?} -> {:?}", last, now);
            prop_assert_eq!(now, expected);
            last = now;
        }
    }
}
