//! End-to-end evaluation: incremental updates, model selection, blending.

use std::sync::Arc;

use rand::prelude::*;

use style_nnue::board::Position;
use style_nnue::eval::{combine, select_model, EvalContext, Evaluator, ModelChoice, StrategyWeights};
use style_nnue::nnue::{NetSize, Networks, OUTPUT_SCALE};
use style_nnue::options::EvalOptions;
use style_nnue::style::{FixedStyleProvider, StyleWeights};
use style_nnue::sync::SharedStrategyWeights;

/// Giuoco Piano into the Moller attack: six captures and a castle.
const GIUOCO_LINE: [&str; 20] = [
    "e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5", "c2c3", "g8f6", "d2d4", "e5d4", "c3d4",
    "c5b4", "b1c3", "f6e4", "e1g1", "e4c3", "b2c3", "b4c3", "d1b3", "d7d5",
];

fn networks() -> Networks {
    Networks::random(&mut StdRng::seed_from_u64(2024))
}

fn fresh(pos: &Position) -> Position {
    Position::from_fen(&pos.to_fen()).unwrap()
}

/// Compare the incremental result at every ply with a from-scratch one.
fn check_line(nets: &Networks, start: &str, moves: &[&str]) {
    let mut pos = Position::from_fen(start).unwrap();
    for size in [NetSize::Big, NetSize::Small] {
        assert_eq!(
            nets.evaluate(size, &mut pos, false),
            nets.evaluate(size, &mut fresh(&pos), false)
        );
    }
    for mv in moves {
        pos.play(mv).unwrap();
        for size in [NetSize::Big, NetSize::Small] {
            let incremental = nets.evaluate(size, &mut pos, false);
            let scratch = nets.evaluate(size, &mut fresh(&pos), false);
            assert_eq!(incremental, scratch, "{size} net after {mv}");
        }
    }
}

#[test]
fn incremental_matches_refresh_through_captures() {
    let nets = networks();
    check_line(
        &nets,
        style_nnue::board::STARTPOS_FEN,
        &["e2e4", "d7d5", "e4d5", "d8d5", "b1c3", "d5e5", "g1f3", "e5e7"],
    );
}

#[test]
fn incremental_matches_refresh_through_special_moves() {
    let nets = networks();
    // Castling both ways, en passant and a capturing promotion.
    check_line(
        &nets,
        "r3k2r/1P6/8/8/3p4/8/4P3/R3K2R w KQkq - 0 1",
        &["e2e4", "d4e3", "e1g1", "e8g8", "b7a8q", "f8a8"],
    );
}

#[test]
fn skipped_plies_are_replayed() {
    let nets = networks();
    let mut pos = Position::startpos();
    nets.evaluate(NetSize::Big, &mut pos, false);
    // Several plies without evaluating in between
    for mv in ["g1f3", "g8f6", "b1c3", "b8c6", "e2e4"] {
        pos.play(mv).unwrap();
    }
    assert_eq!(
        nets.evaluate(NetSize::Big, &mut pos, false),
        nets.evaluate(NetSize::Big, &mut fresh(&pos), false)
    );
}

#[test]
fn long_unevaluated_chain_is_refreshed() {
    let nets = networks();
    let mut pos = Position::startpos();
    let root = [
        nets.evaluate(NetSize::Big, &mut pos, false),
        nets.evaluate(NetSize::Small, &mut pos, false),
    ];
    // Replaying twenty plies costs more than a refresh of the final board.
    for mv in GIUOCO_LINE {
        pos.play(mv).unwrap();
    }
    for size in [NetSize::Big, NetSize::Small] {
        assert_eq!(
            nets.evaluate(size, &mut pos, false),
            nets.evaluate(size, &mut fresh(&pos), false),
            "{size} net at the end of the line"
        );
    }

    // Back into the part of the chain that was never evaluated
    for _ in 0..8 {
        pos.undo_move();
    }
    for size in [NetSize::Big, NetSize::Small] {
        assert_eq!(
            nets.evaluate(size, &mut pos, false),
            nets.evaluate(size, &mut fresh(&pos), false),
            "{size} net after undo"
        );
    }
    pos.play("d1b3").unwrap();
    assert_eq!(
        nets.evaluate(NetSize::Big, &mut pos, false),
        nets.evaluate(NetSize::Big, &mut fresh(&pos), false)
    );

    while pos.depth() > 0 {
        pos.undo_move();
    }
    assert_eq!(nets.evaluate(NetSize::Big, &mut pos, false), root[0]);
    assert_eq!(nets.evaluate(NetSize::Small, &mut pos, false), root[1]);
}

#[test]
fn undo_restores_previous_result() {
    let nets = networks();
    let mut pos = Position::startpos();
    let root = nets.evaluate(NetSize::Big, &mut pos, false);
    pos.play("e2e4").unwrap();
    nets.evaluate(NetSize::Big, &mut pos, false);
    pos.undo_move();
    assert_eq!(nets.evaluate(NetSize::Big, &mut pos, false), root);

    // A sibling is built from the root's accumulator
    pos.play("d2d4").unwrap();
    assert_eq!(
        nets.evaluate(NetSize::Big, &mut pos, false),
        nets.evaluate(NetSize::Big, &mut fresh(&pos), false)
    );
}

#[test]
fn null_move_flips_perspective_only() {
    let nets = networks();
    let mut pos = Position::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
    let before = nets.evaluate(NetSize::Small, &mut pos, false);
    pos.do_null_move();
    let after = nets.evaluate(NetSize::Small, &mut pos, false);
    assert_eq!(after.psqt, -before.psqt);
    pos.undo_null_move();
    assert_eq!(nets.evaluate(NetSize::Small, &mut pos, false), before);
}

#[test]
fn selector_thresholds() {
    let big = ModelChoice {
        size: NetSize::Big,
        psqt_only: false,
    };
    // Up a minor piece and two pawns: 781 + 416 = 1197 > 1165
    let small = Position::from_fen("4k3/8/8/8/8/8/PP6/1N2K3 w - - 0 1").unwrap();
    // Up a knight only: 781, below the threshold
    let near = Position::from_fen("4k3/8/8/8/8/8/8/1N2K3 w - - 0 1").unwrap();
    assert_eq!(select_model(&near), big);
    assert_eq!(
        select_model(&small),
        ModelChoice {
            size: NetSize::Small,
            psqt_only: false
        }
    );
}

#[test]
fn psqt_only_path_reports_zero_positional_and_complexity() {
    let ev = Evaluator::new(Arc::new(networks()));
    let mut pos = Position::from_fen("4k3/8/8/8/8/8/8/QQ2K3 b - - 0 1").unwrap();
    let eval = ev.evaluate(&mut pos, false, StrategyWeights::default());
    assert_eq!(eval.size, NetSize::Small);
    assert!(eval.psqt_only);
    assert_eq!(eval.complexity, 0);

    let net = ev.evaluate_net(NetSize::Small, &mut pos, false, true, StrategyWeights::default());
    assert_eq!(net.positional, 0);
    assert_eq!(eval.value, net.value);
}

#[test]
fn complexity_is_scaled_gap() {
    let ev = Evaluator::new(Arc::new(networks()));
    let mut pos = Position::startpos();
    let net = ev.evaluate_net(NetSize::Big, &mut pos, true, false, StrategyWeights::default());
    assert_eq!(net.complexity, (net.psqt - net.positional).abs() / OUTPUT_SCALE);
}

#[test]
fn blender_arithmetic() {
    let zero = StrategyWeights::default();
    assert_eq!(combine(100, 100, 24, true, zero), (1000 * 100 + 1048 * 100) / (1024 * 16));
    assert_eq!(combine(100, 100, 24, false, zero), 200 / 16);

    let w = StrategyWeights::new(10, 20);
    let expected = ((1024 - 24 + 10) * 3200 + (1024 + 24 + 20) * -1600) / (1024 * 16);
    assert_eq!(combine(3200, -1600, 24, true, w), expected);
}

#[test]
fn context_weights_feed_adjusted_evaluation() {
    let ev = Evaluator::new(Arc::new(networks()));
    let mut ctx = EvalContext::default();
    let mut pos = Position::startpos();
    let mut style = Default::default();
    ctx.blend_style(&pos, &mut style);

    let via_ctx = ev.evaluate_in(&mut pos, &ctx, true);
    let direct = ev.evaluate(&mut pos, true, ctx.strategy_weights());
    assert_eq!(via_ctx, direct);
}

#[test]
fn style_blend_drives_adjusted_score() {
    let ev = Evaluator::new(Arc::new(networks()));
    let mut ctx = EvalContext::default()
        .with_provider(Arc::new(FixedStyleProvider(StyleWeights::new(70, 10, 20))));
    let mut pos = Position::startpos();
    let mut moved_score = false;
    for mv in GIUOCO_LINE {
        let mut style = StyleWeights::default();
        let styled = ev.evaluate_with_style(&mut pos, &mut ctx, &mut style, true);
        let weights = ctx.strategy_weights();
        assert!((5..=30).contains(&weights.material));
        assert!((5..=30).contains(&weights.positional));
        assert_eq!(styled, ev.evaluate(&mut pos, true, weights));

        let unstyled = ev.evaluate(&mut pos, true, StrategyWeights::default());
        moved_score |= styled.value != unstyled.value;
        pos.play(mv).unwrap();
    }
    assert!(moved_score);
    assert_eq!(ctx.stats().recomputations, GIUOCO_LINE.len() as u64);
}

#[test]
fn disabled_style_blend_leaves_weights_alone() {
    let ev = Evaluator::new(Arc::new(networks()));
    let mut opts = EvalOptions::default();
    opts.style_enabled = false;
    let mut ctx = EvalContext::new(opts, SharedStrategyWeights::default());
    let mut pos = Position::startpos();
    let mut style = StyleWeights::new(1, 2, 3);
    let eval = ev.evaluate_with_style(&mut pos, &mut ctx, &mut style, true);
    assert_eq!(style, StyleWeights::new(1, 2, 3));
    assert_eq!(eval, ev.evaluate(&mut pos, true, StrategyWeights::default()));
}
