//! Scatter pays: total count of a symbol anywhere on the board

use super::{EvalContext, Evaluation, MultiplierCombine, WinKind, WinRecord};
use crate::board::Board;

pub fn evaluate(board: &Board, ctx: &EvalContext<'_>, combine: MultiplierCombine) -> Evaluation {
    let wilds: Vec<_> = board
        .cells()
        .filter(|(_, s)| ctx.symbols.is_wild(s.id))
        .map(|(p, _)| p)
        .collect();

    let mut wins = Vec::new();
    for symbol in ctx.paytable.regular_symbols(ctx.symbols) {
        let mut positions = board.positions_of(symbol);
        if positions.is_empty() {
            continue;
        }
        positions.extend(wilds.iter().copied());
        positions.sort();

        let count = positions.len() as u32;
        let Some(pay) = ctx.paytable.pay(symbol, count) else {
            continue;
        };

        let base_pay = pay * ctx.global_multiplier;
        let multiplier = combine.combine_active(positions.iter().map(|p| ctx.grid.get(*p)));
        wins.push(WinRecord {
            symbol,
            kind: WinKind::Scatter,
            count,
            positions,
            base_pay,
            multiplier,
            amount: base_pay * multiplier,
        });
    }

    Evaluation::from_wins(wins)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::board::Position;
    use crate::multiplier::MultiplierGrid;
    use crate::paytable::PayEntry;

    #[test]
    fn test_count_anywhere() {
        let t = fixtures::symbols();
        let pt = fixtures::paytable(
            &t,
            &[PayEntry::range("L1", 8, 9, 1.0), PayEntry::range("L1", 10, 11, 2.0)],
        );
        let grid = MultiplierGrid::new(&[3; 4], 64);
        let board = Board::from_names(
            &t,
            &[
                &["L1", "H1", "L1"],
                &["H2", "L1", "L1"],
                &["L1", "L2", "W"],
                &["L1", "H1", "L1"],
            ],
        )
        .unwrap();

        let eval = evaluate(&board, &fixtures::ctx(&t, &pt, &grid), MultiplierCombine::Additive);
        assert_eq!(eval.wins.len(), 1);
        // 7 L1 + 1 wild
        assert_eq!(eval.wins[0].count, 8);
        assert!((eval.total_win - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sticky_grid_sum() {
        let t = fixtures::symbols();
        let pt = fixtures::paytable(&t, &[PayEntry::range("H1", 3, 5, 2.0)]);
        let mut grid = MultiplierGrid::new(&[2, 2], 64);
        grid.boost(&[Position::new(0, 0), Position::new(1, 1)]);
        grid.boost(&[Position::new(1, 1)]);
        let board = Board::from_names(&t, &[&["H1", "L1"], &["H1", "H1"]]).unwrap();

        let eval = evaluate(&board, &fixtures::ctx(&t, &pt, &grid), MultiplierCombine::Additive);
        // active cells 2 + 4
        assert!((eval.total_win - 12.0).abs() < 1e-12);
    }
}
