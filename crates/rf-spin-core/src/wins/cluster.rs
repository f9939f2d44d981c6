//! Cluster pays
//!
//! Connected groups (up/down/left/right) of one regular symbol, with wilds
//! joining any group. A wild may belong to clusters of several symbols in
//! the same pass, so the visited set is rebuilt per symbol.

use super::{EvalContext, Evaluation, MultiplierCombine, WinKind, WinRecord};
use crate::board::{Board, Position};
use crate::symbols::SymbolId;

pub fn evaluate(board: &Board, ctx: &EvalContext<'_>, combine: MultiplierCombine) -> Evaluation {
    let mut wins = Vec::new();

    for symbol in ctx.paytable.regular_symbols(ctx.symbols) {
        let mut visited: Vec<Vec<bool>> = (0..board.num_reels())
            .map(|reel| vec![false; board.rows(reel)])
            .collect();

        for (start, cell) in board.cells() {
            if cell.id != symbol || visited[start.reel][start.row] {
                continue;
            }
            let positions = flood_fill(board, ctx, symbol, start, &mut visited);
            let size = positions.len() as u32;
            let Some(pay) = ctx.paytable.pay(symbol, size) else {
                continue;
            };

            let base_pay = pay * ctx.global_multiplier;
            let multiplier = combine.combine_active(positions.iter().map(|p| ctx.grid.get(*p)));
            wins.push(WinRecord {
                symbol,
                kind: WinKind::Cluster,
                count: size,
                positions,
                base_pay,
                multiplier,
                amount: base_pay * multiplier,
            });
        }
    }

    Evaluation::from_wins(wins)
}

fn flood_fill(
    board: &Board,
    ctx: &EvalContext<'_>,
    symbol: SymbolId,
    start: Position,
    visited: &mut [Vec<bool>],
) -> Vec<Position> {
    let matches = |p: Position| {
        board
            .get(p)
            .is_some_and(|s| s.id == symbol || ctx.symbols.is_wild(s.id))
    };

    let mut cluster = Vec::new();
    let mut stack = vec![start];
    visited[start.reel][start.row] = true;

    while let Some(pos) = stack.pop() {
        cluster.push(pos);
        for next in neighbours(board, pos) {
            if !visited[next.reel][next.row] && matches(next) {
                visited[next.reel][next.row] = true;
                stack.push(next);
            }
        }
    }

    cluster.sort();
    cluster
}

fn neighbours(board: &Board, pos: Position) -> impl Iterator<Item = Position> + '_ {
    let Position { reel, row } = pos;
    let candidates = [
        (reel.checked_sub(1), Some(row)),
        (Some(reel + 1), Some(row)),
        (Some(reel), row.checked_sub(1)),
        (Some(reel), Some(row + 1)),
    ];
    candidates.into_iter().filter_map(move |(r, w)| {
        let (r, w) = (r?, w?);
        (r < board.num_reels() && w < board.rows(r)).then_some(Position::new(r, w))
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::multiplier::MultiplierGrid;
    use crate::paytable::PayEntry;

    fn h1_paytable(t: &crate::symbols::SymbolTable) -> crate::paytable::Paytable {
        fixtures::paytable(
            t,
            &[
                PayEntry::range("H1", 5, 5, 20.0),
                PayEntry::range("H1", 6, 8, 40.0),
                PayEntry::range("H1", 9, 12, 100.0),
                PayEntry::range("H1", 13, 49, 500.0),
                PayEntry::range("L1", 4, 4, 1.0),
            ],
        )
    }

    #[test]
    fn test_five_cluster_pays_first_bucket() {
        let t = fixtures::symbols();
        let pt = h1_paytable(&t);
        let board = Board::from_names(
            &t,
            &[
                &["H1", "H1", "L2"],
                &["H1", "H1", "L2"],
                &["H1", "L2", "H2"],
            ],
        )
        .unwrap();
        let grid = MultiplierGrid::new(&[3, 3, 3], 64);
        let eval = evaluate(&board, &fixtures::ctx(&t, &pt, &grid), MultiplierCombine::MaxOf);

        assert_eq!(eval.wins.len(), 1);
        assert_eq!(eval.wins[0].count, 5);
        assert!((eval.total_win - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_four_cluster_pays_nothing() {
        let t = fixtures::symbols();
        let pt = h1_paytable(&t);
        let board = Board::from_names(
            &t,
            &[
                &["H1", "H1", "L2"],
                &["H1", "L2", "H2"],
                &["H1", "L2", "H2"],
            ],
        )
        .unwrap();
        let grid = MultiplierGrid::new(&[3, 3, 3], 64);
        let eval = evaluate(&board, &fixtures::ctx(&t, &pt, &grid), MultiplierCombine::MaxOf);
        assert!(!eval.is_win());
    }

    #[test]
    fn test_diagonal_is_not_connected() {
        let t = fixtures::symbols();
        let pt = h1_paytable(&t);
        let board = Board::from_names(
            &t,
            &[
                &["H1", "L2", "H1"],
                &["L2", "H1", "L2"],
                &["H1", "L2", "H1"],
            ],
        )
        .unwrap();
        let grid = MultiplierGrid::new(&[3, 3, 3], 64);
        let eval = evaluate(&board, &fixtures::ctx(&t, &pt, &grid), MultiplierCombine::MaxOf);
        assert!(!eval.is_win());
    }

    #[test]
    fn test_wild_joins_clusters_of_two_symbols() {
        let t = fixtures::symbols();
        let pt = h1_paytable(&t);
        // W at (1,1) bridges an H1 group above and an L1 group below
        let board = Board::from_names(
            &t,
            &[
                &["H1", "H2", "L1"],
                &["H1", "W", "L1"],
                &["H1", "H1", "L1"],
            ],
        )
        .unwrap();
        let grid = MultiplierGrid::new(&[3, 3, 3], 64);
        let eval = evaluate(&board, &fixtures::ctx(&t, &pt, &grid), MultiplierCombine::MaxOf);

        let h1 = t.id("H1").unwrap();
        let l1 = t.id("L1").unwrap();
        let h1_win = eval.wins.iter().find(|w| w.symbol == h1).unwrap();
        let l1_win = eval.wins.iter().find(|w| w.symbol == l1).unwrap();
        assert_eq!(h1_win.count, 5);
        assert!(l1_win.positions.contains(&Position::new(1, 1)));
        assert!(h1_win.positions.contains(&Position::new(1, 1)));
    }

    #[test]
    fn test_grid_multiplier_max_of_cells() {
        let t = fixtures::symbols();
        let pt = h1_paytable(&t);
        let board = Board::from_names(
            &t,
            &[
                &["H1", "H1", "L2"],
                &["H1", "H1", "L2"],
                &["H1", "L2", "H2"],
            ],
        )
        .unwrap();
        let mut grid = MultiplierGrid::new(&[3, 3, 3], 64);
        grid.boost(&[Position::new(0, 0), Position::new(0, 1)]);
        grid.boost(&[Position::new(0, 0)]);

        let ctx = fixtures::ctx(&t, &pt, &grid);
        let max_of = evaluate(&board, &ctx, MultiplierCombine::MaxOf);
        assert!((max_of.total_win - 80.0).abs() < 1e-12);

        let additive = evaluate(&board, &ctx, MultiplierCombine::Additive);
        assert!((additive.total_win - 120.0).abs() < 1e-12);

        let product = evaluate(&board, &ctx, MultiplierCombine::Multiplicative);
        assert!((product.total_win - 160.0).abs() < 1e-12);
    }

    #[test]
    fn test_ragged_board() {
        let t = fixtures::symbols();
        let pt = h1_paytable(&t);
        let board = Board::from_names(&t, &[&["H1", "H1", "H1"], &["H1", "H1"]]).unwrap();
        let grid = MultiplierGrid::new(&[3, 2], 64);
        let eval = evaluate(&board, &fixtures::ctx(&t, &pt, &grid), MultiplierCombine::MaxOf);
        assert_eq!(eval.wins[0].count, 5);
    }
}
