//! Payline evaluation

use super::{EvalContext, Evaluation, MultiplierCombine, WinKind, WinRecord};
use crate::board::{Board, Position};
use crate::paytable::Payline;
use crate::symbols::{Symbol, SymbolId, SymbolKind};

pub fn evaluate(
    board: &Board,
    ctx: &EvalContext<'_>,
    paylines: &[Payline],
    combine: MultiplierCombine,
) -> Evaluation {
    let wins = paylines
        .iter()
        .filter_map(|line| evaluate_line(board, ctx, line, combine))
        .collect();
    Evaluation::from_wins(wins)
}

fn evaluate_line(
    board: &Board,
    ctx: &EvalContext<'_>,
    payline: &Payline,
    combine: MultiplierCombine,
) -> Option<WinRecord> {
    // Cells on this line, left to right
    let cells: Vec<(Position, Symbol)> = payline
        .rows
        .iter()
        .enumerate()
        .map(|(reel, &row)| {
            let pos = Position::new(reel, row);
            board.get(pos).map(|s| (pos, *s))
        })
        .collect::<Option<_>>()?;
    if cells.is_empty() {
        return None;
    }

    let is_wild = |s: &Symbol| ctx.symbols.is_wild(s.id);

    // Substituted run: first non-wild symbol, wilds stand in for it
    let substituted = cells.iter().find(|(_, s)| !is_wild(s)).and_then(|(_, first)| {
        let line_symbol = first.id;
        let substitutable = ctx.symbols.kind(line_symbol) == SymbolKind::Regular;
        let run = cells
            .iter()
            .take_while(|(_, s)| s.id == line_symbol || (substitutable && is_wild(s)))
            .count();
        line_candidate(ctx, &cells, line_symbol, run, combine)
    });

    // Leading wilds paying as themselves
    let wild_run = cells.iter().take_while(|(_, s)| is_wild(s)).count();
    let wild_only = (wild_run > 0)
        .then(|| line_candidate(ctx, &cells, cells[0].1.id, wild_run, combine))
        .flatten();

    let (symbol, run, base_pay, multiplier) = match (substituted, wild_only) {
        (Some(a), Some(b)) => {
            if b.2 * b.3 > a.2 * a.3 {
                b
            } else {
                a
            }
        }
        (a, b) => a.or(b)?,
    };

    let amount = (base_pay * multiplier).min(ctx.wincap);
    Some(WinRecord {
        symbol,
        kind: WinKind::Line { index: payline.index },
        count: run as u32,
        positions: cells[..run].iter().map(|(p, _)| *p).collect(),
        base_pay,
        multiplier,
        amount,
    })
}

/// (symbol, run length, base pay, multiplier) for a paying run
fn line_candidate(
    ctx: &EvalContext<'_>,
    cells: &[(Position, Symbol)],
    symbol: SymbolId,
    run: usize,
    combine: MultiplierCombine,
) -> Option<(SymbolId, usize, f64, f64)> {
    let pay = ctx.paytable.pay(symbol, run as u32)?;
    if pay <= 0.0 {
        return None;
    }
    // One cell per reel on a line, so each reel contributes at most once
    let tags = cells[..run]
        .iter()
        .filter(|(_, s)| ctx.symbols.is_wild(s.id))
        .filter_map(|(_, s)| s.multiplier);
    let multiplier = combine.combine(tags);
    Some((symbol, run, pay * ctx.global_multiplier, multiplier))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::multiplier::MultiplierGrid;
    use crate::paytable::{PayEntry, Paytable};
    use crate::symbols::SymbolTable;

    fn paytable(t: &SymbolTable) -> Paytable {
        fixtures::paytable(
            t,
            &[
                PayEntry::exact("H1", 3, 5.0),
                PayEntry::exact("H1", 4, 10.0),
                PayEntry::exact("H1", 5, 25.0),
                PayEntry::exact("L1", 3, 1.0),
                PayEntry::exact("W", 3, 50.0),
            ],
        )
    }

    fn middle() -> Vec<Payline> {
        vec![Payline::straight(0, 1, 5)]
    }

    #[test]
    fn test_run_from_left_with_wild() {
        let t = fixtures::symbols();
        let pt = paytable(&t);
        let grid = MultiplierGrid::inert(&[3; 5]);
        let board = Board::from_names(
            &t,
            &[
                &["L2", "H1", "L2"],
                &["L2", "W", "L2"],
                &["L2", "H1", "L2"],
                &["L2", "H1", "L2"],
                &["L2", "L1", "L2"],
            ],
        )
        .unwrap();
        let eval = evaluate(&board, &fixtures::ctx(&t, &pt, &grid), &middle(), MultiplierCombine::MaxOf);
        assert_eq!(eval.wins.len(), 1);
        assert_eq!(eval.wins[0].count, 4);
        assert!((eval.total_win - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_break_on_first_reel_pays_nothing() {
        let t = fixtures::symbols();
        let pt = paytable(&t);
        let grid = MultiplierGrid::inert(&[3; 5]);
        let board = Board::from_names(
            &t,
            &[
                &["L2", "L1", "L2"],
                &["L2", "H1", "L2"],
                &["L2", "H1", "L2"],
                &["L2", "H1", "L2"],
                &["L2", "H1", "L2"],
            ],
        )
        .unwrap();
        let eval = evaluate(&board, &fixtures::ctx(&t, &pt, &grid), &middle(), MultiplierCombine::MaxOf);
        assert!(!eval.is_win());
    }

    #[test]
    fn test_wild_multipliers_combine_per_mode() {
        let t = fixtures::symbols();
        let pt = paytable(&t);
        let grid = MultiplierGrid::inert(&[1; 5]);
        let h1 = Symbol::new(t.id("H1").unwrap());
        let w = t.id("W").unwrap();
        let mut board = Board::from_names(&t, &[&["H1"], &["W"], &["W"], &["L2"], &["L2"]]).unwrap();
        board.set(Position::new(0, 0), h1).unwrap();
        board.set(Position::new(1, 0), Symbol::new(w).with_multiplier(3)).unwrap();
        board.set(Position::new(2, 0), Symbol::new(w).with_multiplier(4)).unwrap();
        let lines = vec![Payline::straight(0, 0, 5)];
        let ctx = fixtures::ctx(&t, &pt, &grid);

        let max_of = evaluate(&board, &ctx, &lines, MultiplierCombine::MaxOf);
        assert!((max_of.total_win - 20.0).abs() < 1e-12);
        let additive = evaluate(&board, &ctx, &lines, MultiplierCombine::Additive);
        assert!((additive.total_win - 35.0).abs() < 1e-12);
        let product = evaluate(&board, &ctx, &lines, MultiplierCombine::Multiplicative);
        assert!((product.total_win - 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_leading_wilds_pay_as_wild_when_better() {
        let t = fixtures::symbols();
        let pt = paytable(&t);
        let grid = MultiplierGrid::inert(&[1; 5]);
        let board = Board::from_names(&t, &[&["W"], &["W"], &["W"], &["L1"], &["L2"]]).unwrap();
        let lines = vec![Payline::straight(0, 0, 5)];
        let eval = evaluate(&board, &fixtures::ctx(&t, &pt, &grid), &lines, MultiplierCombine::MaxOf);
        // W×3 pays 50, beating L1×4 at the top L1 bucket
        assert_eq!(eval.wins[0].symbol, t.id("W").unwrap());
        assert!((eval.total_win - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_line_clamped_to_wincap() {
        let t = fixtures::symbols();
        let pt = paytable(&t);
        let grid = MultiplierGrid::inert(&[1; 5]);
        let w = t.id("W").unwrap();
        let mut board = Board::from_names(&t, &[&["H1"], &["H1"], &["H1"], &["H1"], &["H1"]]).unwrap();
        board.set(Position::new(4, 0), Symbol::new(w).with_multiplier(1000)).unwrap();
        let lines = vec![Payline::straight(0, 0, 5)];
        let mut ctx = fixtures::ctx(&t, &pt, &grid);
        ctx.wincap = 5000.0;
        let eval = evaluate(&board, &ctx, &lines, MultiplierCombine::MaxOf);
        assert!((eval.total_win - 5000.0).abs() < 1e-12);
    }
}
