//! Ways-to-win evaluation
//!
//! Every row on every reel is a valid position. A symbol pays for the number
//! of consecutive reels from the left holding it (or a wild). Wild
//! multipliers compound: each reel contributes the sum of its matching
//! cells' multipliers, and the reel contributions multiply.

use super::{EvalContext, Evaluation, WinKind, WinRecord};
use crate::board::{Board, Position};

pub fn evaluate(board: &Board, ctx: &EvalContext<'_>) -> Evaluation {
    let mut wins = Vec::new();

    for symbol in ctx.paytable.regular_symbols(ctx.symbols) {
        let mut positions: Vec<Position> = Vec::new();
        let mut ways: u64 = 1;
        let mut weighted = 1.0;
        let mut reels_matched = 0u32;
        let mut has_symbol = false;

        for reel in 0..board.num_reels() {
            let mut count = 0u64;
            let mut weight = 0.0;
            for (row, cell) in board.reel(reel).iter().enumerate() {
                let wild = ctx.symbols.is_wild(cell.id);
                if cell.id == symbol || wild {
                    count += 1;
                    weight += f64::from(if wild { cell.multiplier.unwrap_or(1) } else { 1 });
                    has_symbol |= !wild;
                    positions.push(Position::new(reel, row));
                }
            }
            if count == 0 {
                break;
            }
            reels_matched += 1;
            ways = ways.saturating_mul(count);
            weighted *= weight;
        }

        if !has_symbol {
            continue;
        }
        let Some(pay) = ctx.paytable.pay(symbol, reels_matched) else {
            continue;
        };

        let base_pay = pay * ctx.global_multiplier;
        let multiplier = weighted / ways as f64;
        wins.push(WinRecord {
            symbol,
            kind: WinKind::Ways { ways },
            count: reels_matched,
            positions,
            base_pay,
            multiplier,
            amount: base_pay * weighted,
        });
    }

    Evaluation::from_wins(wins)
}
