use super::card::format_card_line;
use crate::canvas::{organize, AppState};

/// Print one section per card type, in type order
pub fn run_organize(state: &AppState) {
    print!("{}", render_organized(state));
}

pub fn render_organized(state: &AppState) -> String {
    let mut out = String::new();
    for column in organize(&state.cards) {
        out.push_str(&format!("{} ({})\n", column.heading(), column.cards.len()));
        for card in &column.cards {
            out.push_str("  ");
            out.push_str(&format_card_line(card));
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
