use crate::engine::Evaluation;
use crate::output::ArtifactRenderer;

const RULE_WIDTH: usize = 50;
const COLUMN_GAP: &str = "  ";

/// Plain-text strategy report: header block followed by the sampled table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReport;

impl ArtifactRenderer for TextReport {
    fn name(&self) -> &'static str {
        "report"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, strategy: &str, evaluation: &Evaluation) -> String {
        let rule = "-".repeat(RULE_WIDTH);
        let mut out = String::new();

        out.push_str(&format!("{rule}\n FINAL STRATEGY DATA {strategy} \n{rule}\n"));
        out.push_str(&format!(
            "You built a strategy with {} legs\n",
            evaluation.leg_count()
        ));
        out.push_str(&format!(
            "The cost of setting up the strategy was {}\n",
            format_decimal(evaluation.cost)
        ));
        out.push_str(&format!("{rule}\n VALUE TABLE FOR STRATEGY {strategy}\n"));
        out.push_str(&render_table(evaluation));
        out
    }
}

fn render_table(evaluation: &Evaluation) -> String {
    let headers = ["St", "Payoff", "Result", "Return"];
    let cells: Vec<[String; 4]> = evaluation
        .table
        .rows
        .iter()
        .map(|r| {
            [
                format_decimal(r.price),
                format_decimal(r.payoff),
                format_decimal(r.result),
                format!("{}%", format_decimal(r.return_pct)),
            ]
        })
        .collect();

    let index_width = cells.len().saturating_sub(1).to_string().len();
    let mut widths = headers.map(str::len);
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    out.push_str(&" ".repeat(index_width));
    for (h, w) in headers.iter().zip(widths) {
        out.push_str(&format!("{COLUMN_GAP}{h:>w$}"));
    }
    out.push('\n');

    for (i, row) in cells.iter().enumerate() {
        out.push_str(&format!("{i:<index_width$}"));
        for (cell, w) in row.iter().zip(widths) {
            out.push_str(&format!("{COLUMN_GAP}{cell:>w$}"));
        }
        out.push('\n');
    }
    out
}

/// Round to 2 decimals and print in shortest form, keeping one decimal
/// on integral values: 5 -> "5.0", 3.14159 -> "3.14", -100 -> "-100.0".
pub fn format_decimal(value: f64) -> String {
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".into() } else { "-inf".into() };
    }

    // + 0.0 folds -0.0 into 0.0
    let rounded = (value * 100.0).round() / 100.0 + 0.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.1}")
    } else {
        format!("{rounded}")
    }
}
