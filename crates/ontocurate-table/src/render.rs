//! HTML rendering of a [`TableDiff`].

use crate::diff::{DiffAction, TableDiff};

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn row_class(action: DiffAction) -> &'static str {
    match action {
        DiffAction::Skip => "skip",
        DiffAction::Insert => "add",
        DiffAction::Delete => "remove",
        DiffAction::Modify => "modify",
        DiffAction::Conflict => "conflict",
    }
}

pub fn render_html(diff: &TableDiff) -> String {
    let mut out = String::new();
    out.push_str("<table class=\"ontocurate-diff\">\n");
    out.push_str("<thead>\n<tr class=\"header\"><th>@@</th>");
    for col in &diff.header {
        out.push_str("<th>");
        out.push_str(&html_escape(col));
        out.push_str("</th>");
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in &diff.rows {
        out.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td>",
            row_class(row.action),
            html_escape(row.action.symbol())
        ));
        for cell in &row.cells {
            let changed = row.action == DiffAction::Modify && cell.contains("->");
            if changed {
                out.push_str("<td class=\"modify\">");
            } else {
                out.push_str("<td>");
            }
            out.push_str(&html_escape(cell));
            out.push_str("</td>");
        }
        out.push_str("</tr>\n");
    }

    out.push_str("</tbody>\n</table>\n");
    out
}
