use crate::config::version_slug;
use crate::model::{MemoryTable, TimingTable, VersionReport};

// Headers are templates with `@..@` placeholders: LaTeX is full of `{}` that
// would fight with `format!()`.
const TIMING_HEADER: &str = r"\begin{table}[h]
\centering
\caption{CUDA execution time analysis - @VERSION@}
\label{tab:cuda_timing_@SLUG@}
\begin{tabular}{|r|r|r|r|r|l|l|}
\hline
\textbf{\% Time} & \textbf{Mean Time (ms)} & \textbf{$\sigma$ Time} & \textbf{Mean Instances} & \textbf{$\sigma$ Instances} & \textbf{Category} & \textbf{Operation} \\
\hline
";

const MEMORY_HEADER: &str = r"\begin{table}[h]
\centering
\caption{Memory transfer analysis - @VERSION@}
\label{tab:memory_ops_@SLUG@}
\begin{tabular}{|r|r|r|r|l|}
\hline
\textbf{Mean Bytes (MiB)} & \textbf{$\sigma$ Bytes} & \textbf{Mean Count} & \textbf{$\sigma$ Count} & \textbf{Direction} \\
\hline
";

const TABLE_FOOTER: &str = "\\end{tabular}\n\\end{table}\n";
const ROW_END: &str = " \\\\\n\\hline\n";

/// Escape characters that are special in LaTeX text mode.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str(r"\textbackslash{}"),
            '_' | '%' | '&' | '#' | '$' | '{' | '}' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Fixed-point with `,` thousands separators, e.g. `12,345.679`.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let digits = format!("{:.*}", decimals, value.abs());
    let (int, frac) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits.as_str(), None),
    };

    let mut out = String::with_capacity(digits.len() + int.len() / 3 + 1);
    if value < 0.0 && digits.bytes().any(|b| (b'1'..=b'9').contains(&b)) {
        out.push('-');
    }
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(f) = frac {
        out.push('.');
        out.push_str(f);
    }
    out
}

fn header(template: &str, version: &str) -> String {
    template
        .replace("@VERSION@", &escape_latex(version))
        .replace("@SLUG@", &version_slug(version))
}

pub fn render_timing_table(version: &str, table: &TimingTable) -> String {
    let mut out = header(TIMING_HEADER, version);

    for row in &table.rows {
        out.push_str(&format!(
            r"{:.1} \% & {} & {} & {} & {} & {} & {}",
            row.percentage,
            group_thousands(row.time_mean, 3),
            group_thousands(row.time_std, 3),
            group_thousands(row.instances_mean, 1),
            group_thousands(row.instances_std, 1),
            escape_latex(row.category.label()),
            escape_latex(&row.operation),
        ));
        out.push_str(ROW_END);
    }

    // Totals carry summed means only.
    out.push_str(&format!(
        r" & \textbf{{{} ms}} & & \textbf{{{}}} & & &",
        group_thousands(table.total_time, 3),
        group_thousands(table.total_instances, 1),
    ));
    out.push_str(ROW_END);
    out.push_str(TABLE_FOOTER);
    out
}

pub fn render_memory_table(version: &str, table: &MemoryTable) -> String {
    let mut out = header(MEMORY_HEADER, version);

    for row in &table.rows {
        out.push_str(&format!(
            "{} & {} & {} & {} & {}",
            group_thousands(row.bytes_mean, 2),
            group_thousands(row.bytes_std, 2),
            group_thousands(row.count_mean, 1),
            group_thousands(row.count_std, 1),
            escape_latex(&row.direction),
        ));
        out.push_str(ROW_END);
    }

    out.push_str(&format!(
        r"\textbf{{{} MiB}} & & \textbf{{{}}} & &",
        group_thousands(table.total_bytes, 2),
        group_thousands(table.total_count, 1),
    ));
    out.push_str(ROW_END);
    out.push_str(TABLE_FOOTER);
    out
}

/// Full report text for one version: timing table, then memory table.
pub fn render_latex_report(report: &VersionReport) -> String {
    let mut out = String::from("% ===== CUDA TABLE =====\n");
    out.push_str(&render_timing_table(&report.version, &report.timing));
    out.push_str("\n\n% ===== MEMORY TABLE =====\n");
    out.push_str(&render_memory_table(&report.version, &report.memory));
    out
}
