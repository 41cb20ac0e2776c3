//! Report rendering.

pub mod latex;

pub use latex::render_latex_report;
