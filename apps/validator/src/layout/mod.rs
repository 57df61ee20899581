// Report layout and PDF output.
// Layout is a pure function over static Helvetica metrics; writing the PDF is
// CPU-bound and runs inside tokio::task::spawn_blocking.

pub mod font_metrics;
pub mod renderer;

pub use renderer::ReportRenderer;
