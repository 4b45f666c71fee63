//! Flow field viewer.
//!
//! Usage: `flowfield [seed] [num_lines] [num_line_points]`
//!
//! Set `RUST_LOG=flowfield=debug` for per-interval frame timings.

use flowfield::FlowFieldApp;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let mut app = FlowFieldApp::new();
    if let Some(seed) = args.next() {
        app = app.with_seed(seed);
    }
    if let Some(num_lines) = args.next() {
        match num_lines.parse() {
            Ok(n) => app = app.with_num_lines(n),
            Err(_) => tracing::warn!(%num_lines, "ignoring invalid line count"),
        }
    }
    if let Some(points) = args.next() {
        match points.parse() {
            Ok(n) => app = app.with_num_line_points(n),
            Err(_) => tracing::warn!(%points, "ignoring invalid point count"),
        }
    }

    if let Err(error) = app.run() {
        tracing::error!(%error, "flowfield exited with an error");
        std::process::exit(1);
    }
}
