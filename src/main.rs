//! CSR entry point: mounts the app to the document body.

use leptos::prelude::*;
use scenario_graph_canvas::{App, init_logging};

fn main() {
	init_logging();
	mount_to_body(App);
}
