use std::rc::Rc;

use leptos::prelude::*;
use log::info;

use crate::components::scenario_editor::{LocalStore, ScenarioEditor, ScenarioStore, Severity};

/// Scenario editor page: wires the editor to its collaborators (persistence
/// store and notification sink) and shows the latest notification.
#[component]
pub fn Home() -> impl IntoView {
	let store: Rc<dyn ScenarioStore> = Rc::new(LocalStore);
	let notification = RwSignal::new(None::<(String, Severity)>);

	let on_notify = move |(message, severity): (String, Severity)| {
		info!("[{}] {}", severity.as_str(), message);
		notification.set(Some((message, severity)));
	};

	view! {
		<div class="editor-page">
			<ScenarioEditor scenario_id="demo" store=store on_notify=on_notify fullscreen=true />
			<div class="editor-overlay">
				<h1>"Scenario Editor"</h1>
				<p class="subtitle">
					"Drag node types onto the canvas. Drag from a red output port to another node to connect. Double-click a node to rename it. Scroll to zoom, middle-drag or shift-drag to pan."
				</p>
				{move || {
					notification
						.get()
						.map(|(message, severity)| {
							view! {
								<p class=format!(
									"notification notification-{}",
									severity.as_str(),
								)>{message}</p>
							}
						})
				}}
			</div>
		</div>
	}
}
