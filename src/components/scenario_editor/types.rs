use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a node, unique within one scenario document.
pub type NodeId = u64;

/// A point or extent in graph (unscaled, unpanned) coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
	pub x: f64,
	pub y: f64,
}

impl Vec2 {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

impl std::ops::Add for Vec2 {
	type Output = Vec2;
	fn add(self, rhs: Vec2) -> Vec2 {
		Vec2::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl std::ops::Sub for Vec2 {
	type Output = Vec2;
	fn sub(self, rhs: Vec2) -> Vec2 {
		Vec2::new(self.x - rhs.x, self.y - rhs.y)
	}
}

/// The node palette: each kind determines icon, fill color and the shape of
/// the kind-specific property bag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
	Start,
	State,
	Action,
	Condition,
	Event,
	End,
}

impl NodeKind {
	pub const ALL: [NodeKind; 6] = [
		NodeKind::Start,
		NodeKind::State,
		NodeKind::Action,
		NodeKind::Condition,
		NodeKind::Event,
		NodeKind::End,
	];

	pub fn default_title(self) -> &'static str {
		match self {
			Self::Start => "Start",
			Self::State => "State",
			Self::Action => "Action",
			Self::Condition => "Condition",
			Self::Event => "Event",
			Self::End => "End",
		}
	}

	pub fn color(self) -> &'static str {
		match self {
			Self::Start => "#4caf50",
			Self::State => "#2196f3",
			Self::Action => "#ff9800",
			Self::Condition => "#9c27b0",
			Self::Event => "#ffc107",
			Self::End => "#f44336",
		}
	}

	pub fn icon(self) -> &'static str {
		match self {
			Self::Start => "\u{25b6}",
			Self::State => "\u{25a0}",
			Self::Action => "\u{26a1}",
			Self::Condition => "?",
			Self::Event => "\u{2709}",
			Self::End => "\u{25a3}",
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Start => "start",
			Self::State => "state",
			Self::Action => "action",
			Self::Condition => "condition",
			Self::Event => "event",
			Self::End => "end",
		}
	}

	pub fn parse(s: &str) -> Option<NodeKind> {
		Self::ALL.into_iter().find(|k| k.as_str() == s)
	}

	/// Start and end markers are exempt from the isolated-node check.
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Start | Self::End)
	}
}

/// Attributes shared by every node plus the kind-specific detail section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeProperties {
	pub name: String,
	pub description: String,
	pub enabled: bool,
	#[serde(flatten)]
	pub detail: KindDetail,
}

impl NodeProperties {
	pub fn new(kind: NodeKind) -> Self {
		Self {
			name: kind.default_title().to_string(),
			description: String::new(),
			enabled: true,
			detail: KindDetail::new(kind),
		}
	}
}

/// Kind-specific attribute bag. Untagged: the node's `kind` field already
/// discriminates, and each variant has a distinct required-field shape.
/// `Terminal` must stay last so it only matches once the others have failed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KindDetail {
	State(StateProps),
	Action(ActionProps),
	Condition(ConditionProps),
	Event(EventProps),
	Terminal(TerminalProps),
}

impl KindDetail {
	pub fn new(kind: NodeKind) -> Self {
		match kind {
			NodeKind::State => Self::State(StateProps::default()),
			NodeKind::Action => Self::Action(ActionProps::default()),
			NodeKind::Condition => Self::Condition(ConditionProps::default()),
			NodeKind::Event => Self::Event(EventProps::default()),
			NodeKind::Start | NodeKind::End => Self::Terminal(TerminalProps {}),
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateProps {
	pub transitions: Vec<String>,
	pub on_enter: String,
	pub on_exit: String,
	pub on_update: String,
	pub is_initial: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionProps {
	pub action_type: String,
	pub parameters: Value,
	pub delay: f64,
	pub repeat: bool,
}

impl Default for ActionProps {
	fn default() -> Self {
		Self {
			action_type: String::new(),
			parameters: Value::Object(serde_json::Map::new()),
			delay: 0.0,
			repeat: false,
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionProps {
	pub condition_type: String,
	pub expression: String,
	pub true_state: String,
	pub false_state: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventProps {
	pub event_type: String,
	pub trigger: String,
	pub target_state: String,
	pub data: Value,
}

impl Default for EventProps {
	fn default() -> Self {
		Self {
			event_type: String::new(),
			trigger: String::new(),
			target_state: String::new(),
			data: Value::Object(serde_json::Map::new()),
		}
	}
}

/// Empty bag for start/end markers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminalProps {}

/// A typed, positioned vertex of the scenario graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
	pub id: NodeId,
	pub kind: NodeKind,
	pub position: Vec2,
	pub size: Vec2,
	pub title: String,
	pub properties: NodeProperties,
}

impl Node {
	/// Axis-aligned bounding-box test in graph space.
	pub fn contains(&self, p: Vec2) -> bool {
		p.x >= self.position.x
			&& p.x <= self.position.x + self.size.x
			&& p.y >= self.position.y
			&& p.y <= self.position.y + self.size.y
	}

	pub fn center(&self) -> Vec2 {
		Vec2::new(
			self.position.x + self.size.x / 2.0,
			self.position.y + self.size.y / 2.0,
		)
	}

	/// Left-center port where incoming connections attach.
	pub fn input_port(&self) -> Vec2 {
		Vec2::new(self.position.x, self.position.y + self.size.y / 2.0)
	}

	/// Right-center port where outgoing connections originate.
	pub fn output_port(&self) -> Vec2 {
		Vec2::new(
			self.position.x + self.size.x,
			self.position.y + self.size.y / 2.0,
		)
	}
}

/// A directed edge between two node ids. `color` and `dashed` are
/// display-only; `color` follows the source node's kind color by convention.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
	pub from: NodeId,
	pub to: NodeId,
	pub color: String,
	#[serde(default)]
	pub dashed: bool,
}

/// Smallest allowed zoom factor.
pub const MIN_SCALE: f64 = 0.1;
/// Largest allowed zoom factor.
pub const MAX_SCALE: f64 = 5.0;

/// The pan/scale transform mapping graph space to screen space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
	pub scale: f64,
	pub pan: Vec2,
}

impl Default for Viewport {
	fn default() -> Self {
		Self {
			scale: 1.0,
			pan: Vec2::default(),
		}
	}
}

impl Viewport {
	/// Inverse of the translate-then-scale drawing transform.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Vec2 {
		Vec2::new((sx - self.pan.x) / self.scale, (sy - self.pan.y) / self.scale)
	}

	/// Multiply the scale by `factor`, clamp, and correct the pan so the
	/// graph point under the screen anchor stays visually fixed.
	pub fn zoom_at(&mut self, factor: f64, anchor_x: f64, anchor_y: f64) {
		let new_scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
		let ratio = new_scale / self.scale;
		self.pan.x = anchor_x - (anchor_x - self.pan.x) * ratio;
		self.pan.y = anchor_y - (anchor_y - self.pan.y) * ratio;
		self.scale = new_scale;
	}
}

/// The persisted shape of a scenario: exactly the in-memory model, flat.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDocument {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub description: String,
	pub nodes: Vec<Node>,
	pub connections: Vec<Connection>,
	#[serde(default)]
	pub viewport: Viewport,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn node(id: NodeId, kind: NodeKind, x: f64, y: f64) -> Node {
		Node {
			id,
			kind,
			position: Vec2::new(x, y),
			size: Vec2::new(120.0, 80.0),
			title: kind.default_title().to_string(),
			properties: NodeProperties::new(kind),
		}
	}

	#[test]
	fn kind_serializes_lowercase() {
		assert_eq!(
			serde_json::to_value(NodeKind::Start).unwrap(),
			serde_json::json!("start")
		);
		assert_eq!(
			serde_json::from_value::<NodeKind>(serde_json::json!("condition")).unwrap(),
			NodeKind::Condition
		);
	}

	#[test]
	fn kind_parse_round_trips() {
		for kind in NodeKind::ALL {
			assert_eq!(NodeKind::parse(kind.as_str()), Some(kind));
		}
		assert_eq!(NodeKind::parse("nope"), None);
	}

	#[test]
	fn default_detail_matches_kind() {
		assert!(matches!(
			NodeProperties::new(NodeKind::State).detail,
			KindDetail::State(_)
		));
		assert!(matches!(
			NodeProperties::new(NodeKind::Action).detail,
			KindDetail::Action(_)
		));
		assert!(matches!(
			NodeProperties::new(NodeKind::Condition).detail,
			KindDetail::Condition(_)
		));
		assert!(matches!(
			NodeProperties::new(NodeKind::Event).detail,
			KindDetail::Event(_)
		));
		assert!(matches!(
			NodeProperties::new(NodeKind::Start).detail,
			KindDetail::Terminal(_)
		));
		assert!(matches!(
			NodeProperties::new(NodeKind::End).detail,
			KindDetail::Terminal(_)
		));
	}

	#[test]
	fn properties_round_trip_every_kind() {
		for kind in NodeKind::ALL {
			let props = NodeProperties::new(kind);
			let json = serde_json::to_string(&props).unwrap();
			let back: NodeProperties = serde_json::from_str(&json).unwrap();
			assert_eq!(back, props, "kind {:?}", kind);
		}
	}

	#[test]
	fn document_round_trip_is_identity() {
		let nodes: Vec<Node> = NodeKind::ALL
			.into_iter()
			.enumerate()
			.map(|(i, kind)| node(i as NodeId, kind, 50.0 * i as f64, 25.0 * i as f64))
			.collect();
		let connections = vec![
			Connection {
				from: 0,
				to: 1,
				color: NodeKind::Start.color().to_string(),
				dashed: false,
			},
			Connection {
				from: 1,
				to: 5,
				color: NodeKind::State.color().to_string(),
				dashed: true,
			},
		];
		let doc = ScenarioDocument {
			name: "demo".to_string(),
			description: "round trip".to_string(),
			nodes,
			connections,
			viewport: Viewport {
				scale: 1.75,
				pan: Vec2::new(-40.0, 12.5),
			},
		};

		let json = serde_json::to_string(&doc).unwrap();
		let back: ScenarioDocument = serde_json::from_str(&json).unwrap();
		assert_eq!(back, doc);
	}

	#[test]
	fn bounding_box_contains_edges() {
		let n = node(1, NodeKind::State, 100.0, 100.0);
		assert!(n.contains(Vec2::new(100.0, 100.0)));
		assert!(n.contains(Vec2::new(220.0, 180.0)));
		assert!(n.contains(n.center()));
		assert!(!n.contains(Vec2::new(99.9, 100.0)));
		assert!(!n.contains(Vec2::new(100.0, 180.1)));
	}

	#[test]
	fn ports_sit_on_vertical_midline() {
		let n = node(1, NodeKind::Action, 10.0, 20.0);
		assert_eq!(n.input_port(), Vec2::new(10.0, 60.0));
		assert_eq!(n.output_port(), Vec2::new(130.0, 60.0));
	}
}
