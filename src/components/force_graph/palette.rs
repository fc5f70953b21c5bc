use std::collections::HashMap;

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

pub const DEFAULT_NODE_COLOR: &str = "#9aa5b1";
pub const HUB_COLOR: &str = "#f5c542";

/// Node fill resolution: explicit group mapping, then a stable hash of the
/// group into the palette, then the default color.
#[derive(Clone, Debug)]
pub struct ColorScheme {
	pub group_colors: HashMap<String, String>,
	pub default_color: String,
	pub hub_color: String,
}

impl Default for ColorScheme {
	fn default() -> Self {
		Self {
			group_colors: HashMap::new(),
			default_color: DEFAULT_NODE_COLOR.into(),
			hub_color: HUB_COLOR.into(),
		}
	}
}

impl ColorScheme {
	pub fn with_group(mut self, group: impl Into<String>, color: impl Into<String>) -> Self {
		self.group_colors.insert(group.into(), color.into());
		self
	}

	pub fn node_color(&self, group: Option<&str>) -> String {
		match group {
			Some(g) => match self.group_colors.get(g) {
				Some(color) => color.clone(),
				None => COLORS[group_hash(g) as usize % COLORS.len()].into(),
			},
			None => self.default_color.clone(),
		}
	}
}

// FNV-1a, so the same group keeps its color across reloads and builds.
fn group_hash(group: &str) -> u32 {
	group.bytes().fold(0x811c_9dc5_u32, |hash, byte| {
		(hash ^ byte as u32).wrapping_mul(0x0100_0193)
	})
}
