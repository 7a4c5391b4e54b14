use serde::{Deserialize, Serialize};

/// A numeric copper/graphics layer identifier as used in shape records.
pub type LayerId = u32;

pub const TOP_LAYER: LayerId = 1;
pub const BOTTOM_LAYER: LayerId = 2;

/// One entry of the board's layer manifest, e.g. `21~Inner1~#999966~true~false~true~Signal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    /// Trailing manifest field; `Signal` marks a routable copper layer.
    pub kind: String,
}

impl Layer {
    pub fn new(id: LayerId, name: &str, kind: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Parse a manifest entry. Entries without a numeric id are not layers we can route on.
    pub fn parse(entry: &str) -> Option<Self> {
        let fields: Vec<&str> = entry.split('~').collect();
        let id = fields.first()?.trim().parse().ok()?;
        let name = fields.get(1).copied().unwrap_or_default();
        let kind = fields.last().copied().unwrap_or_default();
        Some(Self::new(id, name, kind))
    }

    pub fn is_signal(&self) -> bool {
        self.kind == "Signal"
    }
}

/// The set of layers whose tracks take part in cleanup and synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalLayers {
    layers: Vec<LayerId>,
}

impl SignalLayers {
    /// Only the default top and bottom copper layers.
    pub fn new() -> Self {
        Self {
            layers: vec![TOP_LAYER, BOTTOM_LAYER],
        }
    }

    /// Defaults plus every manifest entry marked as a signal layer.
    pub fn from_manifest<S: AsRef<str>>(entries: &[S]) -> Self {
        let mut signal = Self::new();
        for layer in entries.iter().filter_map(|e| Layer::parse(e.as_ref())) {
            if layer.is_signal() {
                signal.add_layer(layer.id);
            }
        }
        signal
    }

    pub fn add_layer(&mut self, id: LayerId) {
        if !self.layers.contains(&id) {
            self.layers.push(id);
        }
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.layers.contains(&id)
    }

    pub fn all_layers(&self) -> &[LayerId] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl Default for SignalLayers {
    fn default() -> Self {
        Self::new()
    }
}
