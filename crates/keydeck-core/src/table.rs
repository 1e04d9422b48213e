//! The layered binding table: a total grid of (layer, slot) bindings.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{Error, Result};
use crate::signature::Signature;

/// Number of hardware layers (always present).
pub const LAYER_COUNT: usize = 5;
/// Number of physical key slots per layer.
pub const SLOT_COUNT: usize = 12;

/// Hardware layer identifier, `0..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layer(u8);

impl Layer {
    /// Create a layer, rejecting values outside `0..=4`.
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        ((value as usize) < LAYER_COUNT).then_some(Self(value))
    }

    /// Create a layer or fail with [`Error::InvalidLayer`].
    pub fn try_new(value: u8) -> Result<Self> {
        Self::new(value).ok_or(Error::InvalidLayer(value))
    }

    /// The raw layer number.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Zero-based index into the table.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// All hardware layers in order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..LAYER_COUNT as u8).map(Self)
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self(0)
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical key position within a layer, `1..=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(u8);

impl Slot {
    /// Create a slot, rejecting values outside `1..=12`.
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (value >= 1 && (value as usize) <= SLOT_COUNT).then_some(Self(value))
    }

    /// Create a slot or fail with [`Error::InvalidSlot`].
    pub fn try_new(value: u8) -> Result<Self> {
        Self::new(value).ok_or(Error::InvalidSlot(value))
    }

    /// The raw slot number (1-based).
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Zero-based index into a layer's slot array.
    #[must_use]
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// All slots in order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=SLOT_COUNT as u8).map(Self)
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The unit stored per (layer, slot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// The physical signal that activates this binding; absent until assigned.
    pub trigger: Option<Signature>,
    /// The action executed on match.
    pub action: Action,
    /// Presentation-only label; never matched upon.
    pub display_name: String,
}

impl Binding {
    /// Default display name for a slot.
    #[must_use]
    pub fn default_name(slot: Slot) -> String {
        format!("Key {slot}")
    }

    /// An unbound binding with the default display name.
    #[must_use]
    pub fn unbound(slot: Slot) -> Self {
        Self { trigger: None, action: Action::None, display_name: Self::default_name(slot) }
    }
}

/// Total function from (layer, slot) to [`Binding`]: all 60 entries always
/// present. Lookups never fail by missing key, only by `action == None`.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingTable {
    layers: [[Binding; SLOT_COUNT]; LAYER_COUNT],
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingTable {
    /// A fresh table with every slot unbound.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: std::array::from_fn(|_| {
                std::array::from_fn(|i| Binding::unbound(Slot(i as u8 + 1)))
            }),
        }
    }

    /// The binding at (layer, slot). Always present.
    #[must_use]
    pub fn get(&self, layer: Layer, slot: Slot) -> &Binding {
        &self.layers[layer.index()][slot.index()]
    }

    /// Mutable access to the binding at (layer, slot).
    pub fn get_mut(&mut self, layer: Layer, slot: Slot) -> &mut Binding {
        &mut self.layers[layer.index()][slot.index()]
    }

    /// Assign a trigger to (layer, slot).
    ///
    /// Any other slot in the same layer holding the same trigger is cleared
    /// first, so a trigger appears at most once per layer. Idempotent.
    pub fn assign(&mut self, layer: Layer, slot: Slot, signature: Signature) {
        for other in &mut self.layers[layer.index()] {
            if other.trigger.as_ref() == Some(&signature) {
                other.trigger = None;
            }
        }
        self.layers[layer.index()][slot.index()].trigger = Some(signature);
    }

    /// Clear a binding back to its default state.
    pub fn unmap(&mut self, layer: Layer, slot: Slot) {
        self.layers[layer.index()][slot.index()] = Binding::unbound(slot);
    }

    /// Find the slot bound to a signature within one layer.
    #[must_use]
    pub fn find_in_layer(&self, layer: Layer, signature: &Signature) -> Option<Slot> {
        Slot::all().find(|slot| self.get(layer, *slot).trigger.as_ref() == Some(signature))
    }

    /// Find any binding holding a signature, searching layers in order.
    #[must_use]
    pub fn find_any(&self, signature: &Signature) -> Option<(Layer, Slot)> {
        Layer::all()
            .find_map(|layer| self.find_in_layer(layer, signature).map(|slot| (layer, slot)))
    }

    /// Iterate over all 60 entries in (layer, slot) order.
    pub fn entries(&self) -> impl Iterator<Item = (Layer, Slot, &Binding)> {
        Layer::all()
            .flat_map(move |layer| Slot::all().map(move |slot| (layer, slot, self.get(layer, slot))))
    }
}
