//! Node markers for compile-time search specialization.
//!
//! Plain marker types behind a trait with const flags: no integral
//! conversions, no arithmetic.

/// A node outside the principal variation, searched with a null window.
pub struct NonPV;

/// A principal-variation node, searched with a full window.
pub struct PV;

/// The root node.
pub struct Root;

pub trait NodeType {
    /// True for PV and Root nodes.
    const PV_NODE: bool;
    /// True for the root only.
    const ROOT_NODE: bool;
    /// Identifier carried through split points to re-select the node
    /// type on the helper side.
    const TYPE_ID: u32;
}

impl NodeType for NonPV {
    const PV_NODE: bool = false;
    const ROOT_NODE: bool = false;
    const TYPE_ID: u32 = 1;
}

impl NodeType for PV {
    const PV_NODE: bool = true;
    const ROOT_NODE: bool = false;
    const TYPE_ID: u32 = 2;
}

impl NodeType for Root {
    const PV_NODE: bool = true;
    const ROOT_NODE: bool = true;
    const TYPE_ID: u32 = 3;
}
