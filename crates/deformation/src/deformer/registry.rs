use std::collections::BTreeMap;

use tracing::debug;

use super::Deformer;
use super::axis::Axis;
use super::builtin::{
    Inflate, Offset, PointCachePlayer, RecalculateBounds, RecalculateNormals, Scale, Sine, Spherify,
    Twist, VertexColorMask,
};

/// Registration record for one deformer kind.
#[derive(Debug, Clone, Copy)]
pub struct DeformerInfo {
    pub name: &'static str,
    pub category: &'static str,
    /// Orientation handed to `construct` by [`DeformerRegistry::create`]
    pub default_axis: Axis,
    pub construct: fn(Axis) -> Box<dyn Deformer>,
}

/// Startup-time table of the deformer kinds an application offers.
#[derive(Debug, Clone, Default)]
pub struct DeformerRegistry {
    entries: BTreeMap<&'static str, DeformerInfo>,
}

impl DeformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with the built-in stages.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for info in BUILTIN {
            registry.register(*info);
        }
        registry
    }

    /// Add a kind, replacing and returning any kind with the same name.
    pub fn register(&mut self, info: DeformerInfo) -> Option<DeformerInfo> {
        debug!("Registered deformer '{}' ({})", info.name, info.category);
        self.entries.insert(info.name, info)
    }

    pub fn get(&self, name: &str) -> Option<&DeformerInfo> {
        self.entries.get(name)
    }

    /// Construct a deformer with its default orientation.
    pub fn create(&self, name: &str) -> Option<Box<dyn Deformer>> {
        self.get(name).map(|info| (info.construct)(info.default_axis))
    }

    pub fn create_oriented(&self, name: &str, axis: Axis) -> Option<Box<dyn Deformer>> {
        self.get(name).map(|info| (info.construct)(axis))
    }

    /// Kinds in `category`, ordered by name.
    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a DeformerInfo> + 'a {
        self.entries.values().filter(move |info| info.category == category)
    }

    pub fn categories(&self) -> Vec<&'static str> {
        let mut categories: Vec<&'static str> = self.entries.values().map(|info| info.category).collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const BUILTIN: &[DeformerInfo] = &[
    DeformerInfo {
        name: "Offset",
        category: "Transform",
        default_axis: Axis::Y,
        construct: |axis| Box::new(Offset::new(axis.vector())),
    },
    DeformerInfo {
        name: "Scale",
        category: "Transform",
        default_axis: Axis::Y,
        construct: |_| Box::new(Scale::uniform(1.0)),
    },
    DeformerInfo {
        name: "Twist",
        category: "Transform",
        default_axis: Axis::Y,
        construct: |axis| Box::new(Twist::new(axis, 45.0)),
    },
    DeformerInfo {
        name: "Sine",
        category: "Noise",
        default_axis: Axis::Y,
        construct: |axis| Box::new(Sine::new(axis, 0.25, 1.0).with_speed(1.0)),
    },
    DeformerInfo {
        name: "Spherify",
        category: "Normal",
        default_axis: Axis::Y,
        construct: |_| Box::new(Spherify::new(1.0, 0.5)),
    },
    DeformerInfo {
        name: "Inflate",
        category: "Normal",
        default_axis: Axis::Y,
        construct: |_| Box::new(Inflate::new(0.1)),
    },
    DeformerInfo {
        name: "Vertex Color Mask",
        category: "Mask",
        default_axis: Axis::Y,
        construct: |_| Box::new(VertexColorMask::default()),
    },
    DeformerInfo {
        name: "Point Cache",
        category: "Animation",
        default_axis: Axis::Y,
        construct: |_| Box::new(PointCachePlayer::default()),
    },
    DeformerInfo {
        name: "Recalculate Normals",
        category: "Utility",
        default_axis: Axis::Y,
        construct: |_| Box::new(RecalculateNormals::default()),
    },
    DeformerInfo {
        name: "Recalculate Bounds",
        category: "Utility",
        default_axis: Axis::Y,
        construct: |_| Box::new(RecalculateBounds),
    },
];
