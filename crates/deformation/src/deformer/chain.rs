use tracing::{trace, warn};

use super::{Deformer, StageContext};
use crate::channels::ChannelSet;
use crate::jobs::JobHandle;

/// Ordered list of deformer stages.
///
/// Edits take effect on the next issued chain; jobs already scheduled keep
/// the parameters they captured.
#[derive(Default)]
pub struct DeformerChain {
    stages: Vec<Box<dyn Deformer>>,
}

impl DeformerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, stage: impl Deformer + 'static) -> Self {
        self.push(stage);
        self
    }

    pub fn push(&mut self, stage: impl Deformer + 'static) {
        self.stages.push(Box::new(stage));
    }

    pub fn push_boxed(&mut self, stage: Box<dyn Deformer>) {
        self.stages.push(stage);
    }

    /// Insert a stage at `index`, clamped to the chain length.
    pub fn insert(&mut self, index: usize, stage: Box<dyn Deformer>) {
        let index = index.min(self.stages.len());
        self.stages.insert(index, stage);
    }

    pub fn remove(&mut self, index: usize) -> Option<Box<dyn Deformer>> {
        (index < self.stages.len()).then(|| self.stages.remove(index))
    }

    /// Reorder two stages. Returns false if either index is out of range.
    pub fn swap(&mut self, a: usize, b: usize) -> bool {
        if a >= self.stages.len() || b >= self.stages.len() {
            return false;
        }
        self.stages.swap(a, b);
        true
    }

    pub fn clear(&mut self) {
        self.stages.clear();
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> impl Iterator<Item = &dyn Deformer> {
        self.stages.iter().map(|stage| stage.as_ref())
    }

    fn active(&self) -> impl Iterator<Item = &dyn Deformer> {
        self.stages().filter(|stage| stage.can_process())
    }

    /// Channels read by stages that would run.
    pub fn reads(&self) -> ChannelSet {
        self.active().fold(ChannelSet::empty(), |set, stage| set | stage.channels().reads)
    }

    /// Channels written by stages that would run.
    pub fn writes(&self) -> ChannelSet {
        self.active().fold(ChannelSet::empty(), |set, stage| set | stage.channels().writes)
    }

    pub fn touched(&self) -> ChannelSet {
        self.reads() | self.writes()
    }

    /// Schedule every runnable stage in order, each after the previous one.
    pub fn schedule(&self, ctx: &mut StageContext<'_>, dependency: JobHandle) -> JobHandle {
        let mut handle = dependency;
        for stage in self.active() {
            trace!("Scheduling stage '{}'", stage.name());
            handle = stage.schedule(ctx, handle);
        }
        handle
    }

    /// Check stage order, warning when a stage deriving data from positions
    /// runs before a later stage moves them.
    ///
    /// Returns true if no problem was found.
    pub fn validate(&self) -> bool {
        let derived = ChannelSet::NORMALS | ChannelSet::TANGENTS | ChannelSet::BOUNDS;
        let stages: Vec<&dyn Deformer> = self.active().collect();
        let mut ok = true;
        for (i, stage) in stages.iter().enumerate() {
            let channels = stage.channels();
            if !channels.reads.contains(ChannelSet::POSITIONS) || !channels.writes.intersects(derived) {
                continue;
            }
            if let Some(later) = stages[i + 1..]
                .iter()
                .find(|later| later.channels().writes.contains(ChannelSet::POSITIONS))
            {
                warn!(
                    "Stage '{}' runs before '{}' moves positions; its output will be stale",
                    stage.name(),
                    later.name()
                );
                ok = false;
            }
        }
        ok
    }
}

impl std::fmt::Debug for DeformerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.stages().map(|stage| stage.name())).finish()
    }
}
