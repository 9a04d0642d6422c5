//! The generation loop.
//!
//! A run seeds the persisted counter, then repeats generations until the
//! counter drops to the terminal value:
//!
//! 1. fade every generated shape
//! 2. read the counter
//! 3. compute and persist the spacing
//! 4. emit `count` shapes along the spiral
//! 5. persist the decayed counter, or select everything and stop
//!
//! Generation `g + 1` only starts after generation `g`'s writes landed, so
//! shape creation and fading are totally ordered. Nothing is rolled back when
//! a generation fails part way.

use crate::config::LayoutConfig;
use crate::counter::{CounterStore, Slot};
use crate::document::{Document, NodeId};
use crate::errors::PluginError;
use crate::layout::{SpiralLayout, find_generated};
use crate::log::{debug, info, warn};
use crate::types::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Seeding,
    Iterating,
    Terminated,
}

/// State owned by exactly one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunContext {
    /// Counter value the run started from; fixes the total span.
    pub initial_count: Scalar,
}

/// What one generation did
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// 1-based generation number
    pub generation: usize,
    /// Counter value read at the start of the generation
    pub count: Scalar,
    /// Spacing used for this generation's spiral
    pub distance: Scalar,
    /// Shapes faded before emitting
    pub decayed: usize,
    pub created: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub context: RunContext,
    pub generations: Vec<GenerationReport>,
    /// Counter value left in the document
    pub final_count: Scalar,
    /// Generated shapes selected at the end of the run
    pub selected: Vec<NodeId>,
}

impl RunSummary {
    /// Shapes created across every generation of the run.
    pub fn shapes_created(&self) -> usize {
        self.generations.iter().map(|g| g.created.len()).sum()
    }
}

/// Spacing that keeps the spiral's total extent near
/// `footprint * initial_count` however many shapes remain.
///
/// `count <= 1` would divide by zero (or flip the sign); those counts get a
/// spacing of zero instead. Non-finite counts also get zero.
pub fn next_distance(layout: &LayoutConfig, initial: Scalar, count: Scalar) -> Scalar {
    if !count.is_finite() || count.raw() <= 1.0 {
        return Scalar::ZERO;
    }
    let target_total = initial * layout.shape_footprint;
    let rect_total = count * layout.shape_footprint;
    let remaining = target_total - rect_total;
    remaining / (count - Scalar(1.0)) + Scalar(layout.shape_footprint)
}

/// Counter value for the next generation.
pub fn next_count(layout: &LayoutConfig, count: Scalar) -> Scalar {
    (count * layout.count_decay).round()
}

/// Drives one run against a document.
pub struct IterationController<'d, D: Document + ?Sized> {
    doc: &'d mut D,
    config: LayoutConfig,
    layout: SpiralLayout,
    store: CounterStore,
    state: RunState,
    context: RunContext,
    generations: Vec<GenerationReport>,
    final_count: Scalar,
    selected: Vec<NodeId>,
}

impl<'d, D: Document + ?Sized> IterationController<'d, D> {
    pub fn new(doc: &'d mut D, config: &LayoutConfig) -> Self {
        IterationController {
            doc,
            config: *config,
            layout: SpiralLayout::new(config),
            store: CounterStore::new(),
            state: RunState::Seeding,
            context: RunContext {
                initial_count: Scalar::ZERO,
            },
            generations: Vec::new(),
            final_count: Scalar::ZERO,
            selected: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn generations(&self) -> &[GenerationReport] {
        &self.generations
    }

    /// Fix the run's reference count and persist it as the counter.
    pub async fn seed(&mut self, requested: u32) -> Result<(), PluginError> {
        if self.state != RunState::Seeding {
            return Err(PluginError::Other("run was already seeded".into()));
        }
        let requested = Scalar::from(requested);
        self.context.initial_count = requested;
        if !self.store.set(&mut *self.doc, Slot::Count, requested).await? {
            warn!("no `Count` node in the document; the run will draw nothing");
        }
        info!(count = %requested, "seeded generation run");
        self.state = RunState::Iterating;
        Ok(())
    }

    /// Run one generation and return the state it leaves the run in.
    pub async fn step(&mut self) -> Result<RunState, PluginError> {
        if self.state != RunState::Iterating {
            return Err(PluginError::Other(format!(
                "cannot run a generation while {:?}",
                self.state
            )));
        }

        let decayed = self.layout.decay(&mut *self.doc);
        let count = self.store.get(&mut *self.doc, Slot::Count).await?;

        let distance = if self.store.exists(&mut *self.doc, Slot::Distance).await? {
            let distance = next_distance(&self.config, self.context.initial_count, count);
            self.store.set(&mut *self.doc, Slot::Distance, distance).await?;
            distance
        } else {
            Scalar::ZERO
        };

        let created = self.layout.emit(&mut *self.doc, count.as_count(), distance.raw());
        let generation = self.generations.len() + 1;
        debug!(
            generation,
            count = %count,
            distance = %distance,
            created = created.len(),
            "generation complete"
        );
        self.generations.push(GenerationReport {
            generation,
            count,
            distance,
            decayed,
            created,
        });

        if !count.is_finite() {
            warn!(count = %count, "counter is not a finite number; stopping");
            self.terminate(count);
        } else if count.raw() > self.config.terminal_count {
            let next = next_count(&self.config, count);
            if next >= count {
                warn!(count = %count, next = %next, "counter stopped shrinking; stopping");
                self.terminate(count);
            } else {
                self.store.set(&mut *self.doc, Slot::Count, next).await?;
            }
        } else {
            self.terminate(count);
        }
        Ok(self.state)
    }

    fn terminate(&mut self, count: Scalar) {
        let generated = find_generated(&*self.doc);
        self.doc.set_selection(generated.clone());
        self.doc.scroll_and_zoom_into_view(&generated);
        info!(
            generations = self.generations.len(),
            selected = generated.len(),
            "generation run finished"
        );
        self.final_count = count;
        self.selected = generated;
        self.state = RunState::Terminated;
    }

    /// Seed, then iterate until the run terminates.
    pub async fn run(mut self, requested: u32) -> Result<RunSummary, PluginError> {
        self.seed(requested).await?;
        while self.state == RunState::Iterating {
            self.step().await?;
        }
        Ok(RunSummary {
            context: self.context,
            generations: self.generations,
            final_count: self.final_count,
            selected: self.selected,
        })
    }
}

/// Run a whole generation sequence starting from `requested` shapes.
pub async fn generate<D: Document + ?Sized>(
    doc: &mut D,
    requested: u32,
    config: &LayoutConfig,
) -> Result<RunSummary, PluginError> {
    IterationController::new(doc, config).run(requested).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;

    fn readouts() -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        doc.add_text("Count", "0");
        doc.add_text("Distance", "0");
        doc
    }

    #[test]
    fn distance_formula() {
        let layout = LayoutConfig::default();
        assert_eq!(next_distance(&layout, Scalar(16.0), Scalar(16.0)), Scalar(100.0));
        let d = next_distance(&layout, Scalar(16.0), Scalar(12.0));
        assert!((d.raw() - 136.36363636363637).abs() < 1e-9);
    }

    #[test]
    fn distance_at_one_and_below_is_zero() {
        let layout = LayoutConfig::default();
        assert_eq!(next_distance(&layout, Scalar(16.0), Scalar(1.0)), Scalar::ZERO);
        assert_eq!(next_distance(&layout, Scalar(16.0), Scalar(0.0)), Scalar::ZERO);
        assert_eq!(next_distance(&layout, Scalar(16.0), Scalar(f64::NAN)), Scalar::ZERO);
    }

    #[test]
    fn count_decay_rounds() {
        let layout = LayoutConfig::default();
        assert_eq!(next_count(&layout, Scalar(16.0)), Scalar(12.0));
        assert_eq!(next_count(&layout, Scalar(3.0)), Scalar(2.0));
        assert_eq!(next_count(&layout, Scalar(12.0)), Scalar(9.0));
    }

    #[tokio::test]
    async fn states_advance_in_order() {
        let mut doc = readouts();
        let mut controller = IterationController::new(&mut doc, &LayoutConfig::default());
        assert_eq!(controller.state(), RunState::Seeding);
        assert!(controller.step().await.is_err());

        controller.seed(3).await.unwrap();
        assert_eq!(controller.state(), RunState::Iterating);
        assert_eq!(controller.context().initial_count, Scalar(3.0));
        assert!(controller.seed(3).await.is_err());

        // 3 -> 2, then 2 terminates
        assert_eq!(controller.step().await.unwrap(), RunState::Iterating);
        assert_eq!(controller.step().await.unwrap(), RunState::Terminated);
        assert_eq!(controller.generations().len(), 2);
    }

    #[tokio::test]
    async fn sixteen_runs_to_two() {
        let mut doc = readouts();
        let summary = generate(&mut doc, 16, &LayoutConfig::default()).await.unwrap();

        let counts: Vec<f64> = summary.generations.iter().map(|g| g.count.raw()).collect();
        assert_eq!(counts, vec![16.0, 12.0, 9.0, 7.0, 5.0, 4.0, 3.0, 2.0]);
        assert_eq!(summary.final_count, Scalar(2.0));
        assert_eq!(doc.text_of("Count"), Some("2"));
        assert_eq!(summary.shapes_created(), 58);
        assert_eq!(summary.selected.len(), 58);
        assert_eq!(doc.selection(), summary.selected);
        assert_eq!(doc.viewport(), summary.selected.as_slice());
    }

    #[tokio::test]
    async fn first_generation_uses_unit_spacing() {
        let mut doc = readouts();
        let summary = generate(&mut doc, 16, &LayoutConfig::default()).await.unwrap();
        assert_eq!(summary.generations[0].distance, Scalar(100.0));
        let second = summary.generations[1].distance.raw();
        assert!((second - 136.36363636363637).abs() < 1e-9);
        // last generation (count 2) spreads the remaining span over one gap
        assert_eq!(summary.generations.last().unwrap().distance, Scalar(1500.0));
        assert_eq!(doc.text_of("Distance"), Some("1500"));
    }

    #[tokio::test]
    async fn opacity_of_first_generation_after_full_run() {
        let mut doc = readouts();
        let summary = generate(&mut doc, 16, &LayoutConfig::default()).await.unwrap();
        let g = summary.generations.len() as i32;
        let first = summary.generations[0].created[0];
        let opacity = doc.node(first).unwrap().as_rectangle().unwrap().opacity.raw();
        assert!((opacity - 0.84f64.powi(g - 1)).abs() < 1e-12);
    }

    #[tokio::test]
    async fn count_of_one_draws_a_single_shape_at_origin() {
        let mut doc = readouts();
        let summary = generate(&mut doc, 1, &LayoutConfig::default()).await.unwrap();
        assert_eq!(summary.generations.len(), 1);
        assert_eq!(summary.generations[0].distance, Scalar::ZERO);
        assert_eq!(doc.text_of("Distance"), Some("0"));
        let rect = doc.node(summary.selected[0]).unwrap().as_rectangle().unwrap();
        assert_eq!((rect.x, rect.y), (0.0, 0.0));
    }

    #[tokio::test]
    async fn missing_count_node_draws_nothing() {
        let mut doc = MemoryDocument::new();
        doc.add_text("Distance", "0");
        let summary = generate(&mut doc, 50, &LayoutConfig::default()).await.unwrap();
        assert_eq!(summary.generations.len(), 1);
        assert_eq!(summary.shapes_created(), 0);
        assert_eq!(summary.final_count, Scalar::ZERO);
    }

    #[tokio::test]
    async fn missing_distance_node_stacks_at_origin() {
        let mut doc = MemoryDocument::new();
        doc.add_text("Count", "0");
        let summary = generate(&mut doc, 4, &LayoutConfig::default()).await.unwrap();
        assert!(summary.generations.iter().all(|g| g.distance == Scalar::ZERO));
        for id in &summary.selected {
            let rect = doc.node(*id).unwrap().as_rectangle().unwrap();
            assert_eq!((rect.x, rect.y), (0.0, 0.0));
        }
    }

    #[tokio::test]
    async fn non_shrinking_decay_still_terminates() {
        let mut doc = readouts();
        let config = LayoutConfig {
            count_decay: 1.0,
            ..LayoutConfig::default()
        };
        let summary = generate(&mut doc, 5, &config).await.unwrap();
        assert_eq!(summary.generations.len(), 1);
        assert_eq!(summary.final_count, Scalar(5.0));
    }

    #[tokio::test]
    async fn every_requested_count_terminates_on_the_decay_sequence() {
        for requested in 1..=300u32 {
            let mut expected = vec![f64::from(requested)];
            while let Some(&last) = expected.last().filter(|&&c| c > 2.0) {
                expected.push((last * 0.76).round());
            }

            let mut doc = readouts();
            let summary = generate(&mut doc, requested, &LayoutConfig::default())
                .await
                .unwrap();
            let counts: Vec<f64> = summary.generations.iter().map(|g| g.count.raw()).collect();
            assert_eq!(counts, expected, "counts for {requested}");
            assert_eq!(summary.final_count.raw(), *expected.last().unwrap(), "final count for {requested}");
            assert_eq!(
                summary.shapes_created(),
                expected.iter().sum::<f64>() as usize,
                "shapes for {requested}"
            );
        }
    }

    #[tokio::test]
    async fn each_run_reseeds() {
        let mut doc = readouts();
        generate(&mut doc, 4, &LayoutConfig::default()).await.unwrap();
        let second = generate(&mut doc, 4, &LayoutConfig::default()).await.unwrap();
        assert_eq!(second.context.initial_count, Scalar(4.0));
        assert_eq!(second.generations[0].count, Scalar(4.0));
        // every shape from the first run is faded once more on each generation
        assert_eq!(second.generations[0].decayed, 4 + 3 + 2);
    }
}
