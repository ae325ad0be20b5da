use crate::core::geometry::PeriodicBox;
use crate::core::models::trajectory::Trajectory;
use crate::engine::config::{Compound, ConfigError, FrameRange, Mode, ReferenceAtoms, WrapConfig};
use crate::engine::error::EngineError;
use crate::engine::partition::partition;
use crate::engine::processor::FrameProcessor;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::provider::{AtomAttribute, SelectionProvider, TrajectoryProvider};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument, warn};

const MIN_PROGRESS_INTERVAL: usize = 10;
const MAX_PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapSummary {
    pub mode: Mode,
    pub frames_processed: usize,
    pub first_frame: usize,
    pub last_frame: usize,
    pub num_blocks: usize,
    pub num_selected: usize,
}

/// Wraps or unwraps the configured frame range, one frame at a time.
///
/// Frames are read, processed and written back in order. An error stops the run;
/// frames written before the failing one keep their new coordinates.
#[instrument(skip_all, name = "wrap_workflow", fields(mode = %config.mode))]
pub fn run<P>(
    provider: &mut P,
    config: &WrapConfig,
    reporter: &ProgressReporter,
) -> Result<WrapSummary, EngineError>
where
    P: SelectionProvider + TrajectoryProvider,
{
    // === Phase 0: Selection and partitioning ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let mut processor = prepare_processor(&*provider, config)?;
    let (first, last) = resolve_frame_range(config.frames, provider.num_frames())?;
    reporter.report(Progress::PhaseFinish);

    let mut summary = WrapSummary {
        mode: config.mode,
        frames_processed: 0,
        first_frame: first,
        last_frame: last,
        num_blocks: processor.layout().num_blocks(),
        num_selected: processor.num_selected(),
    };
    if first > last {
        return Ok(summary);
    }

    // === Phase 1: Frame loop ===
    let interval = progress_interval(first, last);
    reporter.report(Progress::PhaseStart { name: "Frames" });
    reporter.report(Progress::TaskStart {
        total_steps: (last - first + 1) as u64,
    });

    let mut buffer = Vec::with_capacity(3 * provider.num_atoms());
    for frame in first..=last {
        provider.read_coordinates(frame, &mut buffer)?;
        processor.process_frame(&mut buffer, || load_box(&*provider, frame))?;
        provider.write_coordinates(frame, &buffer)?;

        summary.frames_processed += 1;
        if frame % interval == 0 {
            debug!(frame, "Processed frame");
            reporter.report(Progress::FrameDone {
                frame,
                completed: summary.frames_processed as u64,
            });
        }
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    info!(
        frames = summary.frames_processed,
        blocks = summary.num_blocks,
        "Finished {} of frames {}..={}.",
        config.mode,
        first,
        last
    );
    Ok(summary)
}

/// Wraps the configured frame range of an in-memory trajectory across the rayon pool.
///
/// Every box in the range is validated before any coordinate is touched. Unwrapping
/// depends on the previous frame and is rejected here; use [`run`] instead.
#[instrument(skip_all, name = "parallel_wrap_workflow")]
pub fn run_parallel(
    trajectory: &mut Trajectory,
    config: &WrapConfig,
    reporter: &ProgressReporter,
) -> Result<WrapSummary, EngineError> {
    if config.mode != Mode::Wrap {
        return Err(ConfigError::SequentialOnly(config.mode).into());
    }

    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let processor = prepare_processor(&*trajectory, config)?;
    let (first, last) = resolve_frame_range(config.frames, trajectory.num_frames())?;
    reporter.report(Progress::PhaseFinish);

    let mut summary = WrapSummary {
        mode: config.mode,
        frames_processed: 0,
        first_frame: first,
        last_frame: last,
        num_blocks: processor.layout().num_blocks(),
        num_selected: processor.num_selected(),
    };
    if first > last {
        return Ok(summary);
    }

    let boxes = (first..=last)
        .map(|frame| load_box(&*trajectory, frame))
        .collect::<Result<Vec<_>, _>>()?;

    let interval = progress_interval(first, last);
    let completed = AtomicU64::new(0);
    reporter.report(Progress::PhaseStart { name: "Frames" });
    reporter.report(Progress::TaskStart {
        total_steps: boxes.len() as u64,
    });

    trajectory.frames_mut()[first..=last]
        .par_iter_mut()
        .zip(boxes.par_iter())
        .enumerate()
        .try_for_each(|(offset, (frame, pbc))| {
            processor.wrap_frame(&mut frame.coords, pbc)?;
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            let index = first + offset;
            if index % interval == 0 {
                reporter.report(Progress::FrameDone {
                    frame: index,
                    completed: done,
                });
            }
            Ok::<(), EngineError>(())
        })?;

    summary.frames_processed = boxes.len();
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    info!(
        frames = summary.frames_processed,
        blocks = summary.num_blocks,
        "Finished parallel wrap of frames {}..={}.",
        first,
        last
    );
    Ok(summary)
}

/// Resolves selections and attributes into a ready [`FrameProcessor`].
pub fn prepare_processor<P>(
    provider: &P,
    config: &WrapConfig,
) -> Result<FrameProcessor, EngineError>
where
    P: SelectionProvider + ?Sized,
{
    if config.mode == Mode::Unwrap && config.center.is_some() {
        return Err(ConfigError::CenterWithUnwrap.into());
    }

    let selection = provider.select(&config.selection)?;
    if selection.is_empty() {
        return Err(EngineError::EmptySelection {
            selection: config.selection.clone(),
        });
    }

    let center_group = match &config.center {
        Some(text) => {
            let group = provider.select(text)?;
            if group.is_empty() {
                return Err(EngineError::EmptyCenterGroup {
                    selection: text.clone(),
                });
            }
            Some(group)
        }
        None => None,
    };

    let tags = match config.compound {
        Compound::None => vec![0; selection.len()],
        Compound::Residue => provider.attribute(&selection, AtomAttribute::Residue)?.to_tags(),
        Compound::Beta => provider.attribute(&selection, AtomAttribute::Beta)?.to_tags(),
        Compound::Fragment => provider.attribute(&selection, AtomAttribute::Fragment)?.to_tags(),
    };
    let layout = partition(&tags, config.compound);

    let reference_mask = match (config.reference_atoms, config.compound) {
        (ReferenceAtoms::All, _) => None,
        (ReferenceAtoms::Occupancy, Compound::None) => {
            warn!("Reference atoms are ignored when every atom is its own block (compound none).");
            None
        }
        (ReferenceAtoms::Occupancy, _) => Some(
            provider
                .attribute(&selection, AtomAttribute::Occupancy)?
                .to_flags(),
        ),
    };

    info!(
        selected = selection.len(),
        blocks = layout.num_blocks(),
        compound = %config.compound,
        refatoms = %config.reference_atoms,
        centered = center_group.is_some(),
        "Partitioned selection into blocks."
    );

    FrameProcessor::new(
        config.mode,
        provider.num_atoms(),
        selection,
        layout,
        reference_mask,
        center_group,
    )
}

/// Returns the inclusive `(first, last)` frame pair to process.
///
/// `last` beyond the trajectory (or unset) is clamped to the final frame. A `last`
/// before `first` is not an error; it yields an empty range.
pub fn resolve_frame_range(
    range: FrameRange,
    num_frames: usize,
) -> Result<(usize, usize), EngineError> {
    if range.first >= num_frames {
        return Err(EngineError::InvalidFrameRange {
            first: range.first,
            num_frames,
        });
    }
    let final_frame = num_frames - 1;
    let last = range.last.map_or(final_frame, |last| last.min(final_frame));
    if last < range.first {
        warn!(
            first = range.first,
            last, "Last frame precedes first frame; no frames will be processed."
        );
    }
    Ok((range.first, last))
}

/// Number of frames between two progress notifications.
pub fn progress_interval(first: usize, last: usize) -> usize {
    (last.saturating_sub(first) / 10).clamp(MIN_PROGRESS_INTERVAL, MAX_PROGRESS_INTERVAL)
}

fn load_box<P>(provider: &P, frame: usize) -> Result<PeriodicBox, EngineError>
where
    P: TrajectoryProvider + ?Sized,
{
    let cell = provider.unit_cell(frame)?;
    PeriodicBox::from_cell(&cell).map_err(|source| EngineError::Box { frame, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{BoxError, UnitCell};
    use crate::core::models::frame::Frame;
    use crate::core::models::topology::{AtomRecord, Topology};
    use crate::engine::config::WrapConfigBuilder;
    use std::sync::Mutex;

    fn record(residue_number: isize, residue_name: &str, occupancy: f64) -> AtomRecord {
        AtomRecord {
            name: "C".into(),
            residue_name: residue_name.into(),
            residue_number,
            occupancy,
            ..Default::default()
        }
    }

    /// Two residues of two atoms each, plus a lone ion.
    fn trajectory(cells: &[UnitCell], positions: &[[f32; 3]]) -> Trajectory {
        let atoms = vec![
            record(1, "MOL", 1.0),
            record(1, "MOL", 0.0),
            record(2, "MOL", 1.0),
            record(2, "MOL", 1.0),
            record(3, "NA", 1.0),
        ];
        let topology = Topology::new(atoms, vec![(0, 1), (2, 3)]).unwrap();
        let frames = cells
            .iter()
            .map(|cell| Frame::from_positions(*cell, positions))
            .collect();
        Trajectory::new(topology, frames).unwrap()
    }

    fn positions() -> Vec<[f32; 3]> {
        vec![
            [6.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
            [-12.0, 3.0, 1.0],
            [-11.0, 3.0, 1.0],
            [0.0, 0.0, 27.0],
        ]
    }

    fn config(mode: Mode) -> WrapConfigBuilder {
        WrapConfigBuilder::new().mode(mode)
    }

    fn position(t: &Trajectory, frame: usize, atom: usize) -> [f32; 3] {
        let c = &t.frames()[frame].coords;
        [c[3 * atom], c[3 * atom + 1], c[3 * atom + 2]]
    }

    #[test]
    fn wraps_every_frame_by_residue() {
        let cell = UnitCell::orthorhombic(10.0, 10.0, 10.0);
        let mut t = trajectory(&[cell, cell], &positions());
        let summary = run(&mut t, &config(Mode::Wrap).build().unwrap(), &ProgressReporter::new())
            .unwrap();

        assert_eq!(summary.frames_processed, 2);
        assert_eq!(summary.num_blocks, 3);
        assert_eq!(summary.num_selected, 5);
        for frame in 0..2 {
            assert_eq!(position(&t, frame, 0), [-4.0, 0.0, 0.0]);
            assert_eq!(position(&t, frame, 1), [-6.0, 0.0, 0.0]);
            assert_eq!(position(&t, frame, 2), [-2.0, 3.0, 1.0]);
            assert_eq!(position(&t, frame, 4), [0.0, 0.0, -3.0]);
        }
    }

    #[test]
    fn occupancy_reference_atoms_drive_the_shift() {
        let cell = UnitCell::orthorhombic(10.0, 10.0, 10.0);
        let mut t = trajectory(&[cell], &positions());
        let cfg = config(Mode::Wrap)
            .reference_atoms(ReferenceAtoms::Occupancy)
            .build()
            .unwrap();
        run(&mut t, &cfg, &ProgressReporter::new()).unwrap();
        // Residue 1 is referenced by atom 0 alone (x = 6), so it shifts by one box.
        assert_eq!(position(&t, 0, 0), [-4.0, 0.0, 0.0]);
        assert_eq!(position(&t, 0, 1), [-6.0, 0.0, 0.0]);
    }

    #[test]
    fn selection_restricts_the_atoms_that_move() {
        let cell = UnitCell::orthorhombic(10.0, 10.0, 10.0);
        let mut t = trajectory(&[cell], &positions());
        let cfg = config(Mode::Wrap).selection("resname NA").build().unwrap();
        let summary = run(&mut t, &cfg, &ProgressReporter::new()).unwrap();
        assert_eq!(summary.num_selected, 1);
        assert_eq!(position(&t, 0, 0), [6.0, 0.0, 0.0]);
        assert_eq!(position(&t, 0, 4), [0.0, 0.0, -3.0]);
    }

    #[test]
    fn non_orthorhombic_box_is_rejected_before_mutation() {
        let good = UnitCell::orthorhombic(10.0, 10.0, 10.0);
        let skewed = UnitCell::new([10.0, 10.0, 10.0], [90.0, 90.0, 80.0]);
        let mut t = trajectory(&[good, skewed], &positions());
        let err = run(&mut t, &config(Mode::Wrap).build().unwrap(), &ProgressReporter::new())
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Box {
                frame: 1,
                source: BoxError::NonOrthorhombic { .. }
            }
        ));
        assert_eq!(position(&t, 1, 0), [6.0, 0.0, 0.0]);
        assert_eq!(position(&t, 0, 0), [-4.0, 0.0, 0.0]);
    }

    #[test]
    fn zero_box_is_rejected() {
        let mut t = trajectory(&[UnitCell::default()], &positions());
        let err = run(&mut t, &config(Mode::Wrap).build().unwrap(), &ProgressReporter::new())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Box {
                frame: 0,
                source: BoxError::InvalidLength { .. }
            }
        ));
    }

    #[test]
    fn unwrap_ignores_the_first_box_and_removes_jumps() {
        let cell = UnitCell::orthorhombic(10.0, 10.0, 10.0);
        let mut shifted = positions();
        // The ion crosses the z boundary between frames.
        shifted[4] = [0.0, 0.0, -4.0];
        let mut t = trajectory(&[UnitCell::default(), cell], &positions());
        t.frames_mut()[0].coords[14] = 4.0;
        t.frames_mut()[1].coords = Frame::from_positions(cell, &shifted).coords;

        let summary = run(&mut t, &config(Mode::Unwrap).build().unwrap(), &ProgressReporter::new())
            .unwrap();
        assert_eq!(summary.frames_processed, 2);
        assert_eq!(position(&t, 0, 4), [0.0, 0.0, 4.0]);
        assert_eq!(position(&t, 1, 4), [0.0, 0.0, 6.0]);
        assert_eq!(position(&t, 1, 0), [6.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_selection_and_center_group_are_rejected() {
        let cell = UnitCell::orthorhombic(10.0, 10.0, 10.0);
        let mut t = trajectory(&[cell], &positions());
        let cfg = config(Mode::Wrap).selection("resname XYZ").build().unwrap();
        assert!(matches!(
            run(&mut t, &cfg, &ProgressReporter::new()),
            Err(EngineError::EmptySelection { .. })
        ));

        let cfg = config(Mode::Wrap)
            .center(Some("name ZZ".into()))
            .build()
            .unwrap();
        assert!(matches!(
            run(&mut t, &cfg, &ProgressReporter::new()),
            Err(EngineError::EmptyCenterGroup { .. })
        ));
    }

    #[test]
    fn center_with_unwrap_is_rejected_even_without_builder() {
        let cell = UnitCell::orthorhombic(10.0, 10.0, 10.0);
        let mut t = trajectory(&[cell], &positions());
        let mut cfg = config(Mode::Unwrap).build().unwrap();
        cfg.center = Some("all".into());
        assert!(matches!(
            run(&mut t, &cfg, &ProgressReporter::new()),
            Err(EngineError::Configuration(ConfigError::CenterWithUnwrap))
        ));
    }

    #[test]
    fn frame_range_is_validated_and_clamped() {
        assert!(matches!(
            resolve_frame_range(FrameRange { first: 5, last: None }, 5),
            Err(EngineError::InvalidFrameRange { first: 5, num_frames: 5 })
        ));
        assert!(resolve_frame_range(FrameRange::default(), 0).is_err());
        assert_eq!(
            resolve_frame_range(FrameRange { first: 1, last: Some(99) }, 5).unwrap(),
            (1, 4)
        );
        assert_eq!(
            resolve_frame_range(FrameRange { first: 3, last: Some(1) }, 5).unwrap(),
            (3, 1)
        );
    }

    #[test]
    fn reversed_range_processes_nothing() {
        let cell = UnitCell::orthorhombic(10.0, 10.0, 10.0);
        let mut t = trajectory(&[cell, cell, cell], &positions());
        let cfg = config(Mode::Wrap).first_frame(2).last_frame(Some(1)).build().unwrap();
        let summary = run(&mut t, &cfg, &ProgressReporter::new()).unwrap();
        assert_eq!(summary.frames_processed, 0);
        assert_eq!(position(&t, 2, 0), [6.0, 0.0, 0.0]);
    }

    #[test]
    fn progress_interval_is_clamped() {
        assert_eq!(progress_interval(0, 5), 10);
        assert_eq!(progress_interval(0, 500), 50);
        assert_eq!(progress_interval(0, 100_000), 100);
        assert_eq!(progress_interval(7, 3), 10);
    }

    #[test]
    fn progress_fires_on_interval_multiples() {
        let cell = UnitCell::orthorhombic(10.0, 10.0, 10.0);
        let mut t = trajectory(&[cell; 25], &positions());
        let frames = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::FrameDone { frame, .. } = event {
                frames.lock().unwrap().push(frame);
            }
        }));
        let cfg = config(Mode::Wrap).first_frame(3).build().unwrap();
        run(&mut t, &cfg, &reporter).unwrap();
        drop(reporter);
        assert_eq!(frames.into_inner().unwrap(), vec![10, 20]);
    }

    #[test]
    fn parallel_wrap_matches_sequential() {
        let cells = vec![UnitCell::orthorhombic(10.0, 12.0, 14.0); 6];
        let mut sequential = trajectory(&cells, &positions());
        let mut parallel = sequential.clone();
        let cfg = config(Mode::Wrap).first_frame(1).last_frame(Some(4)).build().unwrap();

        let a = run(&mut sequential, &cfg, &ProgressReporter::new()).unwrap();
        let b = run_parallel(&mut parallel, &cfg, &ProgressReporter::new()).unwrap();
        assert_eq!(a, b);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn parallel_wrap_validates_every_box_first() {
        let good = UnitCell::orthorhombic(10.0, 10.0, 10.0);
        let skewed = UnitCell::new([10.0, 10.0, 10.0], [90.0, 90.0, 80.0]);
        let mut t = trajectory(&[good, good, skewed], &positions());
        let original = t.clone();
        assert!(matches!(
            run_parallel(&mut t, &config(Mode::Wrap).build().unwrap(), &ProgressReporter::new()),
            Err(EngineError::Box { frame: 2, .. })
        ));
        assert_eq!(t, original);
    }

    #[test]
    fn parallel_entry_point_rejects_unwrap() {
        let mut t = trajectory(&[UnitCell::orthorhombic(10.0, 10.0, 10.0)], &positions());
        assert!(matches!(
            run_parallel(&mut t, &config(Mode::Unwrap).build().unwrap(), &ProgressReporter::new()),
            Err(EngineError::Configuration(ConfigError::SequentialOnly(Mode::Unwrap)))
        ));
    }
}
