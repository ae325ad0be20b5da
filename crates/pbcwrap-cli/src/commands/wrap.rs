use crate::cli::CommonArgs;
use crate::config::PartialWrapConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use pbcwrap::{
    core::io::{pdb::PdbFile, traits::TrajectoryFile},
    engine::{config::Mode, progress::ProgressReporter},
    workflows,
};
use tracing::info;

/// Runs `wrap` or `unwrap` on a trajectory file and writes the result.
///
/// The output file is only created once every frame has been processed.
pub async fn run(
    mode: Mode,
    args: CommonArgs,
    center: Option<String>,
    sequential: bool,
) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialWrapConfig::from_file(path)?,
        None => PartialWrapConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(mode, &args, center.as_ref())?;

    info!("Loading input trajectory from {:?}", &args.input);
    let mut trajectory =
        PdbFile::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;
    let topology = trajectory.topology();
    info!(
        "Loaded {} frame(s) of {} atom(s) in {} residue(s) and {} fragment(s).",
        trajectory.num_frames(),
        trajectory.num_atoms(),
        topology.num_residues(),
        topology.num_fragments()
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting {}...", mode);
    let summary = tokio::task::block_in_place(|| match mode {
        Mode::Wrap if !sequential => {
            workflows::wrap::run_parallel(&mut trajectory, &config, &reporter)
        }
        _ => workflows::wrap::run(&mut trajectory, &config, &reporter),
    })?;

    info!("Writing output trajectory to {:?}", &args.output);
    PdbFile::write_to_path(&trajectory, &args.output).map_err(|e| CliError::FileWriting {
        path: args.output.clone(),
        source: e.into(),
    })?;

    println!(
        "✓ {} frame(s) ({}..={}) of {} atom(s) in {} block(s) written to: {}",
        summary.frames_processed,
        summary.first_frame,
        summary.last_frame,
        summary.num_selected,
        summary.num_blocks,
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const TWO_FRAMES: &str = "\
CRYST1   10.000   10.000   10.000  90.00  90.00  90.00 P 1           1
MODEL        1
ATOM      1  C1  MOL A   1       6.000   0.000   0.000  1.00  0.00           C
ATOM      2  C2  MOL A   1       4.000   0.000   0.000  1.00  0.00           C
ENDMDL
MODEL        2
ATOM      1  C1  MOL A   1       6.500   0.000   0.000  1.00  0.00           C
ATOM      2  C2  MOL A   1       4.500   0.000   0.000  1.00  0.00           C
ENDMDL
END
";

    fn common(input: &std::path::Path, output: &std::path::Path) -> CommonArgs {
        CommonArgs {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            config: None,
            first: None,
            last: None,
            compound: None,
            refatoms: None,
            selection: None,
            set_values: Vec::new(),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn wrap_writes_wrapped_trajectory() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.pdb");
        let output = dir.path().join("out.pdb");
        fs::write(&input, TWO_FRAMES).unwrap();

        run(Mode::Wrap, common(&input, &output), None, false)
            .await
            .unwrap();

        let result = PdbFile::read_from_path(&output).unwrap();
        assert_eq!(result.num_frames(), 2);
        assert_eq!(&result.frames()[0].coords[..4], &[-4.0, 0.0, 0.0, -6.0]);
        assert_eq!(&result.frames()[1].coords[..4], &[-3.5, 0.0, 0.0, -5.5]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failure_leaves_no_output_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.pdb");
        let output = dir.path().join("out.pdb");
        fs::write(&input, TWO_FRAMES).unwrap();

        let mut args = common(&input, &output);
        args.selection = Some("resname XYZ".to_string());
        let result = run(Mode::Unwrap, args, None, false).await;

        assert!(matches!(result, Err(CliError::Engine(_))));
        assert!(!output.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_input_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let result = run(
            Mode::Wrap,
            common(&dir.path().join("absent.pdb"), &dir.path().join("out.pdb")),
            None,
            true,
        )
        .await;
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }
}
