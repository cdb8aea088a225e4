//! Multi-rank runs on in-process `ThreadComm` groups.

mod util;

use mesh_balance::algs::communicator::Communicator;
use mesh_balance::io::gmsh::GmshReader;
use mesh_balance::io::{fragment_path, read_fragments};
use mesh_balance::setup::{Console, ExitCode, LifeCycle, State};
use util::{RecordingStages, Step, argv, path_str, quad_grid, run_group, write_mesh};

#[test]
fn three_ranks_balance_a_grid_into_three_fragments() {
    let dir = tempfile::tempdir().unwrap();
    let mesh = quad_grid(6, 4);
    let input = write_mesh(dir.path(), "grid.msh", &mesh);
    let out_dir = dir.path().join("out");
    let log = dir.path().join("run.log");
    let args = argv(&[
        &path_str(&input),
        &path_str(&out_dir),
        "-l",
        &path_str(&log),
        "-d",
        "rcb",
    ]);

    let results = run_group(3, |comm| {
        let (console, cap) = Console::capture();
        let mut lc = LifeCycle::with_console(&comm, args.clone(), console);
        lc.run();
        (comm.rank(), lc.state(), cap)
    });

    for (rank, state, cap) in &results {
        assert_eq!(*state, State::Balanced, "rank {rank}");
        if *rank != 0 {
            assert!(cap.is_empty(), "rank {rank} printed something");
        }
    }
    let root_out = results[0].2.stdout();
    assert!(root_out.starts_with("Running mesh-balance on 3 processes\n"), "{root_out}");
    assert!(root_out.contains(&format!("{}.3.*", out_dir.join("grid.msh").display())));
    assert_eq!(std::fs::read_to_string(&log).unwrap(), root_out);

    let output = out_dir.join("grid.msh");
    for rank in 0..3 {
        let piece = GmshReader
            .read(std::fs::File::open(fragment_path(&output, 3, rank)).unwrap())
            .unwrap();
        assert_eq!(piece.elements.len(), 8, "fragment {rank}");
        piece.validate().unwrap();
    }
    let back = read_fragments(&GmshReader, &output, 3).unwrap();
    assert_eq!(back, mesh);
}

#[test]
fn rcm_fragments_cover_the_mesh_once() {
    let dir = tempfile::tempdir().unwrap();
    let mesh = quad_grid(5, 3);
    let input = write_mesh(dir.path(), "m.msh", &mesh);
    let out_dir = dir.path().join("parts");
    let args = argv(&[&path_str(&input), &path_str(&out_dir), "-l", "cerr", "-d", "rcm"]);

    let codes = run_group(4, |comm| {
        let (console, _cap) = Console::capture();
        let mut lc = LifeCycle::with_console(&comm, args.clone(), console);
        lc.run();
        lc.exit_code()
    });
    assert!(codes.iter().all(|&c| c == ExitCode::Success));

    let back = read_fragments(&GmshReader, out_dir.join("m.msh"), 4).unwrap();
    assert_eq!(back.elements, mesh.elements);
}

#[test]
fn same_paths_are_not_a_no_op_with_several_ranks() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_mesh(dir.path(), "in.msh", &quad_grid(2, 2));
    let args = argv(&[&path_str(&input), &path_str(dir.path()), "-l", "cout"]);
    let stages = RecordingStages::new();
    let states = run_group(2, |comm| {
        let (console, _cap) = Console::capture();
        let mut lc = LifeCycle::with_console(&comm, args.clone(), console);
        lc.run_with(&stages);
        lc.state()
    });
    assert_eq!(states, vec![State::Balanced, State::Balanced]);
    for rank in 0..2 {
        assert_eq!(stages.calls(rank), vec![Step::Read, Step::Balance, Step::Write]);
    }
}

#[test]
fn balance_failure_on_one_rank_fails_every_rank() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_mesh(dir.path(), "in.msh", &quad_grid(2, 2));
    let args = argv(&[&path_str(&input), &path_str(&dir.path().join("o")), "-l", "cout"]);
    let stages = RecordingStages::failing_on(Step::Balance, 2);

    let results = run_group(3, |comm| {
        let (console, cap) = Console::capture();
        let mut lc = LifeCycle::with_console(&comm, args.clone(), console);
        lc.run_with(&stages);
        (lc.exit_code(), cap)
    });

    for (rank, (code, cap)) in results.iter().enumerate() {
        assert_eq!(*code, ExitCode::BalanceFailure, "rank {rank}");
        assert_eq!(stages.calls(rank), vec![Step::Read, Step::Balance]);
        if rank != 0 {
            assert!(cap.is_empty());
        }
    }
    let root = results[0].1.stdout();
    assert!(
        root.ends_with("balance failed on another process\n"),
        "{root}"
    );
}

#[test]
fn missing_input_on_one_rank_fails_the_parse_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_mesh(dir.path(), "in.msh", &quad_grid(1, 1));
    let missing = dir.path().join("elsewhere.msh");
    let stages = RecordingStages::new();

    let results = run_group(3, |comm| {
        // rank 1 sees a different file system view
        let infile = if comm.rank() == 1 { &missing } else { &input };
        let args = argv(&[&path_str(infile), &path_str(&dir.path().join("o")), "-l", "cout"]);
        let (console, cap) = Console::capture();
        let mut lc = LifeCycle::with_console(&comm, args, console);
        lc.run_with(&stages);
        (lc.exit_code(), cap)
    });

    assert!(results.iter().all(|(c, _)| *c == ExitCode::ParseFailure));
    assert_eq!(stages.total_calls(), 0);
    assert_eq!(
        results[0].1.stderr(),
        "Configuration failed on another process\n"
    );
    assert!(results[1].1.is_empty());
    assert!(results[2].1.is_empty());
}

#[test]
fn non_root_ranks_never_create_the_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.msh");
    let log = dir.path().join("never.log");
    let args = argv(&[&path_str(&missing), "-l", &path_str(&log)]);
    let codes = run_group(2, |comm| {
        let (console, _cap) = Console::capture();
        LifeCycle::with_console(&comm, args.clone(), console).exit_code()
    });
    assert_eq!(codes, vec![ExitCode::ParseFailure; 2]);
    assert!(!log.exists());
}
