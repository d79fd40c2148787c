// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use floor_field::io;
use floor_field::shapes::{Rectangle, Shape};
use floor_field::time_cost::{ConstantTimeCost, TimeCostFunction};
use floor_field::{build_solver, CellGrid, CellTag, ProgressInfo, SolverConfig, SolverKind};

#[derive(Parser)]
#[command(name = "floor-field", about = "Eikonal floor-field solver on a regular 2D grid")]
struct Cli {
    /// Domain width
    #[arg(long)]
    width: f64,

    /// Domain height
    #[arg(long)]
    height: f64,

    /// Cell edge length
    #[arg(short = 'r', long, default_value = "1.0")]
    resolution: f64,

    /// Target rectangle "x,y,w,h" (repeatable)
    #[arg(long = "target", num_args = 1, required = true)]
    targets: Vec<String>,

    /// Obstacle rectangle "x,y,w,h" (repeatable)
    #[arg(long = "obstacle", num_args = 1)]
    obstacles: Vec<String>,

    /// Solver: fmm, fsm or fim
    #[arg(short = 's', long, default_value = "fmm")]
    solver: SolverKind,

    /// Time cost: "uniform:<val>", "cost-file:<path>" or "speed-file:<path>"
    #[arg(long, default_value = "uniform:1.0")]
    cost: String,

    /// Convergence tolerance (fsm, fim)
    #[arg(short = 't', long)]
    tolerance: Option<f64>,

    /// Number of Rayon worker threads (fim)
    #[arg(long)]
    threads: Option<usize>,

    /// Safety limit on iterations before aborting (fsm, fim)
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Restrict each sweep to its upwind neighbours (fsm)
    #[arg(long)]
    directional: bool,

    /// Seed target neighbours with the exact distance to the target rectangles
    #[arg(long)]
    exact_seeds: bool,

    /// Output file path (.npy or .mat)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Print the potential at "x,y" (repeatable)
    #[arg(short = 'q', long = "query", num_args = 1)]
    queries: Vec<String>,

    /// Report progress of the iterative solver
    #[arg(long)]
    progress: bool,

    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "floor_field=info",
        1 => "floor_field=debug",
        _ => "floor_field=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_floats<const N: usize>(s: &str, flag: &str) -> Result<[f64; N]> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid --{} '{}': expected comma-separated floats", flag, s))?;
    match <[f64; N]>::try_from(parts) {
        Ok(values) => Ok(values),
        Err(parts) => bail!("--{} expects {} values, got {}", flag, N, parts.len()),
    }
}

fn parse_rect(s: &str, flag: &str) -> Result<Rectangle> {
    let [x, y, w, h] = parse_floats::<4>(s, flag)?;
    if w < 0.0 || h < 0.0 {
        bail!("--{} '{}': width and height must not be negative", flag, s);
    }
    Ok(Rectangle::new(x, y, w, h))
}

fn build_cost(mode: &str, grid: &CellGrid) -> Result<Box<dyn TimeCostFunction>> {
    if let Some(val_str) = mode.strip_prefix("uniform:") {
        let val: f64 = val_str.parse().context("invalid uniform cost value")?;
        let cost = ConstantTimeCost::new(val).context("invalid uniform cost")?;
        return Ok(Box::new(cost));
    }

    if let Some(path_str) = mode.strip_prefix("cost-file:") {
        let cost = io::load_cost_map(Path::new(path_str), grid)
            .with_context(|| format!("loading cost map {}", path_str))?;
        return Ok(Box::new(cost));
    }

    if let Some(path_str) = mode.strip_prefix("speed-file:") {
        let cost = io::load_speed_map_as_cost(Path::new(path_str), grid)
            .with_context(|| format!("loading speed map {}", path_str))?;
        return Ok(Box::new(cost));
    }

    bail!(
        "unknown --cost mode: '{}'. Expected 'uniform:<val>', 'cost-file:<path>', \
         or 'speed-file:<path>'",
        mode
    );
}

fn progress_printer() -> Box<dyn Fn(ProgressInfo) + Send + Sync> {
    Box::new(|info: ProgressInfo| {
        info!(
            "[{:.1}s] iterations={} active={} reached={}",
            info.elapsed.as_secs_f64(),
            info.iterations,
            info.active_list_size,
            info.cells_reached,
        );
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut grid = CellGrid::new(cli.width, cli.height, cli.resolution).context("invalid grid")?;
    info!(
        "domain {}x{}: grid {}x{} nodes at resolution {}",
        grid.width(),
        grid.height(),
        grid.cols(),
        grid.rows(),
        grid.resolution()
    );

    let mut target_shapes: Vec<Box<dyn Shape>> = Vec::new();
    for s in &cli.targets {
        let rect = parse_rect(s, "target")?;
        if grid.mark_shape(&rect, CellTag::Target) == 0 {
            warn!("target {} covers no grid cell", s);
        }
        target_shapes.push(Box::new(rect));
    }
    for s in &cli.obstacles {
        let rect = parse_rect(s, "obstacle")?;
        grid.mark_shape(&rect, CellTag::Obstacle);
    }
    if grid.target_count() == 0 {
        bail!("no grid cell is covered by a --target rectangle");
    }

    let cost = build_cost(&cli.cost, &grid)?;
    let config = SolverConfig {
        tolerance: cli.tolerance,
        threads: cli.threads,
        max_iterations: cli.max_iterations,
        directional_stencil: cli.directional,
        target_shapes: if cli.exact_seeds {
            target_shapes
        } else {
            Vec::new()
        },
        progress: cli.progress.then(progress_printer),
    };

    let mut solver = build_solver(cli.solver, grid, cost, config)?;
    solver
        .initialize()
        .with_context(|| format!("{} solver failed", cli.solver))?;

    for q in &cli.queries {
        let [x, y] = parse_floats::<2>(q, "query")?;
        let u = solver
            .potential_at([x, y])
            .with_context(|| format!("query ({}, {})", x, y))?;
        println!("{}\t{}\t{}", x, y, u);
    }

    if let Some(output) = &cli.output {
        io::save_field(solver.grid(), output)
            .with_context(|| format!("writing {}", output.display()))?;
        info!("saved potential field to {}", output.display());
    }

    Ok(())
}
