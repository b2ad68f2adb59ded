mod game;
mod levels;
mod paths;
mod solver;

use clap::Parser;
use game::{GameState, Level, Move};
use levels::ParsedLevel;
use paths::moves_to_string;
use solver::Solver;
use std::process;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "sokosolve")]
#[command(about = "A Sokoban solver", long_about = None)]
struct Args {
    /// Path to the level file
    #[arg(value_name = "FILE")]
    level_file: String,

    /// Print the solution step-by-step
    #[arg(short, long)]
    print_solution: bool,
}

fn print_solution(initial: &GameState, solution: &[Move]) {
    println!("\nStarting position:\n{}", initial);
    let mut state = initial.clone();
    let total = solution.len();
    for (count, &m) in solution.iter().enumerate() {
        state.apply_move(m);
        println!("Move {} ({}/{}):\n{}", m, count + 1, total, state);
    }
}

fn main() {
    let args = Args::parse();

    let parsed = match ParsedLevel::from_file(&args.level_file) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error loading level: {}", e);
            process::exit(1);
        }
    };

    let level = Level::new(&parsed.rows);
    let initial = GameState::new(&level, parsed.player, &parsed.boxes);

    if initial.is_victory() {
        println!("Level is already solved");
        return;
    }

    let mut solver = Solver::new(&level);
    let start = Instant::now();
    let solution = solver.solve(&initial);
    let elapsed = start.elapsed();

    if solution.is_empty() {
        println!(
            "no solution found  states: {:<8}  elapsed: {} ms",
            solver.states_explored(),
            elapsed.as_millis()
        );
        return;
    }

    println!("{}", moves_to_string(&solution));
    println!(
        "steps: {:<5}  states: {:<8}  elapsed: {} ms",
        solution.len(),
        solver.states_explored(),
        elapsed.as_millis()
    );

    if args.print_solution {
        print_solution(&initial, &solution);
    }
}
