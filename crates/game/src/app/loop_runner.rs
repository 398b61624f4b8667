use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::process::ExitCode;

use geocache::{GameSession, NeighborhoodUpdate, TransferOutcome};
use tracing::{debug, error, info};

use super::bootstrap::AppWiring;
use super::commands::{parse_command_line, GameCommand, HELP_LINES};
use super::text_map::TextMapLayer;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        mut session,
        script_path,
    } = app;
    let stdout = io::stdout();
    let mut output = stdout.lock();

    let result = match script_path {
        Some(path) => match File::open(&path) {
            Ok(file) => run_commands(&mut session, BufReader::new(file), &mut output),
            Err(err) => {
                error!(error = %err, path = %path.display(), "script_open_failed");
                return ExitCode::FAILURE;
            }
        },
        None => run_commands(&mut session, io::stdin().lock(), &mut output),
    };

    if let Err(err) = result {
        error!(error = %err, "command_loop_failed");
        return ExitCode::FAILURE;
    }
    info!(score = session.score().get(), "session_ended");
    ExitCode::SUCCESS
}

pub(crate) fn run_commands<R: BufRead, W: Write>(
    session: &mut GameSession,
    input: R,
    output: &mut W,
) -> io::Result<()> {
    let mut layer = TextMapLayer::default();
    render(session, &mut layer, output)?;

    for line in input.lines() {
        let line = line?;
        let command = match parse_command_line(&line) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(error)) => {
                writeln!(output, "error: {}. usage: {}", error.reason, error.usage)?;
                continue;
            }
        };
        debug!(?command, "command_received");
        if command == GameCommand::Quit {
            break;
        }
        apply_command(session, command, &mut layer, output)?;
    }
    output.flush()
}

fn apply_command<W: Write>(
    session: &mut GameSession,
    command: GameCommand,
    layer: &mut TextMapLayer,
    output: &mut W,
) -> io::Result<()> {
    match command {
        GameCommand::Help => {
            for line in HELP_LINES {
                writeln!(output, "{line}")?;
            }
            Ok(())
        }
        GameCommand::Move(direction) => {
            let update = session.move_player(direction);
            write_update(output, &update)?;
            render(session, layer, output)
        }
        GameCommand::Teleport(position) => match session.teleport(position) {
            Some(update) => {
                write_update(output, &update)?;
                render(session, layer, output)
            }
            None => writeln!(output, "error: teleport target must be finite"),
        },
        GameCommand::Geolocation(fix) => {
            if let Ok(update) = session.on_geolocation(fix) {
                write_update(output, &update)?;
            }
            render(session, layer, output)
        }
        GameCommand::Poke(cell) => {
            let outcome = session.poke(cell);
            write_transfer(output, "poke", cell.i, cell.j, outcome)
        }
        GameCommand::Place(cell) => {
            let outcome = session.place(cell);
            write_transfer(output, "place", cell.i, cell.j, outcome)
        }
        GameCommand::Reset => {
            let update = session.reset();
            writeln!(output, "reset")?;
            write_update(output, &update)?;
            render(session, layer, output)
        }
        GameCommand::Status => render(session, layer, output),
        GameCommand::Quit => Ok(()),
    }
}

fn render<W: Write>(
    session: &mut GameSession,
    layer: &mut TextMapLayer,
    output: &mut W,
) -> io::Result<()> {
    session.render(layer);
    for line in layer.drain_lines() {
        writeln!(output, "{line}")?;
    }
    Ok(())
}

fn write_update<W: Write>(output: &mut W, update: &NeighborhoodUpdate) -> io::Result<()> {
    let Some(center) = update.center_cell else {
        return Ok(());
    };
    writeln!(
        output,
        "moved to cell {},{} saved={} restored={} spawned={}",
        center.i,
        center.j,
        update.saved.len(),
        update.restored.len(),
        update.spawned.len()
    )
}

fn write_transfer<W: Write>(
    output: &mut W,
    verb: &str,
    i: i32,
    j: i32,
    outcome: TransferOutcome,
) -> io::Result<()> {
    match outcome {
        TransferOutcome::Transferred { cache_value, score } => writeln!(
            output,
            "{verb} {i},{j}: cache={cache_value} score={}",
            score.get()
        ),
        TransferOutcome::Rejected(reason) => {
            writeln!(output, "{verb} {i},{j} rejected: {reason:?}")
        }
    }
}
