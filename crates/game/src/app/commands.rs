use geocache::{Cell, GeolocationError, LatLng, MoveDirection};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GameCommand {
    Help,
    Move(MoveDirection),
    Teleport(LatLng),
    Geolocation(Result<LatLng, GeolocationError>),
    Poke(Cell),
    Place(Cell),
    Reset,
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CommandParseError {
    pub(crate) reason: String,
    pub(crate) usage: &'static str,
}

pub(crate) const HELP_LINES: &[&str] = &[
    "n|s|e|w - Move one cell north, south, east or west",
    "teleport <lat:f64> <lng:f64> - Jump to a coordinate",
    "geo <lat:f64> <lng:f64> - Deliver a location fix",
    "geo-fail <reason...> - Deliver a failed location lookup",
    "poke <i:i32> <j:i32> - Take a point from a visible cache",
    "place <i:i32> <j:i32> - Put a point into a visible cache",
    "reset - Start a new game",
    "status - Redraw the map",
    "quit - Exit",
];

/// Skips blank lines and `#` comments; `None` means there is nothing to run.
pub(crate) fn parse_command_line(raw: &str) -> Option<Result<GameCommand, CommandParseError>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let name = tokens[0].to_ascii_lowercase();
    let args = &tokens[1..];
    Some(match name.as_str() {
        "help" => no_args(args, "help").map(|()| GameCommand::Help),
        "n" | "north" => no_args(args, "n").map(|()| GameCommand::Move(MoveDirection::North)),
        "s" | "south" => no_args(args, "s").map(|()| GameCommand::Move(MoveDirection::South)),
        "e" | "east" => no_args(args, "e").map(|()| GameCommand::Move(MoveDirection::East)),
        "w" | "west" => no_args(args, "w").map(|()| GameCommand::Move(MoveDirection::West)),
        "teleport" => {
            parse_lat_lng(args, "teleport <lat> <lng>").map(GameCommand::Teleport)
        }
        "geo" => parse_lat_lng(args, "geo <lat> <lng>")
            .map(|position| GameCommand::Geolocation(Ok(position))),
        "geo-fail" => Ok(GameCommand::Geolocation(Err(geolocation_failure(args)))),
        "poke" => parse_cell(args, "poke <i> <j>").map(GameCommand::Poke),
        "place" => parse_cell(args, "place <i> <j>").map(GameCommand::Place),
        "reset" => no_args(args, "reset").map(|()| GameCommand::Reset),
        "status" => no_args(args, "status").map(|()| GameCommand::Status),
        "quit" | "exit" => no_args(args, "quit").map(|()| GameCommand::Quit),
        _ => Err(CommandParseError {
            reason: format!("unknown command '{}'", tokens[0]),
            usage: "help",
        }),
    })
}

fn no_args(args: &[&str], usage: &'static str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError {
            reason: format!("unexpected argument '{}'", args[0]),
            usage,
        })
    }
}

fn exactly_two<'a>(
    args: &[&'a str],
    usage: &'static str,
) -> Result<(&'a str, &'a str), CommandParseError> {
    match args {
        [first, second] => Ok((*first, *second)),
        _ => Err(CommandParseError {
            reason: format!("expected 2 arguments, got {}", args.len()),
            usage,
        }),
    }
}

fn parse_lat_lng(args: &[&str], usage: &'static str) -> Result<LatLng, CommandParseError> {
    let (lat, lng) = exactly_two(args, usage)?;
    let parse = |raw: &str, field: &str| {
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| CommandParseError {
                reason: format!("invalid {field} '{raw}' (expected finite f64)"),
                usage,
            })
    };
    Ok(LatLng::new(parse(lat, "lat")?, parse(lng, "lng")?))
}

fn parse_cell(args: &[&str], usage: &'static str) -> Result<Cell, CommandParseError> {
    let (i, j) = exactly_two(args, usage)?;
    let parse = |raw: &str, field: &str| {
        raw.parse::<i32>().map_err(|_| CommandParseError {
            reason: format!("invalid {field} '{raw}' (expected i32)"),
            usage,
        })
    };
    Ok(Cell {
        i: parse(i, "i")?,
        j: parse(j, "j")?,
    })
}

fn geolocation_failure(args: &[&str]) -> GeolocationError {
    match args {
        [] => GeolocationError::Unavailable("unknown".to_string()),
        ["denied"] => GeolocationError::PermissionDenied,
        ["timeout"] => GeolocationError::Timeout,
        _ => GeolocationError::Unavailable(args.join(" ")),
    }
}
