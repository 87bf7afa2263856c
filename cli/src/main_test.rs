use super::*;
use shapes::Geometry;

fn ctx(token: Option<&str>) -> CliContext {
    CliContext { base_url: "http://localhost:3000".into(), token: token.map(str::to_owned) }
}

#[test]
fn ws_url_maps_http_schemes() {
    assert_eq!(ws_url("http://localhost:3000/", "t").unwrap(), "ws://localhost:3000/api/ws?token=t");
    assert_eq!(ws_url("https://draw.example", "t").unwrap(), "wss://draw.example/api/ws?token=t");
    assert!(matches!(ws_url("ftp://x", "t"), Err(CliError::InvalidBaseUrl(_))));
}

#[test]
fn token_is_required_and_non_blank() {
    assert!(matches!(ctx(None).token(), Err(CliError::MissingToken)));
    assert!(matches!(ctx(Some("  ")).token(), Err(CliError::MissingToken)));
    assert_eq!(ctx(Some("abc")).token().unwrap(), "abc");
}

#[test]
fn rect_command_parses_negative_geometry() {
    let cli = Cli::try_parse_from(["draw", "--token", "t", "rect", "7", "-10", "5", "20", "-30"]).unwrap();
    let Command::Rect(args) = cli.command else {
        panic!("expected rect command");
    };
    let shape = box_shape(ShapeKind::Rect, &args);
    assert_eq!(args.room, "7");
    assert_eq!(shape.geometry, Geometry::Rect { x: -10.0, y: 5.0, width: 20.0, height: -30.0 });
    assert!(shape.validate().is_ok());
}

#[test]
fn circle_command_builds_circle() {
    let cli = Cli::try_parse_from(["draw", "circle", "1", "0", "0", "10", "10"]).unwrap();
    let Command::Circle(args) = cli.command else {
        panic!("expected circle command");
    };
    assert!(matches!(box_shape(ShapeKind::Circle, &args).geometry, Geometry::Circle { .. }));
}

#[test]
fn line_command_builds_one_segment_stroke() {
    let cli = Cli::try_parse_from(["draw", "line", "1", "0", "0", "3", "4"]).unwrap();
    let Command::Line(args) = cli.command else {
        panic!("expected line command");
    };
    let shape = line_shape(&args);
    assert!(shape.stroke_id().is_some_and(|s| !s.is_empty()));
    assert!(shape.validate().is_ok());
}

#[test]
fn erase_requires_at_least_one_id() {
    assert!(Cli::try_parse_from(["draw", "erase", "1"]).is_err());
    let cli = Cli::try_parse_from(["draw", "erase", "1", "a", "b"]).unwrap();
    assert!(matches!(cli.command, Command::Erase { ids, .. } if ids == ["a", "b"]));
}
