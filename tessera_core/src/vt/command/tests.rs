use super::{
    CommandError, CreateWidget, OscSplitter, Piece, WIDGET_OSC, WidgetCommand, decode_base94,
    encode_base94, parse,
};
use crate::index::Point;
use crate::widget::{PositionMode, WidgetParams};

/// Run `chunks` through one splitter, joining passthrough bytes.
fn split_all(chunks: &[&[u8]]) -> (Vec<u8>, Vec<Vec<u8>>) {
    let mut splitter = OscSplitter::default();
    let mut text = Vec::new();
    let mut commands = Vec::new();
    for chunk in chunks {
        splitter.split(chunk, &mut |piece| match piece {
            Piece::Bytes(b) => text.extend_from_slice(b),
            Piece::Command(body) => commands.push(body),
        });
    }
    (text, commands)
}

fn create(body: &str) -> CreateWidget {
    match parse(body.as_bytes()) {
        Ok(WidgetCommand::Create(c)) => c,
        other => panic!("expected create, got {other:?}"),
    }
}

#[test]
fn base94_matches_reference_pairs() {
    // 0 -> "!!", 93 -> "!~", 94 -> "\"!", 255 -> "#d"
    assert_eq!(encode_base94(&[0, 93, 94, 255]), "!!!~\"!#d");
    assert_eq!(decode_base94("!!!~\"!#d").unwrap(), vec![0, 93, 94, 255]);
    assert_eq!(decode_base94("").unwrap(), Vec::<u8>::new());
}

#[test]
fn base94_rejects_bad_input() {
    assert_eq!(decode_base94("!"), Err(CommandError::Base94));
    assert_eq!(decode_base94("! "), Err(CommandError::Base94));
    // 3 * 94 = 282 does not fit a byte.
    assert_eq!(decode_base94("$!"), Err(CommandError::Base94));
}

#[test]
fn parses_absolute_create() {
    let payload = encode_base94("1,2;3".as_bytes());
    let c = create(&format!("plot.line;A;2;3;10;4;{payload}"));
    assert_eq!(c.plugin, "plot.line");
    assert_eq!(c.position, PositionMode::Absolute);
    assert_eq!((c.x, c.y, c.width, c.height), (2, 3, 10, 4));
    assert_eq!(c.payload, "1,2;3");
    assert_eq!(c.cursor, Point::default());
}

#[test]
fn relative_create_allows_negative_offsets_and_empty_payload() {
    let c = create("panel;R;-1;-2;0;0;");
    assert_eq!(c.position, PositionMode::Relative);
    assert_eq!((c.x, c.y), (-1, -2));
    assert!(c.payload.is_empty());

    let c = create("panel;R;0;1;0;0");
    assert!(c.payload.is_empty());
}

#[test]
fn create_args_round_trip_through_params() {
    let c = create("panel;R;-1;2;6;0;");
    assert_eq!(c.args(), "-x -1 -y 2 -w 6 --relative");
    let params = WidgetParams::parse(&c.args()).unwrap();
    assert_eq!(params.position, PositionMode::Relative);
    assert_eq!((params.x, params.y), (-1, 2));
    assert_eq!((params.width, params.height), (Some(6), None));
}

#[test]
fn parses_lifecycle_commands() {
    assert_eq!(parse(b"plot;D;7"), Ok(WidgetCommand::Delete(7)));
    assert_eq!(parse(b"plot;S;7"), Ok(WidgetCommand::Stop(7)));
    assert_eq!(parse(b"plot;C;7"), Ok(WidgetCommand::Start(7)));
}

#[test]
fn malformed_commands_are_errors() {
    assert_eq!(parse(b""), Err(CommandError::Missing("plugin")));
    assert_eq!(parse(b"plot"), Err(CommandError::Missing("mode")));
    assert_eq!(parse(b"plot;Q"), Err(CommandError::UnknownMode("Q".to_owned())));
    assert_eq!(parse(b"plot;D"), Err(CommandError::Missing("id")));
    assert!(matches!(
        parse(b"plot;A;x;0;1;1;"),
        Err(CommandError::Number { field: "x", .. })
    ));
    assert!(matches!(
        parse(b"plot;A;0;0;-3;1;"),
        Err(CommandError::Number { field: "w", .. })
    ));
    assert_eq!(parse(b"plot;A;0;0;1;1;\x7f\x7f"), Err(CommandError::Base94));
    assert_eq!(parse(b"plot;D;\xff"), Err(CommandError::Utf8));
}

#[test]
fn splitter_lifts_sequences_out_of_text() {
    let seq = format!("\x1b]{WIDGET_OSC};panel;A;0;0;1;1;\x1b\\");
    let input = format!("ab{seq}cd\x1b]99999;x;D;3\x07ef");
    let (text, commands) = split_all(&[input.as_bytes()]);
    assert_eq!(text, b"abcdef");
    assert_eq!(commands, vec![b"panel;A;0;0;1;1;".to_vec(), b"x;D;3".to_vec()]);
}

#[test]
fn other_escapes_pass_through_untouched() {
    let input: &[u8] = b"\x1b[31mred\x1b]2;title\x07\x1b]9999;x\x07\x1b\x1b]999990;y\x07";
    let (text, commands) = split_all(&[input]);
    assert_eq!(text, input);
    assert!(commands.is_empty());
}

#[test]
fn sequences_may_straddle_chunks() {
    let (text, commands) =
        split_all(&[b"a\x1b", b"]999", b"99;pa", b"nel;D;1\x1b", b"\\b"]);
    assert_eq!(text, b"ab");
    assert_eq!(commands, vec![b"panel;D;1".to_vec()]);
}

#[test]
fn bare_escape_ends_the_body_and_starts_a_new_sequence() {
    let (text, commands) = split_all(&[b"\x1b]99999;p;D;1\x1b[1m"]);
    assert_eq!(commands, vec![b"p;D;1".to_vec()]);
    assert_eq!(text, b"[1m");
}

#[test]
fn cancel_discards_the_body() {
    let (text, commands) = split_all(&[b"\x1b]99999;p;D;1\x18after"]);
    assert!(commands.is_empty());
    assert_eq!(text, b"after");
}
