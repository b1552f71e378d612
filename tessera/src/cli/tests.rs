use super::{CliError, Command, parse};

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

#[test]
fn no_args_runs_default_shell() {
    assert_eq!(parse(&[]), Ok(Command::Run { shell: None }));
}

#[test]
fn info_flags() {
    assert_eq!(parse(&args(&["-h"])), Ok(Command::Help));
    assert_eq!(parse(&args(&["--version"])), Ok(Command::Version));
    assert_eq!(parse(&args(&["--print-config"])), Ok(Command::PrintConfig));
}

#[test]
fn dash_e_takes_the_rest() {
    assert_eq!(
        parse(&args(&["-e", "htop", "-d", "5"])),
        Ok(Command::Run {
            shell: Some("htop -d 5".to_owned())
        })
    );
    assert_eq!(parse(&args(&["-e"])), Err(CliError::MissingCommand));
}

#[test]
fn unknown_flags_are_rejected() {
    assert_eq!(
        parse(&args(&["--frobnicate"])),
        Err(CliError::UnknownOption("--frobnicate".to_owned()))
    );
}
