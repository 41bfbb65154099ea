use gesture_pointer::{logging, BridgeSettings, GestureBridge, ViewportRect};
use std::io::BufRead;

const DEFAULT_SETTINGS: &str = "gesture_pointer.json";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Pause,
    Resume,
    Toggle,
    Assign(ViewportRect),
    #[cfg(windows)]
    AssignWindow(isize),
    Clear,
    Status,
    Quit,
    Nothing,
}

fn print_help() {
    println!("commands: p = pause, r = resume, t = toggle, s = status, q = quit");
    println!("          a <left> <top> <width> <height> = confine pointer to a rect");
    #[cfg(windows)]
    println!("          w <hwnd> = confine pointer to a window (decimal or 0x hex)");
    println!("          c = clear target");
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Command::Nothing);
    };
    let args: Vec<&str> = words.collect();
    let no_args = |cmd: Command| {
        if args.is_empty() {
            Ok(cmd)
        } else {
            Err(format!("'{head}' takes no arguments"))
        }
    };
    match head {
        "p" => no_args(Command::Pause),
        "r" => no_args(Command::Resume),
        "t" => no_args(Command::Toggle),
        "c" => no_args(Command::Clear),
        "s" => no_args(Command::Status),
        "q" => no_args(Command::Quit),
        "a" => {
            let values = args
                .iter()
                .map(|a| a.parse::<i32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| format!("bad rect: {err}"))?;
            match values[..] {
                [left, top, width, height] => {
                    Ok(Command::Assign(ViewportRect::new(left, top, width, height)))
                }
                _ => Err("usage: a <left> <top> <width> <height>".to_string()),
            }
        }
        #[cfg(windows)]
        "w" => match args[..] {
            [raw] => parse_hwnd(raw)
                .map(Command::AssignWindow)
                .ok_or_else(|| format!("bad window handle '{raw}'")),
            _ => Err("usage: w <hwnd>".to_string()),
        },
        other => Err(format!("unknown command '{other}'")),
    }
}

#[cfg(windows)]
fn parse_hwnd(raw: &str) -> Option<isize> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => isize::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SETTINGS.to_string());
    let settings = BridgeSettings::load(&path)?;
    logging::init(settings.debug_logging, settings.log_file.clone());
    tracing::debug!(?settings, %path, "settings loaded");

    let mut bridge = GestureBridge::from_settings(&settings)?;
    if let Err(err) = bridge.start() {
        // The pointer loop keeps running on the idle default.
        tracing::warn!(%err, "continuing without gesture input");
    }
    print_help();

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(msg) => {
                println!("{msg}");
                print_help();
                continue;
            }
        };
        match command {
            Command::Pause => println!("{:?}", bridge.pause()),
            Command::Resume => println!("{:?}", bridge.resume()),
            Command::Toggle => println!("{:?}", bridge.toggle()),
            Command::Assign(rect) => println!("target: {:?}", bridge.assign_target(&rect)),
            #[cfg(windows)]
            Command::AssignWindow(hwnd) => {
                let window = gesture_pointer::viewport::NativeWindow::from_raw(hwnd);
                println!("target: {:?}", bridge.assign_target(&window));
            }
            Command::Clear => {
                bridge.clear_target();
                println!("target cleared");
            }
            Command::Status => println!("{:#?}", bridge.status()),
            Command::Quit => break,
            Command::Nothing => {}
        }
    }

    bridge.stop()?;
    tracing::info!("bye");
    Ok(())
}
