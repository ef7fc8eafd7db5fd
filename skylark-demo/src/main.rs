mod cli;

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let result = match args.get(1).map(String::as_str) {
        Some("tone") => cli::run_orbiting_tone(),
        Some("file") => match args.get(2) {
            Some(path) => cli::run_file_playback(path),
            None => {
                eprintln!("usage: skylark-demo file <path>");
                return;
            }
        },
        Some("headless") => cli::run_headless_render(),
        _ => {
            eprintln!("usage: skylark-demo <tone|file <path>|headless>");
            return;
        }
    };

    if let Err(e) = result {
        log::error!("demo failed: {e}");
        std::process::exit(1);
    }
}
