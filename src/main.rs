// (c) 2025 Ross Younger
//! bookz utility - main entrypoint

fn main() -> std::process::ExitCode {
    bookz::main(std::env::args_os())
}
